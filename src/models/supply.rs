use super::{lenient_u32, timestamp, wire_enum};
use crate::error::{AppError, AppResult};
use crate::store::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

wire_enum! {
    SupplyCategory as "supply category" {
        Food => "alimentos",
        Drinks => "bebidas",
        Cleaning => "limpieza",
        Utensils => "utensilios",
        Other => "otros",
    }
}

wire_enum! {
    SupplyStatus as "supply status" {
        Available => "disponible",
        Low => "bajo_stock",
        OutOfStock => "sin_stock",
    }
}

pub const DEFAULT_MIN_STOCK: u32 = 5;

fn default_min_stock() -> u32 {
    DEFAULT_MIN_STOCK
}

impl SupplyStatus {
    pub fn for_levels(stock: u32, min_stock: u32) -> Self {
        if stock == 0 {
            Self::OutOfStock
        } else if stock <= min_stock {
            Self::Low
        } else {
            Self::Available
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Supply {
    pub id: u64,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "categoria")]
    pub category: SupplyCategory,
    pub stock: u32,
    #[serde(rename = "stockMinimo", default = "default_min_stock")]
    pub min_stock: u32,
    #[serde(rename = "unidadMedida", default)]
    pub unit: String,
    #[serde(rename = "proveedor", default)]
    pub supplier: String,
    #[serde(rename = "ultimaActualizacion", with = "timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "estado")]
    pub status: SupplyStatus,
}

impl Supply {
    pub fn is_low(&self) -> bool {
        self.stock <= self.min_stock
    }

    /// Recomputes the derived status and bumps the update time.
    pub fn touch_levels(&mut self, now: DateTime<Utc>) {
        self.status = SupplyStatus::for_levels(self.stock, self.min_stock);
        self.updated_at = now;
    }
}

impl Record for Supply {
    const COLLECTION: &'static str = "insumos";
    const LABEL: &'static str = "supply";

    fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateSupply {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "categoria")]
    pub category: SupplyCategory,
    #[serde(default, deserialize_with = "lenient_u32::option::deserialize")]
    pub stock: Option<u32>,
    #[serde(
        rename = "stockMinimo",
        default,
        deserialize_with = "lenient_u32::option::deserialize"
    )]
    pub min_stock: Option<u32>,
    #[serde(rename = "unidadMedida", default)]
    pub unit: Option<String>,
    #[serde(rename = "proveedor", default)]
    pub supplier: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SupplyPatch {
    #[serde(rename = "nombre")]
    pub name: Option<String>,
    #[serde(rename = "categoria")]
    pub category: Option<SupplyCategory>,
    #[serde(default, deserialize_with = "lenient_u32::option::deserialize")]
    pub stock: Option<u32>,
    #[serde(
        rename = "stockMinimo",
        default,
        deserialize_with = "lenient_u32::option::deserialize"
    )]
    pub min_stock: Option<u32>,
    #[serde(rename = "unidadMedida")]
    pub unit: Option<String>,
    #[serde(rename = "proveedor")]
    pub supplier: Option<String>,
}

impl SupplyPatch {
    pub fn has_changes(&self) -> bool {
        self.name.is_some()
            || self.category.is_some()
            || self.stock.is_some()
            || self.min_stock.is_some()
            || self.unit.is_some()
            || self.supplier.is_some()
    }

    pub fn touches_levels(&self) -> bool {
        self.stock.is_some() || self.min_stock.is_some()
    }
}

/// Body of `PATCH /api/insumos/:id/stock`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StockUpdate {
    #[serde(deserialize_with = "lenient_u32::deserialize")]
    pub stock: u32,
}

/// Body of `POST /api/insumos/:id/descontar`. The quantity stays raw so a bad value
/// is reported as a validation error rather than a body rejection.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StockDiscount {
    #[serde(rename = "cantidad", default)]
    pub quantity: Value,
}

impl StockDiscount {
    pub fn quantity(&self) -> AppResult<u32> {
        coerce_positive_quantity(&self.quantity)
    }
}

/// Strictly positive integer from a JSON number or a numeric string.
pub fn coerce_positive_quantity(raw: &Value) -> AppResult<u32> {
    match lenient_u32::coerce(raw) {
        Some(quantity) if quantity > 0 => Ok(quantity),
        _ => Err(AppError::validation(format!(
            "cantidad must be a positive integer, got {raw}"
        ))),
    }
}

/// Low-stock entry reported by `GET /api/insumos/alertas`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplyAlert {
    pub id: u64,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "stockActual")]
    pub current_stock: u32,
    #[serde(rename = "stockMinimo")]
    pub min_stock: u32,
    #[serde(rename = "estado")]
    pub status: SupplyStatus,
    #[serde(rename = "proveedor")]
    pub supplier: String,
}

impl From<&Supply> for SupplyAlert {
    fn from(supply: &Supply) -> Self {
        Self {
            id: supply.id,
            name: supply.name.clone(),
            current_stock: supply.stock,
            min_stock: supply.min_stock,
            status: supply.status,
            supplier: supply.supplier.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_is_a_function_of_levels() {
        assert_eq!(SupplyStatus::for_levels(0, 5), SupplyStatus::OutOfStock);
        assert_eq!(SupplyStatus::for_levels(0, 0), SupplyStatus::OutOfStock);
        assert_eq!(SupplyStatus::for_levels(5, 5), SupplyStatus::Low);
        assert_eq!(SupplyStatus::for_levels(6, 5), SupplyStatus::Available);
    }

    #[test]
    fn quantity_accepts_numbers_and_numeric_strings() {
        assert_eq!(coerce_positive_quantity(&json!(3)).unwrap(), 3);
        assert_eq!(coerce_positive_quantity(&json!(" 12 ")).unwrap(), 12);
    }

    #[test]
    fn quantity_rejects_zero_negative_and_text() {
        for raw in [json!(0), json!(-2), json!("abc"), json!(1.5), Value::Null] {
            let err = coerce_positive_quantity(&raw).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{raw}");
        }
    }

    #[test]
    fn create_payload_coerces_numeric_strings() {
        let create: CreateSupply = serde_json::from_value(json!({
            "nombre": "Harina",
            "categoria": "alimentos",
            "stock": "20",
            "stockMinimo": 4
        }))
        .unwrap();

        assert_eq!(create.stock, Some(20));
        assert_eq!(create.min_stock, Some(4));
    }
}
