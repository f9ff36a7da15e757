use super::{Tally, double_option, timestamp, wire_enum};
use crate::error::{AppError, AppResult};
use crate::store::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

wire_enum! {
    OrderType as "order type" {
        InPerson => "presencial",
        Delivery => "delivery",
    }
}

wire_enum! {
    Platform as "platform" {
        Rappi => "rappi",
        PedidosYa => "pedidosya",
        Own => "propia",
        Local => "local",
    }
}

wire_enum! {
    /// Kitchen-to-customer pipeline. Any value may be set directly.
    #[derive(Default)]
    OrderStatus as "order status" {
        #[default]
        Pending => "pendiente",
        Preparing => "en_preparacion",
        Ready => "listo",
        OnTheWay => "en_camino",
        Delivered => "entregado",
        Closed => "finalizado",
    }
}

pub const DEFAULT_ESTIMATED_MINUTES: u32 = 30;

fn default_estimated_minutes() -> u32 {
    DEFAULT_ESTIMATED_MINUTES
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(rename = "producto")]
    pub product: String,
    #[serde(rename = "cantidad")]
    pub quantity: u32,
    #[serde(rename = "precio")]
    pub unit_price: f64,
}

impl OrderItem {
    pub fn subtotal(&self) -> f64 {
        f64::from(self.quantity) * self.unit_price
    }

    fn validate(&self, position: usize) -> AppResult<()> {
        if self.product.trim().is_empty() {
            return Err(AppError::validation(format!(
                "item {position}: producto must not be blank"
            )));
        }
        if self.quantity == 0 {
            return Err(AppError::validation(format!(
                "item {position}: cantidad must be greater than 0"
            )));
        }
        if !self.unit_price.is_finite() || self.unit_price < 0.0 {
            return Err(AppError::validation(format!(
                "item {position}: precio must be a non-negative number"
            )));
        }
        Ok(())
    }
}

pub fn items_total(items: &[OrderItem]) -> f64 {
    items.iter().map(OrderItem::subtotal).sum()
}

pub(crate) fn validate_items(items: &[OrderItem]) -> AppResult<()> {
    if items.is_empty() {
        return Err(AppError::validation("an order needs at least one item"));
    }
    for (index, item) in items.iter().enumerate() {
        item.validate(index + 1)?;
    }
    Ok(())
}

pub(crate) fn validate_total(total: f64) -> AppResult<()> {
    if !total.is_finite() || total < 0.0 {
        return Err(AppError::validation("total must be a non-negative number"));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    #[serde(rename = "numeroOrden")]
    pub order_number: String,
    #[serde(rename = "clienteId", default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<u64>,
    /// Legacy inline customer name, kept for records that predate `clienteId`.
    #[serde(rename = "cliente", default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    pub items: Vec<OrderItem>,
    pub total: f64,
    #[serde(rename = "tipo")]
    pub order_type: OrderType,
    #[serde(rename = "plataforma")]
    pub platform: Platform,
    #[serde(rename = "estado", default)]
    pub status: OrderStatus,
    #[serde(rename = "fechaCreacion", with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "tiempoEstimado", default = "default_estimated_minutes")]
    pub estimated_minutes: u32,
    #[serde(rename = "observaciones", default)]
    pub notes: String,
}

impl Order {
    pub fn default_number(id: u64) -> String {
        format!("ORD-{id:03}")
    }
}

impl Record for Order {
    const COLLECTION: &'static str = "pedidos";
    const LABEL: &'static str = "order";

    fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateOrder {
    #[serde(rename = "numeroOrden", default)]
    pub order_number: Option<String>,
    #[serde(rename = "clienteId", default)]
    pub client_id: Option<u64>,
    #[serde(rename = "cliente", default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(rename = "tipo")]
    pub order_type: OrderType,
    #[serde(rename = "plataforma")]
    pub platform: Platform,
    #[serde(rename = "estado", default)]
    pub status: Option<OrderStatus>,
    #[serde(rename = "tiempoEstimado", default)]
    pub estimated_minutes: Option<u32>,
    #[serde(rename = "observaciones", default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderPatch {
    #[serde(rename = "numeroOrden")]
    pub order_number: Option<String>,
    #[serde(
        rename = "clienteId",
        default,
        deserialize_with = "double_option::deserialize"
    )]
    pub client_id: Option<Option<u64>>,
    #[serde(
        rename = "cliente",
        default,
        deserialize_with = "double_option::deserialize"
    )]
    pub client_name: Option<Option<String>>,
    pub items: Option<Vec<OrderItem>>,
    pub total: Option<f64>,
    #[serde(rename = "tipo")]
    pub order_type: Option<OrderType>,
    #[serde(rename = "plataforma")]
    pub platform: Option<Platform>,
    #[serde(rename = "estado")]
    pub status: Option<OrderStatus>,
    #[serde(rename = "tiempoEstimado")]
    pub estimated_minutes: Option<u32>,
    #[serde(rename = "observaciones")]
    pub notes: Option<String>,
}

impl OrderPatch {
    pub fn has_changes(&self) -> bool {
        self.order_number.is_some()
            || self.client_id.is_some()
            || self.client_name.is_some()
            || self.items.is_some()
            || self.total.is_some()
            || self.order_type.is_some()
            || self.platform.is_some()
            || self.status.is_some()
            || self.estimated_minutes.is_some()
            || self.notes.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderStats {
    pub total: usize,
    #[serde(rename = "porTipo")]
    pub by_type: Tally<OrderType>,
    #[serde(rename = "porPlataforma")]
    pub by_platform: Tally<Platform>,
    #[serde(rename = "porEstado")]
    pub by_status: Tally<OrderStatus>,
}

impl OrderStats {
    pub fn of(orders: &[Order]) -> Self {
        Self {
            total: orders.len(),
            by_type: Tally::count(orders.iter().map(|o| o.order_type)),
            by_platform: Tally::count(orders.iter().map(|o| o.platform)),
            by_status: Tally::count(orders.iter().map(|o| o.status)),
        }
    }
}
