//! Domain records and request payloads.
//!
//! Wire field names match the data files already in production (Spanish, camelCase).
//! Rust names are English and mapped with `#[serde(rename)]`.

use crate::error::{AppError, AppResult};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Serialize, Serializer, ser::SerializeMap};

mod client;
mod employee;
mod filter;
mod order;
mod supply;
mod task;

pub use client::{Client, ClientPatch, CreateClient};
pub use employee::{CreateEmployee, Employee, EmployeeArea, EmployeePatch, EmployeeStats, Role};
pub use filter::{DateRange, TaskFilter, TaskFilterQuery};
pub use order::{
    CreateOrder, DEFAULT_ESTIMATED_MINUTES, Order, OrderItem, OrderPatch, OrderStats,
    OrderStatus, OrderType, Platform, items_total,
};
pub(crate) use order::{validate_items, validate_total};
pub use supply::{
    CreateSupply, DEFAULT_MIN_STOCK, StockDiscount, StockUpdate, Supply, SupplyAlert,
    SupplyCategory, SupplyPatch, SupplyStatus, coerce_positive_quantity,
};
pub use task::{CreateTask, Priority, Task, TaskArea, TaskPatch, TaskStatus, TaskTransition};

lazy_static! {
    static ref EMAIL: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

// ============================================================================
// Wire enums
// ============================================================================

/// A closed set of string values stored as-is in the data files.
pub trait WireEnum: Copy + Eq + 'static {
    /// Name used in validation messages.
    const LABEL: &'static str;
    const ALL: &'static [Self];

    fn as_str(self) -> &'static str;

    fn parse_wire(raw: &str) -> AppResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|value| value.as_str() == raw)
            .ok_or_else(|| {
                let allowed: Vec<&str> = Self::ALL.iter().map(|value| value.as_str()).collect();
                AppError::validation(format!(
                    "invalid {} `{}`; expected one of: {}",
                    Self::LABEL,
                    raw,
                    allowed.join(", ")
                ))
            })
    }
}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident as $label:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $wire)] $variant ),+
        }

        impl $crate::models::WireEnum for $name {
            const LABEL: &'static str = $label;
            const ALL: &'static [Self] = &[$($name::$variant),+];

            fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str($crate::models::WireEnum::as_str(*self))
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::error::AppError;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                <Self as $crate::models::WireEnum>::parse_wire(raw)
            }
        }
    };
}
pub(crate) use wire_enum;

/// Per-value counts of a wire enum, serialized as an object in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tally<E: WireEnum>(Vec<(E, usize)>);

impl<E: WireEnum> Tally<E> {
    pub fn count(values: impl IntoIterator<Item = E>) -> Self {
        let mut counts: Vec<(E, usize)> = E::ALL.iter().map(|value| (*value, 0)).collect();
        for value in values {
            if let Some(slot) = counts.iter_mut().find(|(key, _)| *key == value) {
                slot.1 += 1;
            }
        }
        Self(counts)
    }

    pub fn get(&self, key: E) -> usize {
        self.0
            .iter()
            .find(|(value, _)| *value == key)
            .map_or(0, |(_, count)| *count)
    }

    pub fn iter(&self) -> impl Iterator<Item = (E, usize)> + '_ {
        self.0.iter().copied()
    }
}

impl<E: WireEnum> Serialize for Tally<E> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, count) in &self.0 {
            map.serialize_entry(key.as_str(), count)?;
        }
        map.end()
    }
}

// ============================================================================
// Field helpers
// ============================================================================

/// Trimmed value of a required text field.
pub(crate) fn required_text(field: &str, value: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{field} must not be blank")));
    }
    Ok(trimmed.to_string())
}

/// Trimmed email, checked against `local@domain.tld`.
pub(crate) fn valid_email(value: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if !EMAIL.is_match(trimmed) {
        return Err(AppError::validation(format!("invalid email `{trimmed}`")));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn same_email(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Blank optional text collapses to `None`.
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Distinguishes an absent patch field from an explicit `null`.
pub(crate) mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

/// Non-negative integer given either as a JSON number or a numeric string.
pub(crate) mod lenient_u32 {
    use serde::{Deserialize, Deserializer, de::Error};
    use serde_json::Value;

    pub fn coerce(value: &Value) -> Option<u32> {
        match value {
            Value::Number(number) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
            Value::String(raw) => raw.trim().parse::<u32>().ok(),
            _ => None,
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let value = Value::deserialize(deserializer)?;
        coerce(&value).ok_or_else(|| D::Error::custom(format!("expected a non-negative integer, got {value}")))
    }

    pub mod option {
        use super::*;

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<u32>, D::Error> {
            match Option::<Value>::deserialize(deserializer)? {
                None | Some(Value::Null) => Ok(None),
                Some(value) => coerce(&value).map(Some).ok_or_else(|| {
                    D::Error::custom(format!("expected a non-negative integer, got {value}"))
                }),
            }
        }
    }
}

/// RFC 3339 UTC timestamps with millisecond precision, e.g. `2024-05-01T10:00:00.000Z`.
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn now() -> DateTime<Utc> {
        Utc::now().trunc_subsecs(3)
    }

    pub fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw.trim())
            .ok()
            .map(|value| value.with_timezone(&Utc))
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp `{raw}`")))
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => serializer.serialize_str(&format(value)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                None => Ok(None),
                Some(raw) => parse(&raw)
                    .map(Some)
                    .ok_or_else(|| D::Error::custom(format!("invalid timestamp `{raw}`"))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert!(valid_email(" ana@resto.com ").is_ok());
        assert!(valid_email("ana@resto").is_err());
        assert!(valid_email("ana resto@x.com").is_err());
        assert!(same_email("Ana@Resto.com", "ana@resto.com "));
    }

    #[test]
    fn enum_parse_lists_allowed_values() {
        let err = "chef".parse::<Role>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid role `chef`; expected one of: administrador, cocinero, repartidor, mozo, encargado_stock"
        );
        assert_eq!("mozo".parse::<Role>().unwrap(), Role::Waiter);
    }

    #[test]
    fn tally_serializes_every_value_in_order() {
        let tally = Tally::count([OrderType::Delivery, OrderType::Delivery]);
        assert_eq!(tally.get(OrderType::Delivery), 2);
        assert_eq!(
            serde_json::to_string(&tally).unwrap(),
            r#"{"presencial":0,"delivery":2}"#
        );
    }

    #[test]
    fn timestamps_use_millisecond_precision() {
        let parsed = timestamp::parse("2024-05-01T10:00:00Z").unwrap();
        assert_eq!(timestamp::format(&parsed), "2024-05-01T10:00:00.000Z");
    }
}
