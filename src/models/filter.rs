//! Task filter criteria, as received in a query string and once validated.

use super::{OrderType, Platform, Priority, Task, TaskArea, TaskStatus, WireEnum, timestamp};
use crate::error::{AppError, AppResult};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;

/// Raw criteria. Every field is optional and a blank value counts as absent, which is
/// what an HTML filter form submits for untouched inputs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskFilterQuery {
    #[serde(rename = "estado")]
    pub status: Option<String>,
    #[serde(rename = "prioridad")]
    pub priority: Option<String>,
    pub area: Option<String>,
    #[serde(rename = "empleadoAsignado")]
    pub assigned_employee: Option<String>,
    #[serde(rename = "fechaDesde")]
    pub created_from: Option<String>,
    #[serde(rename = "fechaHasta")]
    pub created_to: Option<String>,
    #[serde(rename = "inicioDesde")]
    pub started_from: Option<String>,
    #[serde(rename = "inicioHasta")]
    pub started_to: Option<String>,
    #[serde(rename = "finDesde")]
    pub finished_from: Option<String>,
    #[serde(rename = "finHasta")]
    pub finished_to: Option<String>,
    #[serde(rename = "tipoPedido")]
    pub order_type: Option<String>,
    #[serde(rename = "plataforma")]
    pub platform: Option<String>,
    #[serde(rename = "limite")]
    pub limit: Option<String>,
}

/// Inclusive time window. An unbounded side matches everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn parse(
        field_from: &str,
        from: Option<&str>,
        field_to: &str,
        to: Option<&str>,
    ) -> AppResult<Self> {
        let range = Self {
            from: from.map(|raw| parse_bound(field_from, raw, false)).transpose()?,
            to: to.map(|raw| parse_bound(field_to, raw, true)).transpose()?,
        };
        if let (Some(from), Some(to)) = (range.from, range.to) {
            if from > to {
                return Err(AppError::validation(format!(
                    "{field_from} must not be after {field_to}"
                )));
            }
        }
        Ok(range)
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// A missing value only matches an unbounded range.
    pub fn contains(&self, value: Option<DateTime<Utc>>) -> bool {
        if self.is_unbounded() {
            return true;
        }
        match value {
            Some(value) => {
                self.from.is_none_or(|from| value >= from) && self.to.is_none_or(|to| value <= to)
            }
            None => false,
        }
    }
}

/// RFC 3339 or `YYYY-MM-DD`. A date-only upper bound covers the whole day.
fn parse_bound(field: &str, raw: &str, upper: bool) -> AppResult<DateTime<Utc>> {
    if let Some(instant) = timestamp::parse(raw) {
        return Ok(instant);
    }
    let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        AppError::validation(format!(
            "{field} must be an RFC 3339 timestamp or a YYYY-MM-DD date, got `{raw}`"
        ))
    })?;
    let time = if upper {
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)
    };
    let time = time.ok_or_else(|| AppError::validation(format!("{field}: invalid time of day")))?;
    Ok(date.and_time(time).and_utc())
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub area: Option<TaskArea>,
    pub assigned_employee: Option<u64>,
    pub created: DateRange,
    pub started: DateRange,
    pub finished: DateRange,
    pub order_type: Option<OrderType>,
    pub platform: Option<Platform>,
    pub limit: Option<usize>,
}

impl TaskFilter {
    /// Whether the order join is needed at all.
    pub fn filters_orders(&self) -> bool {
        self.order_type.is_some() || self.platform.is_some()
    }

    /// Applies every criterion that only needs the task itself.
    pub fn matches(&self, task: &Task) -> bool {
        self.status.is_none_or(|status| task.status == status)
            && self.priority.is_none_or(|priority| task.priority == priority)
            && self.area.is_none_or(|area| task.area == area)
            && self
                .assigned_employee
                .is_none_or(|employee| task.assigned_employee == Some(employee))
            && self.created.contains(Some(task.created_at))
            && self.started.contains(task.started_at)
            && self.finished.contains(task.finished_at)
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn parse_enum<E: WireEnum>(value: &Option<String>) -> AppResult<Option<E>> {
    present(value).map(E::parse_wire).transpose()
}

fn parse_positive(field: &str, value: &Option<String>) -> AppResult<Option<u64>> {
    present(value)
        .map(|raw| match raw.parse::<u64>() {
            Ok(number) if number > 0 => Ok(number),
            _ => Err(AppError::validation(format!(
                "{field} must be a positive integer, got `{raw}`"
            ))),
        })
        .transpose()
}

impl TryFrom<TaskFilterQuery> for TaskFilter {
    type Error = AppError;

    fn try_from(query: TaskFilterQuery) -> AppResult<Self> {
        let order_type = match present(&query.order_type) {
            None | Some("todos") => None,
            Some(raw) => Some(OrderType::parse_wire(raw)?),
        };
        let limit = parse_positive("limite", &query.limit)?
            .map(|limit| usize::try_from(limit).unwrap_or(usize::MAX));

        Ok(Self {
            status: parse_enum(&query.status)?,
            priority: parse_enum(&query.priority)?,
            area: parse_enum(&query.area)?,
            assigned_employee: parse_positive("empleadoAsignado", &query.assigned_employee)?,
            created: DateRange::parse(
                "fechaDesde",
                present(&query.created_from),
                "fechaHasta",
                present(&query.created_to),
            )?,
            started: DateRange::parse(
                "inicioDesde",
                present(&query.started_from),
                "inicioHasta",
                present(&query.started_to),
            )?,
            finished: DateRange::parse(
                "finDesde",
                present(&query.finished_from),
                "finHasta",
                present(&query.finished_to),
            )?,
            order_type,
            platform: parse_enum(&query.platform)?,
            limit,
        })
    }
}
