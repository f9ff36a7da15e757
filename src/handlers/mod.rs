//! JSON API under `/api`. Every response uses the `{success, message?, data?, total?}`
//! envelope; failures go through [`AppError`]'s `IntoResponse`.

use axum::{
    Json, Router,
    extract::{FromRequest, FromRequestParts},
    routing::get,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::WireEnum,
    state::AppState,
};

pub mod clients;
pub mod employees;
pub mod orders;
pub mod supplies;
pub mod tasks;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn data(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: None,
            data: Some(data),
            total: None,
        })
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
            total: None,
        })
    }
}

impl<T: Serialize> ApiResponse<Vec<T>> {
    pub fn list(items: Vec<T>) -> Json<Self> {
        Json(Self {
            success: true,
            message: None,
            total: Some(items.len()),
            data: Some(items),
        })
    }
}

pub type ApiResult<T> = AppResult<Json<ApiResponse<T>>>;

/// JSON body whose rejections become [`AppError::Validation`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string whose rejections become [`AppError::Validation`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// `?email=&id=` of the email availability endpoints.
#[derive(Debug, Deserialize)]
pub struct EmailCheckQuery {
    pub email: Option<String>,
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EmailAvailability {
    pub email: String,
    #[serde(rename = "disponible")]
    pub available: bool,
}

impl EmailCheckQuery {
    /// Email to check plus the optional id of the record being edited.
    pub fn parts(&self) -> AppResult<(String, Option<u64>)> {
        let email = self
            .email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .ok_or_else(|| AppError::validation("email query parameter is required"))?;
        let exclude = self
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(parse_id)
            .transpose()?;
        Ok((email.to_string(), exclude))
    }
}

/// Path ids are positive integers.
pub fn parse_id(raw: &str) -> AppResult<u64> {
    match raw.trim().parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::validation(format!(
            "id must be a positive integer, got `{raw}`"
        ))),
    }
}

pub fn parse_enum<E: WireEnum>(raw: &str) -> AppResult<E> {
    E::parse_wire(raw)
}

pub fn ensure_changes(has_changes: bool) -> AppResult<()> {
    if !has_changes {
        return Err(AppError::validation(
            "at least one field must be provided for update",
        ));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
}

pub async fn healthcheck() -> Json<ApiResponse<Health>> {
    ApiResponse::data(Health { status: "ok" })
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/empleados", employees::routes())
        .nest("/tareas", tasks::routes())
        .nest("/pedidos", orders::routes())
        .nest("/insumos", supplies::routes())
        .nest("/clientes", clients::routes())
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(healthcheck))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_must_be_positive_integers() {
        assert_eq!(parse_id("12").unwrap(), 12);
        for bad in ["0", "-3", "abc", "1.5", ""] {
            assert!(parse_id(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn list_envelope_carries_total() {
        let Json(body) = ApiResponse::list(vec![1, 2, 3]);
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"success": true, "data": [1, 2, 3], "total": 3})
        );
    }
}
