use crate::store::StoreError;
use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

pub type AppResult<T> = Result<T, AppError>;

pub const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

/// Storage failure text attached to error responses as an extension. It only
/// reaches the body when the router exposes internal errors.
#[derive(Debug, Clone)]
pub struct InternalDetail(pub String);

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: u32, available: u32 },
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InsufficientStock { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show a client. Storage failures are reduced to a generic text.
    pub fn public_message(&self) -> String {
        match self {
            Self::Store(_) => INTERNAL_ERROR_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    /// Underlying detail of storage failures.
    pub fn internal_detail(&self) -> Option<InternalDetail> {
        match self {
            Self::Store(err) => Some(InternalDetail(err.to_string())),
            _ => None,
        }
    }
}

/// The `{success:false,message,error?}` envelope with `status`.
pub fn error_response(status: StatusCode, message: String, detail: Option<String>) -> Response {
    let body = ErrorBody {
        success: false,
        message,
        error: detail,
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Self::Store(err) = &self {
            error!(error = %err, "storage failure");
        }

        let mut response = error_response(self.status(), self.public_message(), None);
        if let Some(detail) = self.internal_detail() {
            response.extensions_mut().insert(detail);
        }
        response
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(format!("invalid JSON body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(format!("invalid query string: {}", rejection.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(AppError::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::conflict("x").status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::InsufficientStock {
                requested: 5,
                available: 2
            }
            .status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn storage_errors_hide_detail_from_message() {
        let err = AppError::from(StoreError::Shape {
            path: PathBuf::from("data/insumos.json"),
            message: "bad".to_string(),
        });

        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "internal server error");

        let response = err.into_response();
        let detail = response.extensions().get::<InternalDetail>().unwrap();
        assert!(detail.0.contains("data/insumos.json"));
    }

    #[test]
    fn client_errors_carry_no_detail() {
        let response = AppError::validation("x").into_response();
        assert!(response.extensions().get::<InternalDetail>().is_none());
    }
}
