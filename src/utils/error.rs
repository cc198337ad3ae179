use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::fmt;

use crate::store::StoreError;

pub const CONNECTION_NOT_FOUND: &str = "CONNECTION_NOT_FOUND";
pub const PROVIDER_NOT_CONFIGURED: &str = "PROVIDER_NOT_CONFIGURED";

#[derive(Debug)]
pub enum AppError {
    ConnectionNotFound(String),
    StoreError(StoreError),
    ConfigError(String),
    JsonError(serde_json::Error),
    HttpError(reqwest::Error),
    ValidationError(String),
    Unauthorized(String),
    InternalError(String),
}

impl AppError {
    /// Código estável devolvido aos chamadores
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ConnectionNotFound(_) => CONNECTION_NOT_FOUND,
            AppError::StoreError(_) => "STORE_ERROR",
            AppError::ConfigError(_) => "CONFIG_ERROR",
            AppError::JsonError(_) => "INVALID_JSON",
            AppError::HttpError(_) => "HTTP_ERROR",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ConnectionNotFound(_) => StatusCode::NOT_FOUND,
            AppError::StoreError(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::StoreError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::HttpError(_) => StatusCode::BAD_GATEWAY,
            AppError::ConfigError(_) | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::JsonError(_) | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::ConnectionNotFound(instance) => write!(f, "Connection not found for instance: {}", instance),
            AppError::StoreError(err) => write!(f, "Store error: {}", err),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::JsonError(err) => write!(f, "JSON error: {}", err),
            AppError::HttpError(err) => write!(f, "HTTP error: {}", err),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::JsonError(err)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::HttpError(err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::StoreError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = json!({
            "success": false,
            "error": self.code(),
            "message": self.to_string(),
            "status": status.as_u16()
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_and_statuses() {
        let not_found = AppError::ConnectionNotFound("shop1".to_string());
        assert_eq!(not_found.code(), CONNECTION_NOT_FOUND);
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);

        let invalid = AppError::ValidationError("to is required".to_string());
        assert_eq!(invalid.code(), "VALIDATION_ERROR");
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);

        assert_eq!(
            AppError::InternalError("boom".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
