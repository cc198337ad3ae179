//! Middleware de autenticação para endpoints administrativos
//!
//! Valida o header `X-Admin-Key` contra `ADMIN_API_KEY`. Sem chave configurada o
//! acesso é liberado em desenvolvimento e bloqueado (503) em produção (`RUST_ENV=production`).

use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub const ADMIN_KEY_HEADER: &str = "X-Admin-Key";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAccess {
    Granted,
    GrantedUnconfigured,
    Denied,
    Unavailable,
}

pub fn check_admin_key(expected: Option<&str>, provided: Option<&str>, is_production: bool) -> AdminAccess {
    match (expected.filter(|k| !k.is_empty()), provided, is_production) {
        (Some(expected), Some(provided), _) if expected == provided => AdminAccess::Granted,
        (Some(_), _, _) => AdminAccess::Denied,
        (None, _, false) => AdminAccess::GrantedUnconfigured,
        (None, _, true) => AdminAccess::Unavailable,
    }
}

/// Protege `/admin/*`
///
/// ```bash
/// curl -X POST -H "X-Admin-Key: $ADMIN_API_KEY" \
///   https://gateway.example.com/admin/provider-configs/<id>/activate
/// ```
pub async fn require_admin_key(headers: HeaderMap, request: Request, next: Next) -> Result<Response, Response> {
    let provided_key = headers.get(ADMIN_KEY_HEADER).and_then(|v| v.to_str().ok());
    let expected_key = std::env::var("ADMIN_API_KEY").ok();
    let is_production = std::env::var("RUST_ENV")
        .unwrap_or_else(|_| "development".to_string())
        == "production";

    match check_admin_key(expected_key.as_deref(), provided_key, is_production) {
        AdminAccess::Granted => {
            tracing::debug!("✅ Admin access granted");
            Ok(next.run(request).await)
        }
        AdminAccess::GrantedUnconfigured => {
            tracing::warn!(
                "⚠️  ADMIN_API_KEY not configured - Allowing access in development mode. \
                 Configure ADMIN_API_KEY in production!"
            );
            Ok(next.run(request).await)
        }
        AdminAccess::Denied => {
            tracing::warn!(
                "❌ Admin access denied - Invalid or missing X-Admin-Key: {:?}",
                provided_key.map(|_| "<redacted>")
            );
            Err(error_response(
                StatusCode::UNAUTHORIZED,
                "Unauthorized",
                "Missing or invalid X-Admin-Key header",
            ))
        }
        AdminAccess::Unavailable => {
            tracing::error!("🚨 ADMIN_API_KEY not configured in production! Blocking admin access.");
            Err(error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "Service Unavailable",
                "ADMIN_API_KEY not configured on server",
            ))
        }
    }
}

fn error_response(status: StatusCode, error: &str, message: &str) -> Response {
    (
        status,
        Json(json!({
            "success": false,
            "error": error,
            "message": message
        })),
    )
        .into_response()
}
