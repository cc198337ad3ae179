use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::utils::logging::*;
use crate::AppState;

pub async fn health_check() -> Json<Value> {
    log_health_check();

    Json(json!({
        "status": "healthy",
        "service": "whatsapp-gateway-middleware",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Pronto quando o backing store responde
pub async fn ready_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let (store_status, ready) = match state.store.ping().await {
        Ok(()) => ("connected".to_string(), true),
        Err(e) => {
            log_warning(&format!("⚠️ Store indisponível no readiness check: {}", e));
            (format!("unavailable: {}", e), false)
        }
    };

    let body = json!({
        "ready": ready,
        "service": "whatsapp-gateway-middleware",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "dependencies": {
            "store": {
                "backend": state.settings.store.backend,
                "status": store_status
            },
            "forwarding": {
                "default_url_configured": state.settings.webhook.default_forward_url.is_some()
            }
        }
    });

    let status = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(body))
}
