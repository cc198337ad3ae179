use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::time::Instant;
use whatsapp_providers::ProviderKind;

use crate::utils::logging::*;
use crate::utils::{AppError, AppResult};
use crate::AppState;

pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";

/// POST /webhooks/evolution
pub async fn handle_evolution_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    receive_webhook(&state, "/webhooks/evolution", &headers, &body, Some(ProviderKind::Evolution)).await
}

/// POST /webhooks/zapi
pub async fn handle_zapi_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    receive_webhook(&state, "/webhooks/zapi", &headers, &body, Some(ProviderKind::ZApi)).await
}

/// POST /webhooks/whatsapp - provedor detectado pelo formato do corpo
pub async fn handle_whatsapp_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    receive_webhook(&state, "/webhooks/whatsapp", &headers, &body, None).await
}

async fn receive_webhook(
    state: &AppState,
    endpoint: &str,
    headers: &HeaderMap,
    body: &[u8],
    hint: Option<ProviderKind>,
) -> Result<Json<Value>, AppError> {
    let start_time = Instant::now();
    log_request_received(endpoint, "POST");

    if let Some(secret) = state.settings.webhook.signing_secret.as_deref().filter(|s| !s.is_empty()) {
        verify_webhook_signature(headers, body, secret)?;
    }

    let raw: Value = serde_json::from_slice(body).map_err(|e| {
        log_validation_error("payload", &format!("Invalid JSON: {}", e));
        AppError::ValidationError(format!("Invalid JSON payload: {}", e))
    })?;

    let ack = state.normalizer.handle(raw, hint).await?;

    let processing_time = start_time.elapsed().as_millis() as u64;
    log_request_processed(endpoint, 200, processing_time);

    // ACK imediato: o encaminhamento segue em background
    Ok(Json(json!({
        "success": true,
        "id": ack.event_id.to_string()
    })))
}

/// HMAC-SHA256 do corpo cru, header `sha256=<hex>`
fn verify_webhook_signature(headers: &HeaderMap, body: &[u8], secret: &str) -> AppResult<()> {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let signature_header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized(format!("Missing {} header", SIGNATURE_HEADER)))?;

    let signature = signature_header.strip_prefix("sha256=").unwrap_or(signature_header);
    let signature = hex::decode(signature.trim())
        .map_err(|_| AppError::Unauthorized("Malformed webhook signature".to_string()))?;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::ConfigError(format!("Invalid signing secret: {}", e)))?;
    mac.update(body);

    // verify_slice compara em tempo constante
    mac.verify_slice(&signature).map_err(|_| {
        log_validation_error("webhook_signature", "Invalid signature");
        AppError::Unauthorized("Invalid webhook signature".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn test_signature_verification() {
        let body = br#"{"instanceName":"shop1"}"#;
        let mut headers = HeaderMap::new();

        assert!(matches!(
            verify_webhook_signature(&headers, body, "s3cret"),
            Err(AppError::Unauthorized(_))
        ));

        headers.insert(SIGNATURE_HEADER, HeaderValue::from_str(&sign("s3cret", body)).unwrap());
        assert!(verify_webhook_signature(&headers, body, "s3cret").is_ok());
        assert!(verify_webhook_signature(&headers, b"{}", "s3cret").is_err());
        assert!(verify_webhook_signature(&headers, body, "other").is_err());
    }
}
