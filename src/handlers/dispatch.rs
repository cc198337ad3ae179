use axum::{extract::State, http::StatusCode, response::Json};
use std::sync::Arc;
use tokio::time::Instant;

use crate::models::{OutboundSendRequest, SendResult};
use crate::utils::logging::*;
use crate::utils::{AppError, PROVIDER_NOT_CONFIGURED};
use crate::AppState;

/// POST /dispatch/send
///
/// O corpo é sempre um `SendResult`; o status HTTP só reflete a categoria do resultado:
/// 200 enviado, 412 sem provedor configurado, 502 falha do provedor.
pub async fn handle_send(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OutboundSendRequest>,
) -> Result<(StatusCode, Json<SendResult>), AppError> {
    let start_time = Instant::now();
    log_request_received("/dispatch/send", "POST");

    request.validate()?;

    let result = state.router.dispatch(&request).await?;

    let status = if result.ok {
        StatusCode::OK
    } else if result.error.as_deref() == Some(PROVIDER_NOT_CONFIGURED) {
        StatusCode::PRECONDITION_FAILED
    } else {
        StatusCode::BAD_GATEWAY
    };

    log_request_processed("/dispatch/send", status.as_u16(), start_time.elapsed().as_millis() as u64);
    Ok((status, Json(result)))
}
