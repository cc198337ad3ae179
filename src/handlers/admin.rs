use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::utils::logging::*;
use crate::utils::{AppError, AppResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceQuery {
    pub workspace_id: Option<String>,
}

/// GET /admin/provider-configs?workspaceId=
pub async fn list_provider_configs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WorkspaceQuery>,
) -> AppResult<Json<Value>> {
    log_request_received("/admin/provider-configs", "GET");

    let workspace_id = query
        .workspace_id
        .filter(|ws| !ws.trim().is_empty())
        .ok_or_else(|| AppError::ValidationError("workspaceId is required".to_string()))?;

    let configs = state.store.list_provider_configs(&workspace_id).await?;

    Ok(Json(json!({
        "success": true,
        "workspaceId": workspace_id,
        "count": configs.len(),
        "configs": configs
    })))
}

/// POST /admin/provider-configs/:id/activate
pub async fn activate_provider_config(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    log_request_received("/admin/provider-configs/:id/activate", "POST");

    let config = state.store.activate_provider_config(&id).await?;
    log_info(&format!(
        "✅ Provedor {} ({}) ativado para o workspace {}",
        config.label(),
        config.id,
        config.workspace_id
    ));

    Ok(Json(json!({
        "success": true,
        "config": config
    })))
}

/// POST /admin/connections/sync?workspaceId=
pub async fn sync_connections(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WorkspaceQuery>,
) -> AppResult<Json<Value>> {
    log_request_received("/admin/connections/sync", "POST");

    let report = state.sync.sync(query.workspace_id.as_deref()).await?;

    Ok(Json(json!({
        "success": true,
        "report": report
    })))
}
