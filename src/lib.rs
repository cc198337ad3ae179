// Biblioteca do middleware de webhooks WhatsApp
// Expõe módulos para uso em testes e no binário

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use config::Settings;
use services::{ConnectionSync, DispatchRouter, WebhookNormalizer};
use store::Store;
use utils::AppResult;

/// Estado compartilhado, construído uma vez no startup
#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub store: Arc<dyn Store>,
    pub normalizer: WebhookNormalizer,
    pub router: DispatchRouter,
    pub sync: ConnectionSync,
}

impl AppState {
    pub fn new(settings: Settings, store: Arc<dyn Store>) -> AppResult<Self> {
        Ok(Self {
            normalizer: WebhookNormalizer::from_settings(store.clone(), &settings.webhook)?,
            router: DispatchRouter::from_settings(store.clone(), &settings)?,
            sync: ConnectionSync::from_settings(store.clone(), &settings)?,
            store,
            settings,
        })
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        // Health checks
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::ready_check))
        // Webhooks dos provedores (assinatura opcional validada no handler)
        .route("/webhooks/evolution", post(handlers::handle_evolution_webhook))
        .route("/webhooks/zapi", post(handlers::handle_zapi_webhook))
        .route("/webhooks/whatsapp", post(handlers::handle_whatsapp_webhook))
        // Envio (chamadores internos)
        .route("/dispatch/send", post(handlers::handle_send))
        .with_state(state.clone());

    let admin_routes = Router::new()
        .route("/admin/provider-configs", get(handlers::list_provider_configs))
        .route("/admin/provider-configs/:id/activate", post(handlers::activate_provider_config))
        .route("/admin/connections/sync", post(handlers::sync_connections))
        .layer(axum_middleware::from_fn(middleware::require_admin_key))
        .with_state(state);

    public_routes
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Connection, ConnectionMetadata, ConnectionStatus, MessageRecord, MessageStatus};
    use crate::store::InMemoryStore;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn app(store: Arc<InMemoryStore>) -> Router {
        let state = AppState::new(Settings::default(), store).unwrap();
        build_router(Arc::new(state))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .header("origin", "https://app.example.com")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_status_callback_end_to_end() {
        let store = Arc::new(InMemoryStore::new());
        store
            .insert_connection(Connection {
                id: "c1".to_string(),
                workspace_id: "T".to_string(),
                name: "shop1".to_string(),
                status: ConnectionStatus::Connected,
                provider_config_id: None,
                metadata: ConnectionMetadata::default(),
                last_activity_at: None,
            })
            .await;
        store
            .insert_message(MessageRecord {
                id: "m1".to_string(),
                workspace_id: "T".to_string(),
                idempotency_key: None,
                external_id: Some("abc123".to_string()),
                status: MessageStatus::Sent,
                delivered_at: None,
                read_at: None,
                updated_at: None,
            })
            .await;

        let response = app(store.clone())
            .await
            .oneshot(post_json(
                "/webhooks/zapi",
                json!({"instanceName": "shop1", "event": "MessageStatusCallback", "ids": ["abc123"], "status": "DELIVERED"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("access-control-allow-origin"));
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert!(body["id"].as_str().is_some_and(|id| !id.is_empty()));

        let record = store.message("m1").await.unwrap();
        assert_eq!(record.status, MessageStatus::Delivered);
        assert!(record.delivered_at.is_some());
    }

    #[tokio::test]
    async fn test_unknown_instance_returns_404() {
        let response = app(Arc::new(InMemoryStore::new()))
            .await
            .oneshot(post_json(
                "/webhooks/whatsapp",
                json!({"instanceName": "ghost", "event": "MessageStatusCallback", "ids": ["x"], "status": "READ"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key("access-control-allow-origin"));
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "CONNECTION_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_dispatch_without_config_is_412() {
        let response = app(Arc::new(InMemoryStore::new()))
            .await
            .oneshot(post_json(
                "/dispatch/send",
                json!({"workspaceId": "T", "to": "+15550001111", "text": "hi"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
        let body = body_json(response).await;
        assert_eq!(body, json!({"ok": false, "error": "PROVIDER_NOT_CONFIGURED"}));
    }

    #[tokio::test]
    async fn test_health_and_cors_preflight() {
        let router = app(Arc::new(InMemoryStore::new())).await;

        let health = router
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(health.status(), StatusCode::OK);

        let preflight = router
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/webhooks/evolution")
                    .header("origin", "https://app.example.com")
                    .header("access-control-request-method", "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(preflight.status().is_success());
        assert!(preflight.headers().contains_key("access-control-allow-methods"));
    }
}
