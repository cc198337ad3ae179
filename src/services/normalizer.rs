//! Normalizador de webhooks de entrada
//!
//! Fluxo: parse tipado → resolve a conexão → efeitos síncronos (atividade, estado da
//! conexão, status da mensagem) → encaminhamento em task destacada. O provedor recebe
//! o ACK assim que a conexão é resolvida; download de mídia e POST para o n8n não
//! afetam a resposta.

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;
use whatsapp_providers::ProviderKind;

use crate::config::settings::WebhookSettings;
use crate::config::{non_blank, Resolved, ResolverChain};
use crate::models::{Connection, EventKind, InboundEvent, ProviderWebhook, StatusUpdate};
use crate::services::forwarder::{ForwardReport, Forwarder};
use crate::services::media_fetcher::MediaFetcher;
use crate::store::Store;
use crate::utils::logging::*;
use crate::utils::{AppError, AppResult};

/// Resposta imediata ao provedor; `forward` permite aguardar o encaminhamento em testes
#[derive(Debug)]
pub struct WebhookAck {
    pub event_id: Uuid,
    pub connection_id: String,
    pub kind: EventKind,
    pub forward: Option<JoinHandle<ForwardReport>>,
}

#[derive(Clone)]
pub struct WebhookNormalizer {
    store: Arc<dyn Store>,
    media_fetcher: MediaFetcher,
    forwarder: Forwarder,
    default_forward_url: Option<String>,
}

impl WebhookNormalizer {
    pub fn new(
        store: Arc<dyn Store>,
        media_fetcher: MediaFetcher,
        forwarder: Forwarder,
        default_forward_url: Option<String>,
    ) -> Self {
        Self {
            store,
            media_fetcher,
            forwarder,
            default_forward_url: non_blank(default_forward_url.as_deref()),
        }
    }

    pub fn from_settings(store: Arc<dyn Store>, settings: &WebhookSettings) -> AppResult<Self> {
        Ok(Self::new(
            store,
            MediaFetcher::from_settings(settings)?,
            Forwarder::new(Duration::from_secs(settings.forward_timeout_seconds))?,
            settings.default_forward_url.clone(),
        ))
    }

    pub async fn handle(&self, raw: Value, hint: Option<ProviderKind>) -> AppResult<WebhookAck> {
        let hint = match hint {
            None if ProviderWebhook::detect_by_shape(&raw).is_none() => self.connection_provider(&raw).await?,
            hint => hint,
        };
        let webhook = ProviderWebhook::parse(raw, hint)?;
        log_webhook_received(webhook.provider.as_str(), &webhook.instance_ref, &webhook.event_name);

        let connection = match self.store.find_connection(&webhook.instance_ref).await? {
            Some(connection) => connection,
            None => {
                log_connection_not_found(&webhook.instance_ref);
                return Err(AppError::ConnectionNotFound(webhook.instance_ref));
            }
        };

        let event = InboundEvent::new(webhook, &connection);

        self.apply_connection_effects(&connection, &event).await;
        if event.kind == EventKind::StatusUpdate {
            self.persist_status(&event).await;
        }

        let ack = WebhookAck {
            event_id: event.id,
            connection_id: connection.id.clone(),
            kind: event.kind,
            forward: None,
        };

        let forward = match self.resolve_forward_url(&connection).await {
            Some(target) => {
                tracing::debug!("Destino do encaminhamento via {}: {}", target.source, target.value);
                Some(self.spawn_forward(event, target.value))
            }
            None => {
                log_warning(&format!(
                    "⚠️ Nenhum webhook configurado para o workspace {} - evento {} não encaminhado",
                    connection.workspace_id, event.id
                ));
                None
            }
        };

        Ok(WebhookAck { forward, ..ack })
    }

    /// Provedor da configuração da conexão, para corpos de formato ambíguo
    async fn connection_provider(&self, raw: &Value) -> AppResult<Option<ProviderKind>> {
        let Some(instance_ref) = ProviderWebhook::instance_of(raw) else {
            return Ok(None);
        };
        let Some(connection) = self.store.find_connection(&instance_ref).await? else {
            log_connection_not_found(&instance_ref);
            return Err(AppError::ConnectionNotFound(instance_ref));
        };

        let bound = match connection.provider_config_id.as_deref() {
            Some(id) => self.store.provider_config(id).await?,
            None => None,
        };
        let config = match bound {
            Some(config) => Some(config),
            None => self.store.active_provider_config(&connection.workspace_id).await?,
        };

        Ok(config.map(|c| c.provider))
    }

    /// Atividade e estado da conexão; falhas só são logadas
    async fn apply_connection_effects(&self, connection: &Connection, event: &InboundEvent) {
        if let Err(e) = self.store.touch_connection(&connection.id, Utc::now()).await {
            log_warning(&format!("⚠️ Falha ao atualizar last_activity_at de {}: {}", connection.id, e));
        }

        if let Some(status) = event.connection_status.filter(|s| *s != connection.status) {
            match self.store.update_connection_status(&connection.id, status).await {
                Ok(()) => log_info(&format!(
                    "🔌 Conexão {} ({}): {} → {}",
                    connection.name, connection.id, connection.status, status
                )),
                Err(e) => log_warning(&format!(
                    "⚠️ Falha ao gravar status {} da conexão {}: {}",
                    status, connection.id, e
                )),
            }
        }
    }

    /// Correlaciona callbacks de status com mensagens enviadas por este workspace
    async fn persist_status(&self, event: &InboundEvent) {
        for (external_id, status) in &event.item_statuses {
            let update = StatusUpdate { status: status.clone(), at: event.timestamp };
            match self
                .store
                .update_message_status(&event.workspace_id, external_id, &update)
                .await
            {
                Ok(matched) => log_status_correlated(external_id, update.status.as_str(), matched),
                Err(e) => log_warning(&format!(
                    "⚠️ Falha ao gravar status '{}' da mensagem {}: {}",
                    update.status, external_id, e
                )),
            }
        }
    }

    /// Conexão → configuração do workspace → padrão do processo
    async fn resolve_forward_url(&self, connection: &Connection) -> Option<Resolved<String>> {
        let from_connection = non_blank(connection.metadata.webhook_url.as_deref());

        let from_workspace = if from_connection.is_none() {
            match self.store.tenant_webhook_url(&connection.workspace_id).await {
                Ok(url) => non_blank(url.as_deref()),
                Err(e) => {
                    log_warning(&format!(
                        "⚠️ Falha ao ler webhook do workspace {}: {}",
                        connection.workspace_id, e
                    ));
                    None
                }
            }
        } else {
            None
        };

        ResolverChain::new()
            .then_value("connection", from_connection)
            .then_value("workspace", from_workspace)
            .then_value("default", self.default_forward_url.clone())
            .resolve()
    }

    fn spawn_forward(&self, mut event: InboundEvent, url: String) -> JoinHandle<ForwardReport> {
        let media_fetcher = self.media_fetcher.clone();
        let forwarder = self.forwarder.clone();

        tokio::spawn(async move {
            if let Some(media) = event.media.as_mut() {
                media_fetcher.fill(media).await;
            }
            forwarder.forward(&url, &event.forward_payload()).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConnectionMetadata, ConnectionStatus, MessageRecord, MessageStatus, ProviderConfig};
    use crate::store::InMemoryStore;
    use httpmock::prelude::*;
    use serde_json::json;

    fn connection(webhook_url: Option<String>) -> Connection {
        Connection {
            id: "c1".to_string(),
            workspace_id: "T".to_string(),
            name: "shop1".to_string(),
            status: ConnectionStatus::Connected,
            provider_config_id: None,
            metadata: ConnectionMetadata {
                instance_id: Some("3C01ABC".to_string()),
                webhook_url,
                ..Default::default()
            },
            last_activity_at: None,
        }
    }

    fn message(external_id: &str) -> MessageRecord {
        MessageRecord {
            id: "m1".to_string(),
            workspace_id: "T".to_string(),
            idempotency_key: None,
            external_id: Some(external_id.to_string()),
            status: MessageStatus::Sent,
            delivered_at: None,
            read_at: None,
            updated_at: None,
        }
    }

    fn normalizer(store: Arc<InMemoryStore>, default_forward_url: Option<String>) -> WebhookNormalizer {
        WebhookNormalizer::new(
            store,
            MediaFetcher::new(Duration::from_secs(2), 3, Duration::from_millis(1)).unwrap(),
            Forwarder::new(Duration::from_secs(2)).unwrap(),
            default_forward_url,
        )
    }

    #[tokio::test]
    async fn test_status_callback_updates_message_and_forwards() {
        let server = MockServer::start_async().await;
        let downstream = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/n8n")
                    .json_body_partial(r#"{"event_type": "status_update", "status": "delivered", "external_id": "abc123"}"#);
                then.status(200);
            })
            .await;

        let store = Arc::new(InMemoryStore::new());
        store.insert_connection(connection(Some(server.url("/n8n")))).await;
        store.insert_message(message("abc123")).await;

        let ack = normalizer(store.clone(), None)
            .handle(
                json!({"instanceName": "shop1", "event": "MessageStatusCallback", "ids": ["abc123"], "status": "DELIVERED"}),
                None,
            )
            .await
            .unwrap();

        let record = store.message("m1").await.unwrap();
        assert_eq!(record.status, MessageStatus::Delivered);
        assert!(record.delivered_at.is_some());
        assert!(record.read_at.is_none());

        assert_eq!(ack.kind, EventKind::StatusUpdate);
        let report = ack.forward.unwrap().await.unwrap();
        assert!(report.is_success());
        downstream.assert_async().await;
    }

    #[tokio::test]
    async fn test_evolution_batch_applies_each_item_status() {
        let store = Arc::new(InMemoryStore::new());
        store.insert_connection(connection(None)).await;
        store.insert_message(message("A")).await;
        store
            .insert_message(MessageRecord {
                id: "m2".to_string(),
                ..message("B")
            })
            .await;

        normalizer(store.clone(), None)
            .handle(
                json!({
                    "event": "messages.update",
                    "instance": "shop1",
                    "data": [
                        {"keyId": "A", "status": "DELIVERY_ACK"},
                        {"keyId": "B", "status": "READ"}
                    ]
                }),
                None,
            )
            .await
            .unwrap();

        let first = store.message("m1").await.unwrap();
        assert_eq!(first.status, MessageStatus::Delivered);
        assert!(first.delivered_at.is_some());
        assert!(first.read_at.is_none());

        let second = store.message("m2").await.unwrap();
        assert_eq!(second.status, MessageStatus::Read);
        assert!(second.read_at.is_some());
        assert!(second.delivered_at.is_none());
    }

    #[tokio::test]
    async fn test_uncorrelated_status_leaves_store_unchanged_and_still_forwards() {
        let server = MockServer::start_async().await;
        let downstream = server
            .mock_async(|when, then| {
                when.method(POST).path("/default");
                then.status(200);
            })
            .await;

        let store = Arc::new(InMemoryStore::new());
        store.insert_connection(connection(None)).await;
        store.insert_message(message("abc123")).await;

        let ack = normalizer(store.clone(), Some(server.url("/default")))
            .handle(
                json!({"instanceId": "3C01ABC", "type": "MessageStatusCallback", "ids": ["other"], "status": "READ"}),
                None,
            )
            .await
            .unwrap();

        assert_eq!(store.message("m1").await.unwrap(), message("abc123"));
        ack.forward.unwrap().await.unwrap();
        downstream.assert_async().await;
    }

    #[tokio::test]
    async fn test_unreachable_media_still_forwards_event() {
        let server = MockServer::start_async().await;
        let media = server
            .mock_async(|when, then| {
                when.method(GET).path("/media/a.jpg");
                then.status(404);
            })
            .await;
        let downstream = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/n8n")
                    .json_body_partial(r#"{"event_type": "media", "media": {"base64": null, "mimetype": "image/jpeg"}}"#);
                then.status(200);
            })
            .await;

        let store = Arc::new(InMemoryStore::new());
        store.set_tenant_webhook_url("T", &server.url("/n8n")).await;
        store.insert_connection(connection(None)).await;

        let ack = normalizer(store, None)
            .handle(
                json!({
                    "instanceId": "3C01ABC",
                    "type": "ReceivedCallback",
                    "messageId": "3EB0",
                    "image": {"imageUrl": server.url("/media/a.jpg"), "mimeType": "image/jpeg"}
                }),
                Some(ProviderKind::ZApi),
            )
            .await
            .unwrap();

        ack.forward.unwrap().await.unwrap();
        media.assert_hits_async(3).await;
        downstream.assert_async().await;
    }

    #[tokio::test]
    async fn test_ambiguous_body_uses_connection_provider() {
        let store = Arc::new(InMemoryStore::new());
        store
            .insert_connection(Connection {
                provider_config_id: Some("zapi".to_string()),
                ..connection(None)
            })
            .await;
        store
            .insert_provider_config(ProviderConfig {
                id: "zapi".to_string(),
                workspace_id: "T".to_string(),
                provider: ProviderKind::ZApi,
                name: None,
                base_url: None,
                api_key: None,
                instance_id: Some("3C01ABC".to_string()),
                instance_token: Some("tok".to_string()),
                client_token: None,
                is_active: true,
                fallback_enabled: false,
                fallback_config_id: None,
            })
            .await;

        let ack = normalizer(store.clone(), None)
            .handle(json!({"instanceName": "shop1", "event": "custom"}), None)
            .await
            .unwrap();

        assert_eq!(ack.connection_id, "c1");
        assert_eq!(ack.kind, EventKind::Message);

        let ghost = normalizer(store, None)
            .handle(json!({"instanceName": "ghost", "event": "custom"}), None)
            .await;
        assert!(matches!(ghost, Err(AppError::ConnectionNotFound(_))));
    }

    #[tokio::test]
    async fn test_unknown_instance_is_connection_not_found() {
        let store = Arc::new(InMemoryStore::new());
        let result = normalizer(store, Some("http://127.0.0.1:9/never".to_string()))
            .handle(json!({"instanceName": "ghost", "event": "MessageStatusCallback", "ids": ["x"]}), None)
            .await;

        assert!(matches!(result, Err(AppError::ConnectionNotFound(ref i)) if i == "ghost"));
    }

    #[tokio::test]
    async fn test_connection_update_and_activity_are_recorded() {
        let store = Arc::new(InMemoryStore::new());
        store.insert_connection(connection(None)).await;

        let ack = normalizer(store.clone(), None)
            .handle(
                json!({"event": "connection.update", "instance": "shop1", "data": {"state": "close"}}),
                None,
            )
            .await
            .unwrap();

        assert!(ack.forward.is_none());
        let stored = store.connection("c1").await.unwrap();
        assert_eq!(stored.status, ConnectionStatus::Disconnected);
        assert!(stored.last_activity_at.is_some());
    }
}
