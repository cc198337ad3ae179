use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;
use whatsapp_providers::ProviderKind;

use super::connection::{Connection, ConnectionStatus};
use super::message::MessageStatus;
use super::webhook_payload::{EventKind, MediaDescriptor, ProviderWebhook};

/// Envelope canônico de um evento recebido, já associado ao tenant
#[derive(Debug, Clone, Serialize)]
pub struct InboundEvent {
    pub id: Uuid,
    pub kind: EventKind,
    pub provider: ProviderKind,
    pub event_name: String,
    pub connection_id: String,
    pub workspace_id: String,
    pub instance_name: String,
    pub instance_token: Option<String>,
    pub client_token: Option<String>,
    pub external_id: Option<String>,
    pub external_ids: Vec<String>,
    pub status: Option<MessageStatus>,
    pub item_statuses: Vec<(String, MessageStatus)>,
    pub connection_status: Option<ConnectionStatus>,
    pub media: Option<MediaDescriptor>,
    pub timestamp: DateTime<Utc>,
    pub raw: Value,
}

impl InboundEvent {
    pub fn new(webhook: ProviderWebhook, connection: &Connection) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: webhook.kind,
            provider: webhook.provider,
            external_id: webhook.external_id().map(str::to_string),
            event_name: webhook.event_name,
            connection_id: connection.id.clone(),
            workspace_id: connection.workspace_id.clone(),
            instance_name: connection.name.clone(),
            instance_token: connection.metadata.instance_token.clone(),
            client_token: connection.metadata.client_token.clone(),
            external_ids: webhook.external_ids,
            status: webhook.status,
            item_statuses: webhook.item_statuses,
            connection_status: webhook.connection_status,
            media: webhook.media,
            timestamp: webhook.timestamp.unwrap_or_else(Utc::now),
            raw: webhook.raw,
        }
    }

    /// Status textual encaminhado: status da mensagem, senão estado da conexão
    pub fn status_label(&self) -> Option<String> {
        self.status
            .as_ref()
            .map(|s| s.as_str().to_string())
            .or_else(|| self.connection_status.map(|s| s.as_str().to_string()))
    }

    /// Corpo enviado ao webhook do tenant (n8n)
    pub fn forward_payload(&self) -> Value {
        let mut payload = json!({
            "event_type": self.kind.as_str(),
            "provider": self.provider.as_str(),
            "instance_name": self.instance_name,
            "instance_token": self.instance_token,
            "client_token": self.client_token,
            "workspace_id": self.workspace_id,
            "connection_id": self.connection_id,
            "external_id": self.external_id,
            "status": self.status_label(),
            "timestamp": self.timestamp.to_rfc3339(),
            "webhook_data": self.raw,
        });

        if let Some(media) = &self.media {
            payload["media"] = json!({
                "base64": media
                    .data
                    .as_ref()
                    .map(|bytes| base64::engine::general_purpose::STANDARD.encode(bytes)),
                "mimetype": media.mime_type,
                "filename": media.file_name,
                "url": media.url,
                "kind": media.kind.as_str(),
            });
        }

        payload
    }
}
