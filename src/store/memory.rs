use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{Store, StoreError, StoreResult};
use crate::models::{
    Connection, ConnectionStatus, MessageKey, MessageRecord, MessageStatus, ProviderConfig, StatusUpdate,
};

/// Conteúdo inicial do store em memória (desenvolvimento local)
#[derive(Debug, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub provider_configs: Vec<ProviderConfig>,
    #[serde(default)]
    pub messages: Vec<MessageRecord>,
    #[serde(default)]
    pub tenant_webhooks: HashMap<String, String>,  // workspace_id → URL n8n
}

#[derive(Debug, Default)]
struct Tables {
    connections: Vec<Connection>,
    provider_configs: Vec<ProviderConfig>,
    messages: Vec<MessageRecord>,
    tenant_webhooks: HashMap<String, String>,
}

/// Store em processo; todas as escritas de uma operação acontecem sob o mesmo lock
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: Seed) -> Self {
        Self {
            tables: RwLock::new(Tables {
                connections: seed.connections,
                provider_configs: seed.provider_configs,
                messages: seed.messages,
                tenant_webhooks: seed.tenant_webhooks,
            }),
        }
    }

    pub fn from_seed_file(path: &str) -> StoreResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Config(format!("cannot read seed file {}: {}", path, e)))?;
        let seed: Seed = serde_json::from_str(&content)?;
        Ok(Self::from_seed(seed))
    }

    pub async fn insert_connection(&self, connection: Connection) {
        self.tables.write().await.connections.push(connection);
    }

    pub async fn insert_provider_config(&self, config: ProviderConfig) {
        self.tables.write().await.provider_configs.push(config);
    }

    pub async fn insert_message(&self, message: MessageRecord) {
        self.tables.write().await.messages.push(message);
    }

    pub async fn set_tenant_webhook_url(&self, workspace_id: &str, url: &str) {
        self.tables
            .write()
            .await
            .tenant_webhooks
            .insert(workspace_id.to_string(), url.to_string());
    }

    pub async fn message(&self, id: &str) -> Option<MessageRecord> {
        self.tables.read().await.messages.iter().find(|m| m.id == id).cloned()
    }

    pub async fn connection(&self, id: &str) -> Option<Connection> {
        self.tables.read().await.connections.iter().find(|c| c.id == id).cloned()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn find_connection(&self, instance_ref: &str) -> StoreResult<Option<Connection>> {
        let tables = self.tables.read().await;
        Ok(tables
            .connections
            .iter()
            .find(|c| c.matches_instance(instance_ref))
            .cloned())
    }

    async fn list_connections(&self, workspace_id: Option<&str>) -> StoreResult<Vec<Connection>> {
        let tables = self.tables.read().await;
        Ok(tables
            .connections
            .iter()
            .filter(|c| c.status != ConnectionStatus::Deleted)
            .filter(|c| workspace_id.map_or(true, |ws| c.workspace_id == ws))
            .cloned()
            .collect())
    }

    async fn update_connection_status(&self, connection_id: &str, status: ConnectionStatus) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let connection = tables
            .connections
            .iter_mut()
            .find(|c| c.id == connection_id)
            .ok_or_else(|| StoreError::NotFound(format!("connection {}", connection_id)))?;
        connection.status = status;
        Ok(())
    }

    async fn touch_connection(&self, connection_id: &str, at: DateTime<Utc>) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(connection) = tables.connections.iter_mut().find(|c| c.id == connection_id) {
            connection.last_activity_at = Some(at);
        }
        Ok(())
    }

    async fn active_provider_config(&self, workspace_id: &str) -> StoreResult<Option<ProviderConfig>> {
        let tables = self.tables.read().await;
        Ok(tables
            .provider_configs
            .iter()
            .find(|c| c.workspace_id == workspace_id && c.is_active)
            .cloned())
    }

    async fn provider_config(&self, id: &str) -> StoreResult<Option<ProviderConfig>> {
        let tables = self.tables.read().await;
        Ok(tables.provider_configs.iter().find(|c| c.id == id).cloned())
    }

    async fn list_provider_configs(&self, workspace_id: &str) -> StoreResult<Vec<ProviderConfig>> {
        let tables = self.tables.read().await;
        Ok(tables
            .provider_configs
            .iter()
            .filter(|c| c.workspace_id == workspace_id)
            .cloned()
            .collect())
    }

    async fn activate_provider_config(&self, id: &str) -> StoreResult<ProviderConfig> {
        let mut tables = self.tables.write().await;

        let workspace_id = tables
            .provider_configs
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.workspace_id.clone())
            .ok_or_else(|| StoreError::NotFound(format!("provider config {}", id)))?;

        let mut activated = None;
        for config in tables.provider_configs.iter_mut().filter(|c| c.workspace_id == workspace_id) {
            config.is_active = config.id == id;
            if config.is_active {
                activated = Some(config.clone());
            }
        }

        activated.ok_or_else(|| StoreError::NotFound(format!("provider config {}", id)))
    }

    async fn update_message_status(
        &self,
        workspace_id: &str,
        external_id: &str,
        update: &StatusUpdate,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let mut matched = false;
        for message in tables
            .messages
            .iter_mut()
            .filter(|m| m.workspace_id == workspace_id && m.external_id.as_deref() == Some(external_id))
        {
            update.apply_to(message);
            matched = true;
        }
        Ok(matched)
    }

    async fn record_provider_message_id(
        &self,
        workspace_id: &str,
        key: &MessageKey,
        provider_msg_id: &str,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let message = tables.messages.iter_mut().find(|m| {
            m.workspace_id == workspace_id
                && match key {
                    MessageKey::IdempotencyKey(k) => m.idempotency_key.as_deref() == Some(k.as_str()),
                    MessageKey::LocalId(id) => &m.id == id,
                }
        });

        match message {
            Some(message) => {
                message.external_id = Some(provider_msg_id.to_string());
                message.status = MessageStatus::Sent;
                message.updated_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn tenant_webhook_url(&self, workspace_id: &str) -> StoreResult<Option<String>> {
        let tables = self.tables.read().await;
        Ok(tables.tenant_webhooks.get(workspace_id).cloned())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
