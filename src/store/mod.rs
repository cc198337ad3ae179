//! Backing store injetado nos dois componentes
//!
//! O processo constrói um único `Arc<dyn Store>` na inicialização; normalizador,
//! roteador e sincronização recebem o mesmo handle via `AppState`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{Connection, ConnectionStatus, MessageKey, ProviderConfig, StatusUpdate};

pub mod memory;
pub mod supabase;

pub use memory::InMemoryStore;
pub use supabase::SupabaseStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Store API error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("Invalid store response: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid store configuration: {0}")]
    Config(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    /// Conexão não deletada cujo nome ou id do provedor bate com `instance_ref`
    async fn find_connection(&self, instance_ref: &str) -> StoreResult<Option<Connection>>;

    /// Conexões não deletadas, opcionalmente de um único workspace
    async fn list_connections(&self, workspace_id: Option<&str>) -> StoreResult<Vec<Connection>>;

    async fn update_connection_status(&self, connection_id: &str, status: ConnectionStatus) -> StoreResult<()>;

    async fn touch_connection(&self, connection_id: &str, at: DateTime<Utc>) -> StoreResult<()>;

    async fn active_provider_config(&self, workspace_id: &str) -> StoreResult<Option<ProviderConfig>>;

    async fn provider_config(&self, id: &str) -> StoreResult<Option<ProviderConfig>>;

    async fn list_provider_configs(&self, workspace_id: &str) -> StoreResult<Vec<ProviderConfig>>;

    /// Ativa `id` e desativa as demais do mesmo workspace numa única operação atômica
    async fn activate_provider_config(&self, id: &str) -> StoreResult<ProviderConfig>;

    /// Aplica o status às mensagens do workspace com esse `external_id`.
    /// Retorna `false` quando nenhuma mensagem foi encontrada.
    async fn update_message_status(
        &self,
        workspace_id: &str,
        external_id: &str,
        update: &StatusUpdate,
    ) -> StoreResult<bool>;

    /// Grava o id do provedor após um envio bem-sucedido (status passa a `sent`)
    async fn record_provider_message_id(
        &self,
        workspace_id: &str,
        key: &MessageKey,
        provider_msg_id: &str,
    ) -> StoreResult<bool>;

    /// Webhook n8n configurado pelo tenant
    async fn tenant_webhook_url(&self, workspace_id: &str) -> StoreResult<Option<String>>;

    async fn ping(&self) -> StoreResult<()>;
}
