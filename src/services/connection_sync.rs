use reqwest::Client as HttpClient;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use whatsapp_providers::build_http_client;

use crate::config::settings::Settings;
use crate::models::{Connection, ConnectionStatus, ProviderConfig};
use crate::services::provider_clients::build_provider_client;
use crate::store::Store;
use crate::utils::logging::*;
use crate::utils::{AppError, AppResult};

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    pub checked: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Reconciliação do status das conexões com o estado reportado pelo provedor
#[derive(Clone)]
pub struct ConnectionSync {
    store: Arc<dyn Store>,
    http_client: HttpClient,
}

impl ConnectionSync {
    pub fn new(store: Arc<dyn Store>, http_client: HttpClient) -> Self {
        Self { store, http_client }
    }

    pub fn from_settings(store: Arc<dyn Store>, settings: &Settings) -> AppResult<Self> {
        let http_client = build_http_client(Duration::from_secs(settings.dispatch.timeout_seconds))
            .map_err(|e| AppError::ConfigError(format!("sync http client: {}", e)))?;
        Ok(Self::new(store, http_client))
    }

    pub async fn sync(&self, workspace_id: Option<&str>) -> AppResult<SyncReport> {
        let connections = self.store.list_connections(workspace_id).await?;
        let mut report = SyncReport::default();

        for connection in connections {
            report.checked += 1;

            let Some(config) = self.config_for(&connection).await? else {
                tracing::debug!("Conexão {} sem configuração de provedor, ignorada", connection.id);
                report.skipped += 1;
                continue;
            };

            let client = match build_provider_client(&self.http_client, &config, Some(&connection), None) {
                Ok(client) => client,
                Err(e) => {
                    tracing::debug!("Conexão {} sem credenciais ({}), ignorada", connection.id, e);
                    report.skipped += 1;
                    continue;
                }
            };

            let status: ConnectionStatus = match client.connection_state().await {
                Ok(state) => state.into(),
                Err(e) => {
                    log_warning(&format!(
                        "⚠️ Falha ao consultar estado de {} via {}: {}",
                        connection.name, config.label(), e
                    ));
                    report.failed += 1;
                    continue;
                }
            };

            if status != connection.status {
                self.store.update_connection_status(&connection.id, status).await?;
                log_info(&format!(
                    "🔄 Conexão {} sincronizada: {} → {}",
                    connection.name, connection.status, status
                ));
                report.updated += 1;
            }
        }

        log_info(&format!(
            "✅ Sincronização concluída - verificadas: {}, atualizadas: {}, ignoradas: {}, falhas: {}",
            report.checked, report.updated, report.skipped, report.failed
        ));
        Ok(report)
    }

    /// Configuração vinculada à conexão, senão a ativa do workspace
    async fn config_for(&self, connection: &Connection) -> AppResult<Option<ProviderConfig>> {
        if let Some(id) = connection.provider_config_id.as_deref() {
            if let Some(config) = self.store.provider_config(id).await? {
                return Ok(Some(config));
            }
        }
        Ok(self.store.active_provider_config(&connection.workspace_id).await?)
    }

    /// Loop periódico; o primeiro tick é descartado para não competir com o startup
    pub fn spawn_periodic(self, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            interval.tick().await;

            loop {
                interval.tick().await;
                if let Err(e) = self.sync(None).await {
                    log_error(&format!("❌ Sincronização periódica de conexões falhou: {}", e));
                }
            }
        })
    }
}
