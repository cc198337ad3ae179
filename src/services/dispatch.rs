//! Roteador de envio com fallback de provedor
//!
//! Resolve a configuração ativa do workspace, pré-processa a mídia, envia pelo
//! provedor primário e, se a configuração permitir, tenta uma única vez o secundário.
//! Falhas de envio viram `SendResult { ok: false }`; apenas falhas do store sobem como erro.

use reqwest::Client as HttpClient;
use std::sync::Arc;
use std::time::Duration;
use whatsapp_providers::{build_http_client, OutboundMessage, ProviderError, ProviderReply};

use crate::config::settings::Settings;
use crate::config::ResolverChain;
use crate::models::{Connection, OutboundSendRequest, ProviderConfig, SendResult};
use crate::services::media_processor::MediaProcessor;
use crate::services::provider_clients::build_provider_client;
use crate::store::Store;
use crate::utils::logging::*;
use crate::utils::{AppError, AppResult, PROVIDER_NOT_CONFIGURED};

#[derive(Clone)]
pub struct DispatchRouter {
    store: Arc<dyn Store>,
    http_client: HttpClient,
    media_processor: MediaProcessor,
}

impl DispatchRouter {
    pub fn new(store: Arc<dyn Store>, http_client: HttpClient, media_processor: MediaProcessor) -> Self {
        Self { store, http_client, media_processor }
    }

    pub fn from_settings(store: Arc<dyn Store>, settings: &Settings) -> AppResult<Self> {
        let http_client = build_http_client(Duration::from_secs(settings.dispatch.timeout_seconds))
            .map_err(|e| AppError::ConfigError(format!("provider http client: {}", e)))?;
        let media_processor = MediaProcessor::new(&settings.storage, &settings.store)?;
        Ok(Self::new(store, http_client, media_processor))
    }

    pub async fn dispatch(&self, request: &OutboundSendRequest) -> AppResult<SendResult> {
        let workspace_id = request.workspace_id.as_str();

        let Some(primary) = self.store.active_provider_config(workspace_id).await? else {
            log_warning(&format!("⚠️ Workspace {} sem provedor ativo", workspace_id));
            return Ok(SendResult::failure(PROVIDER_NOT_CONFIGURED));
        };

        let instance = request.context.instance.as_deref();
        let connection = self.sending_connection(workspace_id, instance).await?;

        let primary_client = match build_provider_client(&self.http_client, &primary, connection.as_ref(), instance) {
            Ok(client) => client,
            Err(e) => {
                log_warning(&format!(
                    "⚠️ Provedor {} do workspace {} sem credenciais: {}",
                    primary.label(), workspace_id, e
                ));
                return Ok(SendResult::failure(PROVIDER_NOT_CONFIGURED));
            }
        };

        let media_url = match request.media_url.as_deref() {
            Some(url) if !url.trim().is_empty() => Some(self.media_processor.provider_reachable_url(url).await),
            _ => None,
        };
        let message = request.to_outbound_message(media_url.as_deref());

        let primary_error = match primary_client.send(&message).await {
            Ok(reply) => {
                log_dispatch_result(workspace_id, primary.label(), true, reply.message_id.as_deref().unwrap_or("-"));
                self.record_success(request, &reply).await;
                return Ok(SendResult::success(reply.provider, reply.message_id));
            }
            Err(e) => {
                log_dispatch_result(workspace_id, primary.label(), false, &e.to_string());
                e
            }
        };

        let Some(secondary) = self.secondary_config(&primary).await else {
            return Ok(SendResult::failure(primary_error.provider_message()));
        };

        log_failover(workspace_id, primary.label(), secondary.label());

        match self.send_secondary(&secondary, connection.as_ref(), instance, &message).await {
            Ok(reply) => {
                log_dispatch_result(workspace_id, secondary.label(), true, reply.message_id.as_deref().unwrap_or("-"));
                self.record_success(request, &reply).await;
                Ok(SendResult {
                    failover_from: Some(primary.label().to_string()),
                    ..SendResult::success(reply.provider, reply.message_id)
                })
            }
            Err(e) => {
                log_dispatch_result(workspace_id, secondary.label(), false, &e.to_string());
                Ok(SendResult::failure(format!(
                    "{}: {}; {}: {}",
                    primary.label(),
                    primary_error.provider_message(),
                    secondary.label(),
                    e.provider_message()
                )))
            }
        }
    }

    /// Conexão indicada em `context.instance`, desde que seja do mesmo workspace
    async fn sending_connection(&self, workspace_id: &str, instance: Option<&str>) -> AppResult<Option<Connection>> {
        let Some(instance) = instance.filter(|i| !i.trim().is_empty()) else {
            return Ok(None);
        };
        let connection = self
            .store
            .find_connection(instance)
            .await?
            .filter(|c| c.workspace_id == workspace_id);
        if connection.is_none() {
            tracing::debug!("Instância {} sem conexão registrada no workspace {}", instance, workspace_id);
        }
        Ok(connection)
    }

    /// `fallback_config_id` explícito, senão outra configuração do workspace com provedor diferente
    async fn secondary_config(&self, primary: &ProviderConfig) -> Option<ProviderConfig> {
        if !primary.fallback_enabled {
            return None;
        }

        let explicit = match primary.fallback_config_id.as_deref() {
            Some(id) => self
                .store
                .provider_config(id)
                .await
                .unwrap_or_else(|e| {
                    log_warning(&format!("⚠️ Falha ao ler configuração de fallback {}: {}", id, e));
                    None
                })
                .filter(|c| c.workspace_id == primary.workspace_id && c.id != primary.id),
            None => None,
        };

        let siblings = if explicit.is_none() {
            self.store
                .list_provider_configs(&primary.workspace_id)
                .await
                .unwrap_or_else(|e| {
                    log_warning(&format!("⚠️ Falha ao listar configurações de {}: {}", primary.workspace_id, e));
                    Vec::new()
                })
        } else {
            Vec::new()
        };

        let resolved = ResolverChain::new()
            .then_value("fallback_config_id", explicit)
            .then("workspace", || {
                siblings
                    .into_iter()
                    .find(|c| c.id != primary.id && c.provider != primary.provider)
            })
            .resolve();

        if resolved.is_none() {
            log_warning(&format!(
                "⚠️ Fallback habilitado em {} mas nenhuma configuração secundária encontrada",
                primary.id
            ));
        }
        resolved.map(|r| r.value)
    }

    async fn send_secondary(
        &self,
        config: &ProviderConfig,
        connection: Option<&Connection>,
        instance: Option<&str>,
        message: &OutboundMessage,
    ) -> Result<ProviderReply, ProviderError> {
        // Metadados da conexão pertencem ao provedor primário
        let connection = connection.filter(|c| c.provider_config_id.as_deref() == Some(config.id.as_str()));
        let client = build_provider_client(&self.http_client, config, connection, instance)?;
        client.send(message).await
    }

    /// Grava o id do provedor para correlacionar callbacks futuros; falha só é logada
    async fn record_success(&self, request: &OutboundSendRequest, reply: &ProviderReply) {
        let (Some(key), Some(provider_msg_id)) = (request.message_key(), reply.message_id.as_deref()) else {
            return;
        };

        match self
            .store
            .record_provider_message_id(&request.workspace_id, &key, provider_msg_id)
            .await
        {
            Ok(true) => {}
            Ok(false) => log_warning(&format!(
                "⚠️ Mensagem local {:?} não encontrada para gravar id {}",
                key, provider_msg_id
            )),
            Err(e) => log_error(&format!(
                "❌ Falha ao gravar id {} do provedor: {}",
                provider_msg_id, e
            )),
        }
    }
}
