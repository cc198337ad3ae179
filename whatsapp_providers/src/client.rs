//! Cliente unificado e leitura das respostas dos provedores

use crate::error::{ProviderError, Result};
use crate::evolution::EvolutionClient;
use crate::types::{ConnectionState, OutboundMessage, ProviderKind, ProviderReply};
use crate::zapi::ZApiClient;
use reqwest::{Client as HttpClient, Response};
use serde_json::Value;
use std::time::Duration;

/// Cria o cliente HTTP usado pelos provedores
///
/// # Timeouts
///
/// - Total: `total_timeout`
/// - Connect: 5s
pub fn build_http_client(total_timeout: Duration) -> Result<HttpClient> {
    let client = HttpClient::builder()
        .timeout(total_timeout)
        .connect_timeout(Duration::from_secs(5))
        .build()?;
    Ok(client)
}

/// Cliente de um provedor concreto, escolhido pela configuração ativa do tenant
#[derive(Clone)]
pub enum ProviderClient {
    Evolution(EvolutionClient),
    ZApi(ZApiClient),
}

impl ProviderClient {
    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderClient::Evolution(_) => ProviderKind::Evolution,
            ProviderClient::ZApi(_) => ProviderKind::ZApi,
        }
    }

    pub async fn send(&self, message: &OutboundMessage) -> Result<ProviderReply> {
        match self {
            ProviderClient::Evolution(client) => client.send(message).await,
            ProviderClient::ZApi(client) => client.send(message).await,
        }
    }

    pub async fn connection_state(&self) -> Result<ConnectionState> {
        match self {
            ProviderClient::Evolution(client) => client.connection_state().await,
            ProviderClient::ZApi(client) => client.connection_state().await,
        }
    }
}

/// Lê a resposta de envio: não-2xx e 2xx com erro embutido são tratados igualmente como falha
pub(crate) async fn read_reply(provider: ProviderKind, response: Response) -> Result<ProviderReply> {
    let raw = read_json(provider, response).await?;

    if let Some(message) = embedded_error(&raw) {
        tracing::warn!("⚠️ {} retornou 2xx com erro: {}", provider, message);
        return Err(ProviderError::Rejected { provider, message });
    }

    Ok(ProviderReply {
        provider,
        message_id: extract_message_id(provider, &raw),
        raw,
    })
}

/// Corpo JSON de uma resposta 2xx; corpo não-JSON vira string
pub(crate) async fn read_json(provider: ProviderKind, response: Response) -> Result<Value> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(ProviderError::ApiError {
            provider,
            status: status.as_u16(),
            message: text,
        });
    }

    Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

/// Detecta flags de erro em respostas 2xx (`error`, `status: "error"`, `success: false`)
pub fn embedded_error(raw: &Value) -> Option<String> {
    let flagged = match raw.get("error") {
        Some(Value::Bool(true)) => true,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Object(_)) | Some(Value::Array(_)) => true,
        _ => false,
    } || raw
        .get("status")
        .and_then(Value::as_str)
        .is_some_and(|s| s.eq_ignore_ascii_case("error"))
        || raw.get("success") == Some(&Value::Bool(false));

    flagged.then(|| raw.to_string())
}

/// Extrai o id da mensagem atribuído pelo provedor
pub fn extract_message_id(provider: ProviderKind, raw: &Value) -> Option<String> {
    let candidates: &[&[&str]] = match provider {
        ProviderKind::Evolution => &[&["key", "id"], &["id"], &["messageId"]],
        ProviderKind::ZApi => &[&["messageId"], &["zaapId"], &["id"]],
    };

    candidates.iter().find_map(|path| {
        path.iter()
            .try_fold(raw, |node, key| node.get(*key))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

pub(crate) fn trim_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}
