//! Z-API
//!
//! Todas as rotas seguem `{base}/instances/{instance_id}/token/{token}/{acao}`;
//! o header `Client-Token` é enviado quando a conta tem token de segurança.

use crate::client::{read_json, read_reply, trim_base_url};
use crate::error::{ProviderError, Result};
use crate::types::{ConnectionState, MediaKind, MessageContent, OutboundMessage, ProviderKind, ProviderReply};
use reqwest::{Client as HttpClient, RequestBuilder};
use serde_json::{json, Value};

pub const DEFAULT_ZAPI_BASE_URL: &str = "https://api.z-api.io";

#[derive(Debug, Clone)]
pub struct ZApiCredentials {
    pub base_url: Option<String>,
    pub instance_id: String,
    pub instance_token: String,
    pub client_token: Option<String>,
}

impl ZApiCredentials {
    pub fn validate(&self) -> Result<()> {
        if self.instance_id.trim().is_empty() {
            return Err(ProviderError::MissingCredentials("z-api instance_id".to_string()));
        }
        if self.instance_token.trim().is_empty() {
            return Err(ProviderError::MissingCredentials("z-api instance_token".to_string()));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct ZApiClient {
    http_client: HttpClient,
    instance_url: String,
    client_token: Option<String>,
}

impl ZApiClient {
    pub fn new(http_client: HttpClient, credentials: ZApiCredentials) -> Result<Self> {
        credentials.validate()?;

        let base_url = credentials
            .base_url
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .map(trim_base_url)
            .unwrap_or_else(|| DEFAULT_ZAPI_BASE_URL.to_string());

        Ok(Self {
            http_client,
            instance_url: format!(
                "{}/instances/{}/token/{}",
                base_url,
                urlencoding::encode(&credentials.instance_id),
                urlencoding::encode(&credentials.instance_token)
            ),
            client_token: credentials.client_token.filter(|t| !t.is_empty()),
        })
    }

    /// Monta ação e corpo da requisição de envio
    pub fn build_send_request(&self, message: &OutboundMessage) -> (String, Value) {
        let phone = message.destination();

        match &message.content {
            MessageContent::Text { text } => (
                "send-text".to_string(),
                json!({ "phone": phone, "message": text }),
            ),
            MessageContent::Media { url, kind, caption, file_name } => match kind {
                MediaKind::Image => (
                    "send-image".to_string(),
                    json!({ "phone": phone, "image": url, "caption": caption.clone().unwrap_or_default() }),
                ),
                MediaKind::Video => (
                    "send-video".to_string(),
                    json!({ "phone": phone, "video": url, "caption": caption.clone().unwrap_or_default() }),
                ),
                MediaKind::Audio => (
                    "send-audio".to_string(),
                    json!({ "phone": phone, "audio": url }),
                ),
                MediaKind::Document => {
                    let extension = document_extension(file_name.as_deref(), url);
                    let mut body = json!({ "phone": phone, "document": url });
                    if let Some(file_name) = file_name {
                        body["fileName"] = json!(file_name);
                    }
                    if let Some(caption) = caption {
                        body["caption"] = json!(caption);
                    }
                    (format!("send-document/{}", extension), body)
                }
            },
        }
    }

    fn with_client_token(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.client_token {
            Some(token) => request.header("Client-Token", token),
            None => request,
        }
    }

    pub async fn send(&self, message: &OutboundMessage) -> Result<ProviderReply> {
        let (action, body) = self.build_send_request(message);
        let url = format!("{}/{}", self.instance_url, action);

        tracing::debug!("POST z-api {}", action);

        let response = self
            .with_client_token(self.http_client.post(&url).json(&body))
            .send()
            .await?;

        read_reply(ProviderKind::ZApi, response).await
    }

    pub async fn connection_state(&self) -> Result<ConnectionState> {
        let url = format!("{}/status", self.instance_url);
        let response = self.with_client_token(self.http_client.get(&url)).send().await?;
        let body = read_json(ProviderKind::ZApi, response).await?;

        Ok(match body.get("connected").and_then(Value::as_bool) {
            Some(true) => ConnectionState::Connected,
            _ => ConnectionState::Disconnected,
        })
    }
}

/// Extensão exigida pela rota `send-document/{ext}`: nome do arquivo, depois URL, senão `pdf`
fn document_extension(file_name: Option<&str>, url: &str) -> String {
    let from_path = |value: &str| {
        let last = value.split(&['?', '#'][..]).next().unwrap_or(value);
        let last = last.rsplit('/').next().unwrap_or(last);
        last.rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
    };

    file_name
        .and_then(from_path)
        .or_else(|| from_path(url))
        .unwrap_or_else(|| "pdf".to_string())
}
