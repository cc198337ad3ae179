//! Evolution API
//!
//! Endpoints usados:
//! - `POST /message/sendText/{instance}`
//! - `POST /message/sendMedia/{instance}`
//! - `POST /message/sendWhatsAppAudio/{instance}`
//! - `GET  /instance/connectionState/{instance}`
//!
//! Autenticação via header `apikey` (chave global ou da instância).

use crate::client::{read_json, read_reply, trim_base_url};
use crate::error::{ProviderError, Result};
use crate::types::{ConnectionState, MediaKind, MessageContent, OutboundMessage, ProviderKind, ProviderReply};
use reqwest::Client as HttpClient;
use serde_json::{json, Value};

/// Credenciais de uma instância Evolution
#[derive(Debug, Clone)]
pub struct EvolutionCredentials {
    pub base_url: String,
    pub api_key: String,
    pub instance: String,
}

impl EvolutionCredentials {
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(ProviderError::MissingCredentials("evolution base_url".to_string()));
        }
        if self.api_key.trim().is_empty() {
            return Err(ProviderError::MissingCredentials("evolution api_key".to_string()));
        }
        if self.instance.trim().is_empty() {
            return Err(ProviderError::MissingCredentials("evolution instance".to_string()));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct EvolutionClient {
    http_client: HttpClient,
    base_url: String,
    api_key: String,
    instance: String,
}

impl EvolutionClient {
    pub fn new(http_client: HttpClient, credentials: EvolutionCredentials) -> Result<Self> {
        credentials.validate()?;
        Ok(Self {
            http_client,
            base_url: trim_base_url(&credentials.base_url),
            api_key: credentials.api_key,
            instance: credentials.instance,
        })
    }

    /// Monta caminho e corpo da requisição de envio
    pub fn build_send_request(&self, message: &OutboundMessage) -> (String, Value) {
        let instance = urlencoding::encode(&self.instance);
        let number = message.destination();

        match &message.content {
            MessageContent::Text { text } => (
                format!("/message/sendText/{}", instance),
                json!({ "number": number, "text": text }),
            ),
            MessageContent::Media { url, kind: MediaKind::Audio, .. } => (
                format!("/message/sendWhatsAppAudio/{}", instance),
                json!({ "number": number, "audio": url }),
            ),
            MessageContent::Media { url, kind, caption, file_name } => {
                let mut body = json!({
                    "number": number,
                    "mediatype": kind.as_str(),
                    "media": url,
                });
                if let Some(caption) = caption {
                    body["caption"] = json!(caption);
                }
                if let Some(file_name) = file_name {
                    body["fileName"] = json!(file_name);
                }
                (format!("/message/sendMedia/{}", instance), body)
            }
        }
    }

    pub async fn send(&self, message: &OutboundMessage) -> Result<ProviderReply> {
        let (path, body) = self.build_send_request(message);
        let url = format!("{}{}", self.base_url, path);

        tracing::debug!("POST evolution {}", url);

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.api_key)
            .json(&body)
            .send()
            .await?;

        read_reply(ProviderKind::Evolution, response).await
    }

    pub async fn connection_state(&self) -> Result<ConnectionState> {
        let url = format!(
            "{}/instance/connectionState/{}",
            self.base_url,
            urlencoding::encode(&self.instance)
        );

        let response = self
            .http_client
            .get(&url)
            .header("apikey", &self.api_key)
            .send()
            .await?;

        let body = read_json(ProviderKind::Evolution, response).await?;
        let state = body
            .pointer("/instance/state")
            .or_else(|| body.get("state"))
            .and_then(Value::as_str)
            .unwrap_or("");

        Ok(map_evolution_state(state))
    }
}

/// `open` → conectado, `connecting` → conectando, qualquer outro → desconectado
pub fn map_evolution_state(state: &str) -> ConnectionState {
    match state.to_lowercase().as_str() {
        "open" | "connected" => ConnectionState::Connected,
        "connecting" => ConnectionState::Connecting,
        _ => ConnectionState::Disconnected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> EvolutionClient {
        EvolutionClient::new(
            HttpClient::new(),
            EvolutionCredentials {
                base_url: "https://evo.example.com/".to_string(),
                api_key: "global-key".to_string(),
                instance: "loja 1".to_string(),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_build_text_request() {
        let (path, body) = client().build_send_request(&OutboundMessage::text("+55 11 90000-0001", "olá"));
        assert_eq!(path, "/message/sendText/loja%201");
        assert_eq!(body["number"], "5511900000001");
        assert_eq!(body["text"], "olá");
    }

    #[test]
    fn test_build_media_requests() {
        let document = OutboundMessage {
            to: "5511900000001".to_string(),
            content: MessageContent::Media {
                url: "https://cdn.example.com/boleto.pdf".to_string(),
                kind: MediaKind::Document,
                caption: Some("Seu boleto".to_string()),
                file_name: Some("boleto.pdf".to_string()),
            },
        };
        let (path, body) = client().build_send_request(&document);
        assert_eq!(path, "/message/sendMedia/loja%201");
        assert_eq!(body["mediatype"], "document");
        assert_eq!(body["fileName"], "boleto.pdf");
        assert_eq!(body["caption"], "Seu boleto");

        let audio = OutboundMessage {
            to: "5511900000001".to_string(),
            content: MessageContent::Media {
                url: "https://cdn.example.com/a.ogg".to_string(),
                kind: MediaKind::Audio,
                caption: None,
                file_name: None,
            },
        };
        let (path, body) = client().build_send_request(&audio);
        assert_eq!(path, "/message/sendWhatsAppAudio/loja%201");
        assert_eq!(body["audio"], "https://cdn.example.com/a.ogg");
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let result = EvolutionClient::new(
            HttpClient::new(),
            EvolutionCredentials {
                base_url: "https://evo.example.com".to_string(),
                api_key: String::new(),
                instance: "loja".to_string(),
            },
        );
        assert!(matches!(result, Err(ProviderError::MissingCredentials(_))));
    }

    fn mocked_client(server: &httpmock::MockServer) -> EvolutionClient {
        EvolutionClient::new(
            HttpClient::new(),
            EvolutionCredentials {
                base_url: server.base_url(),
                api_key: "inst-key".to_string(),
                instance: "loja1".to_string(),
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_send_reads_message_id() {
        use httpmock::prelude::*;

        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/message/sendText/loja1")
                    .header("apikey", "inst-key")
                    .json_body(json!({"number": "5511900000001", "text": "olá"}));
                then.status(201).json_body(json!({"key": {"id": "BAE5F1"}, "status": "PENDING"}));
            })
            .await;

        let reply = mocked_client(&server)
            .send(&OutboundMessage::text("5511900000001", "olá"))
            .await
            .unwrap();

        assert_eq!(reply.provider, ProviderKind::Evolution);
        assert_eq!(reply.message_id.as_deref(), Some("BAE5F1"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_failures_carry_provider_text() {
        use httpmock::prelude::*;

        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/message/sendText/loja1");
                then.status(404).body(r#"{"status":404,"error":"Not Found","response":{"message":["instance does not exist"]}}"#);
            })
            .await;

        let error = mocked_client(&server)
            .send(&OutboundMessage::text("5511900000001", "olá"))
            .await
            .unwrap_err();

        match error {
            ProviderError::ApiError { provider, status, message } => {
                assert_eq!(provider, ProviderKind::Evolution);
                assert_eq!(status, 404);
                assert!(message.contains("instance does not exist"));
            }
            other => panic!("esperava ApiError, veio {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_state_query() {
        use httpmock::prelude::*;

        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/instance/connectionState/loja1").header("apikey", "inst-key");
                then.status(200).json_body(json!({"instance": {"instanceName": "loja1", "state": "connecting"}}));
            })
            .await;

        let state = mocked_client(&server).connection_state().await.unwrap();
        assert_eq!(state, ConnectionState::Connecting);
    }

    #[test]
    fn test_map_evolution_state() {
        assert_eq!(map_evolution_state("open"), ConnectionState::Connected);
        assert_eq!(map_evolution_state("connecting"), ConnectionState::Connecting);
        assert_eq!(map_evolution_state("close"), ConnectionState::Disconnected);
    }
}
