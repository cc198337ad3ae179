use serde::{Deserialize, Serialize};
use whatsapp_providers::{MediaKind, MessageContent, OutboundMessage, ProviderKind};

use super::message::MessageKey;
use crate::utils::{AppError, AppResult};

/// Pedido de envio vindo da aplicação
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct OutboundSendRequest {
    pub workspace_id: String,
    pub to: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub context: SendContext,
    #[serde(default, alias = "externalId")]
    pub idempotency_key: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SendContext {
    #[serde(default)]
    pub instance: Option<String>,
}

impl OutboundSendRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.workspace_id.trim().is_empty() {
            return Err(AppError::ValidationError("workspaceId is required".to_string()));
        }
        if !self.to.chars().any(|c| c.is_ascii_digit()) {
            return Err(AppError::ValidationError("to must be a phone number or JID".to_string()));
        }
        let has_text = self.text.as_deref().is_some_and(|t| !t.trim().is_empty());
        let has_media = self.media_url.as_deref().is_some_and(|u| !u.trim().is_empty());
        if !has_text && !has_media {
            return Err(AppError::ValidationError("text or mediaUrl is required".to_string()));
        }
        Ok(())
    }

    /// Mídia tem precedência; o texto vira legenda quando não há `caption`
    pub fn to_outbound_message(&self, media_url: Option<&str>) -> OutboundMessage {
        let content = match media_url.or(self.media_url.as_deref()).filter(|u| !u.is_empty()) {
            Some(url) => MessageContent::Media {
                url: url.to_string(),
                kind: self
                    .media_type
                    .as_deref()
                    .map(MediaKind::from_loose)
                    .unwrap_or(MediaKind::Document),
                caption: self.caption.clone().or_else(|| self.text.clone()),
                file_name: self.file_name.clone(),
            },
            None => MessageContent::Text {
                text: self.text.clone().unwrap_or_default(),
            },
        };

        OutboundMessage { to: self.to.clone(), content }
    }

    pub fn message_key(&self) -> Option<MessageKey> {
        self.idempotency_key
            .clone()
            .map(MessageKey::IdempotencyKey)
            .or_else(|| self.message_id.clone().map(MessageKey::LocalId))
    }
}

/// Resultado de um envio
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SendResult {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_msg_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failover_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendResult {
    pub fn failure(error: impl Into<String>) -> Self {
        Self { ok: false, error: Some(error.into()), ..Default::default() }
    }

    pub fn success(provider: ProviderKind, provider_msg_id: Option<String>) -> Self {
        Self {
            ok: true,
            provider_msg_id,
            provider: Some(provider),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_format() {
        let request: OutboundSendRequest = serde_json::from_value(json!({
            "workspaceId": "T",
            "to": "+15550001111",
            "mediaUrl": "https://cdn.example.com/x.png",
            "mediaType": "image",
            "text": "olha isso",
            "context": {"instance": "shop1"},
            "externalId": "campanha-42-contato-7"
        }))
        .unwrap();

        assert_eq!(request.context.instance.as_deref(), Some("shop1"));
        assert_eq!(
            request.message_key(),
            Some(MessageKey::IdempotencyKey("campanha-42-contato-7".to_string()))
        );

        match request.to_outbound_message(None).content {
            MessageContent::Media { kind, caption, .. } => {
                assert_eq!(kind, MediaKind::Image);
                assert_eq!(caption.as_deref(), Some("olha isso"));
            }
            other => panic!("esperava mídia, veio {:?}", other),
        }
    }

    #[test]
    fn test_validation() {
        let mut request = OutboundSendRequest {
            workspace_id: "T".to_string(),
            to: "+15550001111".to_string(),
            ..Default::default()
        };
        assert!(request.validate().is_err());

        request.text = Some("hi".to_string());
        assert!(request.validate().is_ok());

        request.to = "abc".to_string();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_send_result_wire_format() {
        let mut result = SendResult::success(ProviderKind::ZApi, Some("M1".to_string()));
        result.failover_from = Some("evolution".to_string());

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value, json!({"ok": true, "providerMsgId": "M1", "provider": "zapi", "failoverFrom": "evolution"}));

        let value = serde_json::to_value(SendResult::failure("PROVIDER_NOT_CONFIGURED")).unwrap();
        assert_eq!(value, json!({"ok": false, "error": "PROVIDER_NOT_CONFIGURED"}));
    }
}
