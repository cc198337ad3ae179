use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Status canônico de uma mensagem enviada
///
/// Tokens desconhecidos do provedor são preservados em minúsculas em `Other`,
/// nunca descartados.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageStatus {
    Sending,
    Sent,
    Delivered,
    Read,
    Failed,
    Other(String),
}

impl MessageStatus {
    /// Tabela fixa de tokens Evolution / Z-API (comparação sem diferenciar maiúsculas)
    pub fn from_provider_token(token: &str) -> Self {
        match token.trim().to_uppercase().as_str() {
            "PENDING" | "SENDING" => MessageStatus::Sending,
            "SERVER_ACK" | "SENT" => MessageStatus::Sent,
            "DELIVERY_ACK" | "DELIVERED" | "RECEIVED" => MessageStatus::Delivered,
            "READ" | "READ_BY_ME" | "PLAYED" => MessageStatus::Read,
            "ERROR" | "FAILED" => MessageStatus::Failed,
            _ => MessageStatus::Other(token.to_lowercase()),
        }
    }

    /// Códigos numéricos de ack (Evolution v1 / Baileys)
    pub fn from_ack(ack: i64) -> Self {
        let token = match ack {
            0 => "ERROR",
            1 => "PENDING",
            2 => "SERVER_ACK",
            3 => "DELIVERY_ACK",
            4 => "READ",
            5 => "PLAYED",
            _ => return MessageStatus::Other(ack.to_string()),
        };
        Self::from_provider_token(token)
    }

    pub fn as_str(&self) -> &str {
        match self {
            MessageStatus::Sending => "sending",
            MessageStatus::Sent => "sent",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Read => "read",
            MessageStatus::Failed => "failed",
            MessageStatus::Other(token) => token,
        }
    }

    pub fn is_canonical(&self) -> bool {
        !matches!(self, MessageStatus::Other(_))
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for MessageStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MessageStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        Ok(MessageStatus::from_provider_token(&token))
    }
}

/// Registro local de mensagem, usado apenas para correlação de status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageRecord {
    pub id: String,
    pub workspace_id: String,
    #[serde(default)]
    pub idempotency_key: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,  // id atribuído pelo provedor
    pub status: MessageStatus,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Atualização de status vinda de um callback do provedor
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub status: MessageStatus,
    pub at: DateTime<Utc>,
}

impl StatusUpdate {
    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        (self.status == MessageStatus::Delivered).then_some(self.at)
    }

    pub fn read_at(&self) -> Option<DateTime<Utc>> {
        (self.status == MessageStatus::Read).then_some(self.at)
    }

    /// Aplica ao registro: status sempre, timestamp só para entregue/lida
    pub fn apply_to(&self, record: &mut MessageRecord) {
        record.status = self.status.clone();
        if let Some(at) = self.delivered_at() {
            record.delivered_at = Some(at);
        }
        if let Some(at) = self.read_at() {
            record.read_at = Some(at);
        }
        record.updated_at = Some(self.at);
    }
}

/// Como localizar o registro local ao gravar o id do provedor após um envio
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKey {
    IdempotencyKey(String),
    LocalId(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECOGNIZED: &[&str] = &[
        "PENDING", "SENDING", "SERVER_ACK", "SENT", "DELIVERY_ACK", "DELIVERED",
        "RECEIVED", "READ", "READ_BY_ME", "PLAYED", "ERROR", "FAILED",
    ];

    #[test]
    fn test_recognized_tokens_map_to_canonical_set() {
        let canonical = ["sending", "sent", "delivered", "read", "failed"];

        for token in RECOGNIZED {
            for variant in [token.to_string(), token.to_lowercase()] {
                let status = MessageStatus::from_provider_token(&variant);
                assert!(status.is_canonical(), "{} não mapeado", variant);
                assert!(canonical.contains(&status.as_str()));
            }
        }
    }

    #[test]
    fn test_specific_mappings() {
        assert_eq!(MessageStatus::from_provider_token("DELIVERY_ACK"), MessageStatus::Delivered);
        assert_eq!(MessageStatus::from_provider_token("RECEIVED"), MessageStatus::Delivered);
        assert_eq!(MessageStatus::from_provider_token("PLAYED"), MessageStatus::Read);
        assert_eq!(MessageStatus::from_provider_token("SERVER_ACK"), MessageStatus::Sent);
        assert_eq!(MessageStatus::from_provider_token("Error"), MessageStatus::Failed);
        assert_eq!(MessageStatus::from_ack(3), MessageStatus::Delivered);
    }

    #[test]
    fn test_unrecognized_tokens_pass_through_lowercased() {
        for token in ["DELETED", "Queued_By_Provider", "x"] {
            let status = MessageStatus::from_provider_token(token);
            assert_eq!(status, MessageStatus::Other(token.to_lowercase()));
            assert_eq!(status.as_str(), token.to_lowercase());
        }
    }

    #[test]
    fn test_status_update_sets_matching_timestamp_only() {
        let at = Utc::now();
        let mut record = MessageRecord {
            id: "m1".to_string(),
            workspace_id: "T".to_string(),
            idempotency_key: None,
            external_id: Some("abc123".to_string()),
            status: MessageStatus::Sent,
            delivered_at: None,
            read_at: None,
            updated_at: None,
        };

        StatusUpdate { status: MessageStatus::Delivered, at }.apply_to(&mut record);
        assert_eq!(record.status, MessageStatus::Delivered);
        assert_eq!(record.delivered_at, Some(at));
        assert_eq!(record.read_at, None);

        StatusUpdate { status: MessageStatus::Failed, at }.apply_to(&mut record);
        assert_eq!(record.status, MessageStatus::Failed);
        assert_eq!(record.read_at, None);
    }
}
