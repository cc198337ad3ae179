use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use whatsapp_providers::ConnectionState;

/// Canal WhatsApp registrado por um tenant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Connection {
    pub id: String,
    pub workspace_id: String,
    pub name: String,
    pub status: ConnectionStatus,
    #[serde(default)]
    pub provider_config_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: ConnectionMetadata,
    #[serde(default)]
    pub last_activity_at: Option<DateTime<Utc>>,
}

/// Metadados opacos do provedor (id/token da instância, webhook próprio)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ConnectionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
    Deleted,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<ConnectionState> for ConnectionStatus {
    fn from(state: ConnectionState) -> Self {
        match state {
            ConnectionState::Connected => ConnectionStatus::Connected,
            ConnectionState::Connecting => ConnectionStatus::Connecting,
            ConnectionState::Disconnected => ConnectionStatus::Disconnected,
        }
    }
}

impl Connection {
    /// Provedores usam ora o nome da instância, ora o id atribuído por eles
    pub fn matches_instance(&self, instance_ref: &str) -> bool {
        self.status != ConnectionStatus::Deleted
            && (self.name == instance_ref || self.metadata.instance_id.as_deref() == Some(instance_ref))
    }
}

/// Colunas jsonb podem vir `null` do PostgREST
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_connection_from_postgrest_row() {
        let row = json!({
            "id": "c1",
            "workspace_id": "T",
            "name": "shop1",
            "status": "connected",
            "provider_config_id": null,
            "metadata": null,
            "last_activity_at": null
        });

        let connection: Connection = serde_json::from_value(row).unwrap();
        assert_eq!(connection.status, ConnectionStatus::Connected);
        assert_eq!(connection.metadata, ConnectionMetadata::default());
    }

    #[test]
    fn test_matches_instance_by_name_or_provider_id() {
        let mut connection = Connection {
            id: "c1".to_string(),
            workspace_id: "T".to_string(),
            name: "shop1".to_string(),
            status: ConnectionStatus::Connected,
            provider_config_id: None,
            metadata: ConnectionMetadata {
                instance_id: Some("3C01ABC".to_string()),
                ..Default::default()
            },
            last_activity_at: None,
        };

        assert!(connection.matches_instance("shop1"));
        assert!(connection.matches_instance("3C01ABC"));
        assert!(!connection.matches_instance("shop2"));

        connection.status = ConnectionStatus::Deleted;
        assert!(!connection.matches_instance("shop1"));
    }
}
