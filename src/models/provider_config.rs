use serde::{Deserialize, Serialize};
use whatsapp_providers::ProviderKind;

/// Configuração de provedor de um tenant; no máximo uma ativa por workspace
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    pub id: String,
    pub workspace_id: String,
    pub provider: ProviderKind,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,  // Evolution: chave global
    #[serde(default)]
    pub instance_id: Option<String>,  // Z-API
    #[serde(default, skip_serializing)]
    pub instance_token: Option<String>,  // Z-API
    #[serde(default, skip_serializing)]
    pub client_token: Option<String>,  // Z-API: token de segurança da conta
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub fallback_enabled: bool,
    #[serde(default)]
    pub fallback_config_id: Option<String>,
}

impl ProviderConfig {
    /// Nome exibido em logs e no `failoverFrom`
    pub fn label(&self) -> &str {
        self.provider.as_str()
    }
}
