use reqwest::Client as HttpClient;
use whatsapp_providers::{
    EvolutionClient, EvolutionCredentials, ProviderClient, ProviderKind, ZApiClient, ZApiCredentials,
};

use crate::config::{non_blank, ResolverChain};
use crate::models::{Connection, ProviderConfig};

/// Primeiro valor não vazio entre metadados da conexão e configuração do provedor
fn first_of(candidates: &[(&'static str, Option<&str>)]) -> Option<String> {
    candidates
        .iter()
        .fold(ResolverChain::new(), |chain, (source, value)| chain.then_value(*source, non_blank(*value)))
        .resolve()
        .map(|resolved| resolved.value)
}

/// Cliente do provedor para uma configuração, com credenciais da instância
///
/// Metadados da conexão têm precedência sobre a configuração; credenciais ausentes
/// viram `MissingCredentials` antes de qualquer chamada de rede.
pub fn build_provider_client(
    http_client: &HttpClient,
    config: &ProviderConfig,
    connection: Option<&Connection>,
    instance_hint: Option<&str>,
) -> whatsapp_providers::Result<ProviderClient> {
    let metadata = connection.map(|c| &c.metadata);

    match config.provider {
        ProviderKind::Evolution => {
            let credentials = EvolutionCredentials {
                base_url: config.base_url.clone().unwrap_or_default(),
                api_key: first_of(&[
                    ("connection", metadata.and_then(|m| m.instance_token.as_deref())),
                    ("config", config.api_key.as_deref()),
                ])
                .unwrap_or_default(),
                instance: first_of(&[
                    ("request", instance_hint),
                    ("connection", connection.map(|c| c.name.as_str())),
                    ("config", config.instance_id.as_deref()),
                ])
                .unwrap_or_default(),
            };
            EvolutionClient::new(http_client.clone(), credentials).map(ProviderClient::Evolution)
        }
        ProviderKind::ZApi => {
            let credentials = ZApiCredentials {
                base_url: config.base_url.clone(),
                instance_id: first_of(&[
                    ("connection", metadata.and_then(|m| m.instance_id.as_deref())),
                    ("config", config.instance_id.as_deref()),
                ])
                .unwrap_or_default(),
                instance_token: first_of(&[
                    ("connection", metadata.and_then(|m| m.instance_token.as_deref())),
                    ("config", config.instance_token.as_deref()),
                ])
                .unwrap_or_default(),
                client_token: first_of(&[
                    ("connection", metadata.and_then(|m| m.client_token.as_deref())),
                    ("config", config.client_token.as_deref()),
                ]),
            };
            ZApiClient::new(http_client.clone(), credentials).map(ProviderClient::ZApi)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConnectionMetadata, ConnectionStatus};
    use whatsapp_providers::ProviderError;

    fn config(provider: ProviderKind) -> ProviderConfig {
        ProviderConfig {
            id: "p1".to_string(),
            workspace_id: "T".to_string(),
            provider,
            name: None,
            base_url: Some("https://evo.example.com".to_string()),
            api_key: Some("global-key".to_string()),
            instance_id: None,
            instance_token: None,
            client_token: None,
            is_active: true,
            fallback_enabled: false,
            fallback_config_id: None,
        }
    }

    #[test]
    fn test_evolution_instance_falls_back_to_connection_name() {
        let connection = Connection {
            id: "c1".to_string(),
            workspace_id: "T".to_string(),
            name: "shop1".to_string(),
            status: ConnectionStatus::Connected,
            provider_config_id: None,
            metadata: ConnectionMetadata::default(),
            last_activity_at: None,
        };

        let http = HttpClient::new();
        let client = build_provider_client(&http, &config(ProviderKind::Evolution), Some(&connection), None).unwrap();
        assert_eq!(client.kind(), ProviderKind::Evolution);

        // Sem instância em lugar nenhum não há cliente
        assert!(matches!(
            build_provider_client(&http, &config(ProviderKind::Evolution), None, Some("  ")),
            Err(ProviderError::MissingCredentials(_))
        ));
    }

    #[test]
    fn test_zapi_requires_instance_credentials() {
        let http = HttpClient::new();
        let mut zapi = config(ProviderKind::ZApi);
        assert!(build_provider_client(&http, &zapi, None, None).is_err());

        zapi.instance_id = Some("3C01".to_string());
        zapi.instance_token = Some("tok".to_string());
        assert!(build_provider_client(&http, &zapi, None, None).is_ok());
    }
}
