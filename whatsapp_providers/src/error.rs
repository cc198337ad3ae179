//! Tipos de erro para os clientes de provedores WhatsApp

use crate::types::ProviderKind;
use thiserror::Error;

/// Erros dos clientes Evolution / Z-API
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Erro de requisição HTTP (conexão, timeout, DNS)
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Resposta não-2xx do provedor
    #[error("{provider} API error (status {status}): {message}")]
    ApiError {
        provider: ProviderKind,
        status: u16,
        message: String,
    },

    /// Resposta 2xx com flag de erro embutida no corpo
    #[error("{provider} rejected the request: {message}")]
    Rejected {
        provider: ProviderKind,
        message: String,
    },

    /// Credenciais obrigatórias ausentes
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),
}

impl ProviderError {
    /// Texto do provedor, sem o prefixo de contexto, quando disponível
    pub fn provider_message(&self) -> String {
        match self {
            ProviderError::ApiError { message, .. } | ProviderError::Rejected { message, .. } => {
                message.clone()
            }
            other => other.to_string(),
        }
    }
}

/// Tipo Result padrão para o crate
pub type Result<T> = std::result::Result<T, ProviderError>;
