//! Clientes das APIs de WhatsApp usadas pela plataforma
//!
//! - **Evolution API**: instâncias identificadas por nome, autenticação por `apikey`
//! - **Z-API**: instâncias identificadas por id + token, header opcional `Client-Token`
//!
//! Os dois clientes expõem a mesma superfície (`send`, `connection_state`) e são
//! unificados em [`ProviderClient`], escolhido a partir da configuração ativa do tenant.
//!
//! # Exemplo Básico
//!
//! ```rust,ignore
//! use whatsapp_providers::{build_http_client, EvolutionClient, EvolutionCredentials, OutboundMessage, ProviderClient};
//! use std::time::Duration;
//!
//! let http = build_http_client(Duration::from_secs(20))?;
//! let client = ProviderClient::Evolution(EvolutionClient::new(http, EvolutionCredentials {
//!     base_url: std::env::var("EVOLUTION_URL")?,
//!     api_key: std::env::var("EVOLUTION_API_KEY")?,
//!     instance: "loja1".to_string(),
//! })?);
//!
//! let reply = client.send(&OutboundMessage::text("5511999990000", "Olá!")).await?;
//! println!("id do provedor: {:?}", reply.message_id);
//! ```

pub mod client;
pub mod error;
pub mod evolution;
pub mod types;
pub mod zapi;

pub use client::{build_http_client, embedded_error, extract_message_id, ProviderClient};
pub use error::{ProviderError, Result};
pub use evolution::{EvolutionClient, EvolutionCredentials};
pub use types::{ConnectionState, MediaKind, MessageContent, OutboundMessage, ProviderKind, ProviderReply};
pub use zapi::{ZApiClient, ZApiCredentials, DEFAULT_ZAPI_BASE_URL};
