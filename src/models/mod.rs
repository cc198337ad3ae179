pub mod connection;
pub mod dispatch;
pub mod inbound_event;
pub mod message;
pub mod provider_config;
pub mod webhook_payload;

pub use connection::{Connection, ConnectionMetadata, ConnectionStatus};
pub use dispatch::{OutboundSendRequest, SendContext, SendResult};
pub use inbound_event::InboundEvent;
pub use message::{MessageKey, MessageRecord, MessageStatus, StatusUpdate};
pub use provider_config::ProviderConfig;
pub use webhook_payload::{EventKind, MediaDescriptor, ProviderWebhook};
