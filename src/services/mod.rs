pub mod connection_sync;
pub mod dispatch;
pub mod forwarder;
pub mod media_fetcher;
pub mod media_processor;
pub mod normalizer;
pub mod provider_clients;

pub use connection_sync::{ConnectionSync, SyncReport};
pub use dispatch::DispatchRouter;
pub use forwarder::{ForwardReport, Forwarder};
pub use media_fetcher::{FetchedMedia, MediaFetcher};
pub use media_processor::MediaProcessor;
pub use normalizer::{WebhookAck, WebhookNormalizer};
