pub mod resolver;
pub mod settings;

pub use resolver::{non_blank, Resolved, ResolverChain};
pub use settings::{Settings, StoreBackend};
