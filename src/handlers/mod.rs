// Handlers HTTP
pub mod admin;
pub mod dispatch;
pub mod health;
pub mod webhook;

pub use admin::*;
pub use dispatch::*;
pub use health::*;
pub use webhook::*;
