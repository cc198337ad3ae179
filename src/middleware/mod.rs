/// Middleware layer para o Axum router
pub mod admin_auth;

pub use admin_auth::require_admin_key;
