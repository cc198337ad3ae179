use serde::{Deserialize, Serialize};
use config::{Config, ConfigError, Environment, File};

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Settings {
    pub server: ServerSettings,
    pub store: StoreSettings,
    pub storage: StorageSettings,
    pub webhook: WebhookSettings,
    pub dispatch: DispatchSettings,
    pub sync: SyncSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Supabase,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    pub url: Option<String>,  // URL do projeto Supabase (https://<ref>.supabase.co)
    pub service_key: Option<String>,  // service_role key (nunca a anon key)
    pub seed_file: Option<String>,  // JSON inicial do store em memória
    pub timeout_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StorageSettings {
    pub public_base_url: Option<String>,  // Prefixo das URLs do nosso object storage
    pub sign_expires_seconds: u64,
    pub timeout_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WebhookSettings {
    pub default_forward_url: Option<String>,  // n8n padrão quando o tenant não configurou o seu
    pub signing_secret: Option<String>,
    pub forward_timeout_seconds: u64,
    pub media_timeout_seconds: u64,
    pub media_max_attempts: u32,
    pub media_backoff_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DispatchSettings {
    pub timeout_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SyncSettings {
    pub interval_seconds: u64,  // 0 = reconciliação periódica desabilitada
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 8080 }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            url: None,
            service_key: None,
            seed_file: None,
            timeout_seconds: 10,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            public_base_url: None,
            sign_expires_seconds: 3600,
            timeout_seconds: 10,
        }
    }
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            default_forward_url: None,
            signing_secret: None,
            forward_timeout_seconds: 10,
            media_timeout_seconds: 30,
            media_max_attempts: 3,
            media_backoff_ms: 1000,
        }
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self { timeout_seconds: 20 }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self { interval_seconds: 0 }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        let defaults = Settings::default();

        let mut builder = Config::builder()
            // Valores embutidos: ambiente vazio ainda sobe com store em memória
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", defaults.server.port as i64)?
            .set_default("store.backend", "memory")?
            .set_default("store.timeout_seconds", defaults.store.timeout_seconds as i64)?
            .set_default("storage.sign_expires_seconds", defaults.storage.sign_expires_seconds as i64)?
            .set_default("storage.timeout_seconds", defaults.storage.timeout_seconds as i64)?
            .set_default("webhook.forward_timeout_seconds", defaults.webhook.forward_timeout_seconds as i64)?
            .set_default("webhook.media_timeout_seconds", defaults.webhook.media_timeout_seconds as i64)?
            .set_default("webhook.media_max_attempts", defaults.webhook.media_max_attempts as i64)?
            .set_default("webhook.media_backoff_ms", defaults.webhook.media_backoff_ms as i64)?
            .set_default("dispatch.timeout_seconds", defaults.dispatch.timeout_seconds as i64)?
            .set_default("sync.interval_seconds", defaults.sync.interval_seconds as i64)?
            // Arquivo de configuração base
            .add_source(File::with_name("config/default").required(false))
            // Arquivo específico do ambiente
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false));

        // Variáveis de ambiente com nomes herdados das edge functions
        if let Ok(url) = std::env::var("SUPABASE_URL") {
            builder = builder.set_override("store.url", url)?;
        }
        if let Ok(key) = std::env::var("SUPABASE_SERVICE_ROLE_KEY") {
            builder = builder.set_override("store.service_key", key)?;
        }
        if let Ok(url) = std::env::var("N8N_WEBHOOK_URL") {
            builder = builder.set_override("webhook.default_forward_url", url)?;
        }
        if let Ok(url) = std::env::var("STORAGE_PUBLIC_URL") {
            builder = builder.set_override("storage.public_base_url", url)?;
        }
        if let Ok(secret) = std::env::var("WEBHOOK_SIGNING_SECRET") {
            builder = builder.set_override("webhook.signing_secret", secret)?;
        }

        builder = builder.add_source(Environment::with_prefix("WHATSAPP_GATEWAY").separator("__"));

        let s = builder.build()?;

        s.try_deserialize()
    }
}
