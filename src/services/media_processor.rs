//! Pré-processamento de mídia de saída
//!
//! URLs do nosso object storage não são alcançáveis pelos provedores; são trocadas por
//! uma URL assinada do Supabase Storage antes do envio. Qualquer falha mantém a URL
//! original.

use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::settings::{StorageSettings, StoreSettings};
use crate::utils::logging::*;
use crate::utils::{AppError, AppResult};

#[derive(Clone)]
pub struct MediaProcessor {
    http_client: Client,
    public_base_url: Option<String>,
    store_url: Option<String>,
    service_key: Option<String>,
    expires_in: u64,
}

impl MediaProcessor {
    pub fn new(storage: &StorageSettings, store: &StoreSettings) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(storage.timeout_seconds))
            .build()
            .map_err(|e| AppError::ConfigError(format!("storage http client: {}", e)))?;

        Ok(Self {
            http_client,
            public_base_url: storage
                .public_base_url
                .as_deref()
                .map(|u| u.trim_end_matches('/').to_string())
                .filter(|u| !u.is_empty()),
            store_url: store.url.as_deref().map(|u| u.trim_end_matches('/').to_string()),
            service_key: store.service_key.clone(),
            expires_in: storage.sign_expires_seconds,
        })
    }

    /// Caminho `{bucket}/{objeto}` quando a URL aponta para o nosso storage
    pub fn internal_object_path<'a>(&self, url: &'a str) -> Option<&'a str> {
        let base = self.public_base_url.as_deref()?;
        url.strip_prefix(base)
            .and_then(|rest| rest.strip_prefix('/'))
            .map(|path| path.split('?').next().unwrap_or(path))
            .filter(|path| path.contains('/'))
    }

    /// URL que o provedor consegue baixar
    pub async fn provider_reachable_url(&self, url: &str) -> String {
        let Some(object_path) = self.internal_object_path(url) else {
            return url.to_string();
        };

        match self.sign(object_path).await {
            Ok(signed) => {
                tracing::debug!("🔏 Mídia interna assinada: {}", object_path);
                signed
            }
            Err(e) => {
                log_warning(&format!(
                    "⚠️ Falha ao assinar mídia {} ({}), usando URL original",
                    object_path, e
                ));
                url.to_string()
            }
        }
    }

    async fn sign(&self, object_path: &str) -> AppResult<String> {
        let (store_url, service_key) = match (&self.store_url, &self.service_key) {
            (Some(url), Some(key)) => (url, key),
            _ => return Err(AppError::ConfigError("storage signing needs store.url and store.service_key".to_string())),
        };

        let response = self
            .http_client
            .post(format!("{}/storage/v1/object/sign/{}", store_url, object_path))
            .header("apikey", service_key)
            .header("Authorization", format!("Bearer {}", service_key))
            .json(&json!({"expiresIn": self.expires_in}))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::InternalError(format!("sign returned {}: {}", status.as_u16(), body)));
        }

        let body: Value = response.json().await?;
        let signed_path = body
            .get("signedURL")
            .or_else(|| body.get("signedUrl"))
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::InternalError("sign response without signedURL".to_string()))?;

        if signed_path.starts_with("http") {
            return Ok(signed_path.to_string());
        }
        Ok(format!("{}/storage/v1{}", store_url, signed_path))
    }
}
