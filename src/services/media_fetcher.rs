use reqwest::Client;
use std::time::Duration;

use crate::config::settings::WebhookSettings;
use crate::models::MediaDescriptor;
use crate::utils::logging::*;
use crate::utils::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedMedia {
    pub data: Vec<u8>,
    pub content_type: Option<String>,
}

/// Download de anexos recebidos, com retry e backoff linear (`backoff × tentativa`)
#[derive(Clone)]
pub struct MediaFetcher {
    http_client: Client,
    max_attempts: u32,
    backoff: Duration,
}

impl MediaFetcher {
    pub fn new(timeout: Duration, max_attempts: u32, backoff: Duration) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::ConfigError(format!("media http client: {}", e)))?;

        Ok(Self {
            http_client,
            max_attempts: max_attempts.max(1),
            backoff,
        })
    }

    pub fn from_settings(settings: &WebhookSettings) -> AppResult<Self> {
        Self::new(
            Duration::from_secs(settings.media_timeout_seconds),
            settings.media_max_attempts,
            Duration::from_millis(settings.media_backoff_ms),
        )
    }

    /// `None` depois de esgotar as tentativas; quem chama segue sem o binário
    pub async fn fetch(&self, url: &str) -> Option<FetchedMedia> {
        for attempt in 1..=self.max_attempts {
            match self.fetch_once(url).await {
                Ok(media) => {
                    tracing::debug!("📎 Mídia baixada ({} bytes) de {}", media.data.len(), url);
                    return Some(media);
                }
                Err(e) => {
                    log_media_attempt_failed(url, attempt, self.max_attempts, &e);
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.backoff * attempt).await;
                    }
                }
            }
        }

        log_warning(&format!(
            "⚠️ Mídia indisponível após {} tentativas, encaminhando evento sem binário: {}",
            self.max_attempts, url
        ));
        None
    }

    async fn fetch_once(&self, url: &str) -> Result<FetchedMedia, String> {
        let response = self.http_client.get(url).send().await.map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("status {}", status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let data = response.bytes().await.map_err(|e| e.to_string())?.to_vec();

        Ok(FetchedMedia { data, content_type })
    }

    /// Preenche o binário do descritor quando só há URL
    pub async fn fill(&self, media: &mut MediaDescriptor) {
        if media.data.is_some() {
            return;
        }
        let Some(url) = media.url.clone() else {
            return;
        };

        if let Some(fetched) = self.fetch(&url).await {
            if media.mime_type.is_none() {
                media.mime_type = fetched.content_type;
            }
            media.data = Some(fetched.data);
        }
    }
}
