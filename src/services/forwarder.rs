use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::utils::logging::*;
use crate::utils::{AppError, AppResult};

/// Resultado de um encaminhamento; só aparece em logs
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardReport {
    pub url: String,
    pub status: Option<u16>,
    pub error: Option<String>,
}

impl ForwardReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.status.is_some_and(|s| (200..300).contains(&s))
    }
}

/// POST do evento canônico para a automação do tenant (n8n)
#[derive(Clone)]
pub struct Forwarder {
    http_client: Client,
}

impl Forwarder {
    pub fn new(timeout: Duration) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::ConfigError(format!("forward http client: {}", e)))?;
        Ok(Self { http_client })
    }

    pub async fn forward(&self, url: &str, payload: &Value) -> ForwardReport {
        let report = match self.http_client.post(url).json(payload).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let error = (!response.status().is_success())
                    .then(|| format!("downstream returned {}", status));
                ForwardReport { url: url.to_string(), status: Some(status), error }
            }
            Err(e) => ForwardReport {
                url: url.to_string(),
                status: None,
                error: Some(e.to_string()),
            },
        };

        log_forward_result(&report.url, report.status, report.error.as_deref());
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_forward_posts_payload() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/webhook/whatsapp").json_body(json!({"event_type": "message"}));
                then.status(200);
            })
            .await;

        let forwarder = Forwarder::new(Duration::from_secs(2)).unwrap();
        let report = forwarder
            .forward(&server.url("/webhook/whatsapp"), &json!({"event_type": "message"}))
            .await;

        assert!(report.is_success());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_downstream_failure_is_reported_not_raised() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(500);
            })
            .await;

        let forwarder = Forwarder::new(Duration::from_secs(2)).unwrap();
        let report = forwarder.forward(&server.url("/hook"), &json!({})).await;

        assert!(!report.is_success());
        assert_eq!(report.status, Some(500));
    }
}
