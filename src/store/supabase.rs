//! Store sobre o PostgREST do Supabase
//!
//! Usa a service_role key (ignora RLS). A ativação de configuração de provedor roda
//! na função `activate_provider_config` (ver `migrations/001_activate_provider_config.sql`),
//! que desativa e ativa dentro da mesma transação.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;

use super::{Store, StoreError, StoreResult};
use crate::models::{Connection, ConnectionStatus, MessageKey, MessageStatus, ProviderConfig, StatusUpdate};

const CONNECTIONS: &str = "whatsapp_connections";
const PROVIDER_CONFIGS: &str = "whatsapp_provider_configs";
const MESSAGES: &str = "messages";
const WORKSPACE_SETTINGS: &str = "workspace_settings";

pub struct SupabaseStore {
    http_client: Client,
    rest_url: String,
    service_key: String,
}

impl SupabaseStore {
    pub fn new(base_url: &str, service_key: &str, timeout: Duration) -> StoreResult<Self> {
        if base_url.trim().is_empty() || service_key.trim().is_empty() {
            return Err(StoreError::Config("store.url and store.service_key are required".to_string()));
        }

        let http_client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            rest_url: format!("{}/rest/v1", base_url.trim_end_matches('/')),
            service_key: service_key.to_string(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http_client
            .request(method, format!("{}/{}", self.rest_url, path))
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
    }

    async fn check(response: Response) -> StoreResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(StoreError::Api { status: status.as_u16(), message })
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, query: &[(&str, String)]) -> StoreResult<Vec<T>> {
        let response = self.request(Method::GET, table).query(query).send().await?;
        let body = Self::check(response).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// PATCH devolvendo as linhas afetadas
    async fn patch(&self, table: &str, query: &[(&str, String)], body: Value) -> StoreResult<Vec<Value>> {
        let response = self
            .request(Method::PATCH, table)
            .header("Prefer", "return=representation")
            .query(query)
            .json(&body)
            .send()
            .await?;
        let body = Self::check(response).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

/// Código SQLSTATE do corpo de erro do PostgREST (`{"code": "...", "message": ...}`)
fn postgrest_code(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("code")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Valor entre aspas para filtros `or=(...)` do PostgREST
fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

#[async_trait]
impl Store for SupabaseStore {
    async fn find_connection(&self, instance_ref: &str) -> StoreResult<Option<Connection>> {
        let value = quoted(instance_ref);
        let rows: Vec<Connection> = self
            .select(
                CONNECTIONS,
                &[
                    ("select", "*".to_string()),
                    ("or", format!("(name.eq.{v},metadata->>instance_id.eq.{v})", v = value)),
                    ("status", "neq.deleted".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn list_connections(&self, workspace_id: Option<&str>) -> StoreResult<Vec<Connection>> {
        let mut query = vec![("select", "*".to_string()), ("status", "neq.deleted".to_string())];
        if let Some(ws) = workspace_id {
            query.push(("workspace_id", eq(ws)));
        }
        self.select(CONNECTIONS, &query).await
    }

    async fn update_connection_status(&self, connection_id: &str, status: ConnectionStatus) -> StoreResult<()> {
        let rows = self
            .patch(
                CONNECTIONS,
                &[("id", eq(connection_id))],
                json!({"status": status.as_str(), "updated_at": Utc::now()}),
            )
            .await?;
        if rows.is_empty() {
            return Err(StoreError::NotFound(format!("connection {}", connection_id)));
        }
        Ok(())
    }

    async fn touch_connection(&self, connection_id: &str, at: DateTime<Utc>) -> StoreResult<()> {
        self.patch(CONNECTIONS, &[("id", eq(connection_id))], json!({"last_activity_at": at}))
            .await?;
        Ok(())
    }

    async fn active_provider_config(&self, workspace_id: &str) -> StoreResult<Option<ProviderConfig>> {
        let rows: Vec<ProviderConfig> = self
            .select(
                PROVIDER_CONFIGS,
                &[
                    ("select", "*".to_string()),
                    ("workspace_id", eq(workspace_id)),
                    ("is_active", "eq.true".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn provider_config(&self, id: &str) -> StoreResult<Option<ProviderConfig>> {
        let rows: Vec<ProviderConfig> = self
            .select(PROVIDER_CONFIGS, &[("select", "*".to_string()), ("id", eq(id))])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn list_provider_configs(&self, workspace_id: &str) -> StoreResult<Vec<ProviderConfig>> {
        self.select(
            PROVIDER_CONFIGS,
            &[
                ("select", "*".to_string()),
                ("workspace_id", eq(workspace_id)),
                ("order", "created_at.asc".to_string()),
            ],
        )
        .await
    }

    async fn activate_provider_config(&self, id: &str) -> StoreResult<ProviderConfig> {
        let response = self
            .request(Method::POST, "rpc/activate_provider_config")
            .json(&json!({"p_config_id": id}))
            .send()
            .await?;
        let response = match Self::check(response).await {
            Ok(response) => response,
            // P0002: id inexistente (RAISE na função); 22P02: id que nem é uuid
            Err(StoreError::Api { message, .. })
                if matches!(postgrest_code(&message).as_deref(), Some("P0002" | "22P02")) =>
            {
                return Err(StoreError::NotFound(format!("provider config {}", id)));
            }
            Err(e) => return Err(e),
        };
        let body: Value = serde_json::from_str(&response.text().await?)?;

        // Função `returns setof` devolve lista; `returns <tabela>` devolve objeto
        let row = match body {
            Value::Array(rows) => rows.into_iter().next(),
            Value::Null => None,
            row => Some(row),
        }
        .ok_or_else(|| StoreError::NotFound(format!("provider config {}", id)))?;

        Ok(serde_json::from_value(row)?)
    }

    async fn update_message_status(
        &self,
        workspace_id: &str,
        external_id: &str,
        update: &StatusUpdate,
    ) -> StoreResult<bool> {
        let mut body = json!({"status": update.status.as_str(), "updated_at": update.at});
        if let Some(at) = update.delivered_at() {
            body["delivered_at"] = json!(at);
        }
        if let Some(at) = update.read_at() {
            body["read_at"] = json!(at);
        }

        let rows = self
            .patch(
                MESSAGES,
                &[("workspace_id", eq(workspace_id)), ("external_id", eq(external_id))],
                body,
            )
            .await?;
        Ok(!rows.is_empty())
    }

    async fn record_provider_message_id(
        &self,
        workspace_id: &str,
        key: &MessageKey,
        provider_msg_id: &str,
    ) -> StoreResult<bool> {
        let filter = match key {
            MessageKey::IdempotencyKey(k) => ("idempotency_key", eq(k)),
            MessageKey::LocalId(id) => ("id", eq(id)),
        };

        let rows = self
            .patch(
                MESSAGES,
                &[("workspace_id", eq(workspace_id)), filter],
                json!({
                    "external_id": provider_msg_id,
                    "status": MessageStatus::Sent.as_str(),
                    "updated_at": Utc::now()
                }),
            )
            .await?;
        Ok(!rows.is_empty())
    }

    async fn tenant_webhook_url(&self, workspace_id: &str) -> StoreResult<Option<String>> {
        let rows: Vec<Value> = self
            .select(
                WORKSPACE_SETTINGS,
                &[
                    ("select", "n8n_webhook_url".to_string()),
                    ("workspace_id", eq(workspace_id)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;

        Ok(rows
            .first()
            .and_then(|row| row.get("n8n_webhook_url"))
            .and_then(Value::as_str)
            .filter(|url| !url.trim().is_empty())
            .map(str::to_string))
    }

    async fn ping(&self) -> StoreResult<()> {
        let _: Vec<Value> = self
            .select(CONNECTIONS, &[("select", "id".to_string()), ("limit", "1".to_string())])
            .await?;
        Ok(())
    }
}
