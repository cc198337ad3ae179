//! Parsing dos webhooks dos provedores
//!
//! Único ponto do sistema que inspeciona o JSON cru: os aliases de campo de cada
//! provedor (Evolution API, Z-API) são resolvidos aqui e o resto do fluxo trabalha
//! apenas com [`ProviderWebhook`].

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use whatsapp_providers::{MediaKind, ProviderKind};

use super::connection::ConnectionStatus;
use super::message::MessageStatus;
use crate::utils::{AppError, AppResult};

/// Aliases aceitos para o identificador da instância
const INSTANCE_KEYS: &[&str] = &["/instanceName", "/instance", "/instanceId", "/instance_id"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Message,
    StatusUpdate,
    Media,
    ConnectionUpdate,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Message => "message",
            EventKind::StatusUpdate => "status_update",
            EventKind::Media => "media",
            EventKind::ConnectionUpdate => "connection_update",
        }
    }
}

/// Referência a um anexo recebido
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaDescriptor {
    pub url: Option<String>,
    pub kind: MediaKind,
    pub mime_type: Option<String>,
    pub file_name: Option<String>,
    #[serde(skip)]
    pub data: Option<Vec<u8>>,
}

/// Webhook já tipado, independente do formato do provedor
#[derive(Debug, Clone)]
pub struct ProviderWebhook {
    pub provider: ProviderKind,
    pub instance_ref: String,
    pub event_name: String,
    pub kind: EventKind,
    pub external_ids: Vec<String>,
    pub status: Option<MessageStatus>,
    /// Status por mensagem; lotes da Evolution trazem um status por item
    pub item_statuses: Vec<(String, MessageStatus)>,
    pub connection_status: Option<ConnectionStatus>,
    pub media: Option<MediaDescriptor>,
    pub timestamp: Option<DateTime<Utc>>,
    pub raw: Value,
}

impl ProviderWebhook {
    /// Converte o corpo cru; `hint` vem da rota e só decide quando o formato é ambíguo
    pub fn parse(raw: Value, hint: Option<ProviderKind>) -> AppResult<Self> {
        if !raw.is_object() {
            return Err(AppError::ValidationError("webhook body must be a JSON object".to_string()));
        }

        let instance_ref = instance_ref(&raw)
            .ok_or_else(|| AppError::ValidationError("missing instance identifier".to_string()))?;

        let provider = detect_provider(&raw, hint)
            .ok_or_else(|| AppError::ValidationError("could not detect webhook provider".to_string()))?;

        let webhook = match provider {
            ProviderKind::Evolution => parse_evolution(raw, instance_ref),
            ProviderKind::ZApi => parse_zapi(raw, instance_ref),
        };

        Ok(webhook)
    }

    /// Provedor reconhecível apenas pelo formato do corpo, sem dica de rota
    pub fn detect_by_shape(raw: &Value) -> Option<ProviderKind> {
        detect_provider(raw, None)
    }

    pub fn instance_of(raw: &Value) -> Option<String> {
        instance_ref(raw)
    }

    pub fn external_id(&self) -> Option<&str> {
        self.external_ids.first().map(String::as_str)
    }
}

fn str_at<'a>(raw: &'a Value, pointers: &[&str]) -> Option<&'a str> {
    pointers
        .iter()
        .find_map(|p| raw.pointer(p).and_then(Value::as_str))
        .filter(|s| !s.is_empty())
}

fn owned_at(raw: &Value, pointers: &[&str]) -> Option<String> {
    str_at(raw, pointers).map(str::to_string)
}

fn instance_ref(raw: &Value) -> Option<String> {
    // Evolution às vezes envia `instance` como objeto
    owned_at(raw, INSTANCE_KEYS)
        .or_else(|| owned_at(raw, &["/instance/instanceName", "/instance/instanceId"]))
}

fn event_name(raw: &Value) -> Option<&str> {
    str_at(raw, &["/event", "/type"])
}

fn detect_provider(raw: &Value, hint: Option<ProviderKind>) -> Option<ProviderKind> {
    if let Some(event) = event_name(raw) {
        if event.ends_with("Callback") {
            return Some(ProviderKind::ZApi);
        }
        if event.contains('.') || (event.contains('_') && event == event.to_uppercase()) {
            return Some(ProviderKind::Evolution);
        }
    }

    hint.or_else(|| {
        if raw.get("data").is_some_and(Value::is_object) {
            Some(ProviderKind::Evolution)
        } else if raw.get("ids").is_some() || raw.get("instanceId").is_some() {
            Some(ProviderKind::ZApi)
        } else {
            None
        }
    })
}

// ---------------------------------------------------------------------------
// Evolution API
// ---------------------------------------------------------------------------

fn parse_evolution(raw: Value, instance_ref: String) -> ProviderWebhook {
    let event_name = event_name(&raw).unwrap_or("unknown").to_string();
    let normalized = event_name.to_lowercase().replace('_', ".");

    // `data` pode ser objeto ou lista (lotes de messages.update)
    let items: Vec<Value> = match raw.get("data") {
        Some(Value::Array(items)) => items.clone(),
        Some(other) => vec![other.clone()],
        None => Vec::new(),
    };
    let first = items.first().cloned().unwrap_or(Value::Null);

    let timestamp = str_at(&raw, &["/date_time"])
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            first
                .get("messageTimestamp")
                .and_then(Value::as_i64)
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        });

    let mut webhook = ProviderWebhook {
        provider: ProviderKind::Evolution,
        instance_ref,
        event_name,
        kind: EventKind::Message,
        external_ids: Vec::new(),
        status: None,
        item_statuses: Vec::new(),
        connection_status: None,
        media: None,
        timestamp,
        raw: Value::Null,
    };

    match normalized.as_str() {
        "messages.update" => {
            webhook.kind = EventKind::StatusUpdate;
            webhook.external_ids = items
                .iter()
                .filter_map(|item| owned_at(item, &["/keyId", "/key/id", "/messageId", "/id"]))
                .collect();
            webhook.item_statuses = items
                .iter()
                .filter_map(|item| {
                    let id = owned_at(item, &["/keyId", "/key/id", "/messageId", "/id"])?;
                    Some((id, evolution_status(item)?))
                })
                .collect();
            webhook.status = evolution_status(&first);
        }
        "connection.update" => {
            webhook.kind = EventKind::ConnectionUpdate;
            webhook.connection_status = str_at(&first, &["/state"])
                .map(|state| whatsapp_providers::evolution::map_evolution_state(state).into());
        }
        _ => {
            webhook.external_ids = owned_at(&first, &["/key/id"]).into_iter().collect();
            webhook.media = evolution_media(&first);
            if webhook.media.is_some() {
                webhook.kind = EventKind::Media;
            }
        }
    }

    webhook.raw = raw;
    webhook
}

fn evolution_status(item: &Value) -> Option<MessageStatus> {
    match item.get("status") {
        Some(Value::String(token)) => Some(MessageStatus::from_provider_token(token)),
        Some(Value::Number(ack)) => ack.as_i64().map(MessageStatus::from_ack),
        _ => None,
    }
}

fn evolution_media(data: &Value) -> Option<MediaDescriptor> {
    let message = data.get("message")?;

    let (kind, node) = [
        ("imageMessage", MediaKind::Image),
        ("stickerMessage", MediaKind::Image),
        ("videoMessage", MediaKind::Video),
        ("audioMessage", MediaKind::Audio),
        ("documentMessage", MediaKind::Document),
    ]
    .iter()
    .find_map(|(key, kind)| message.get(*key).map(|node| (*kind, node)))
    .or_else(|| {
        message
            .pointer("/documentWithCaptionMessage/message/documentMessage")
            .map(|node| (MediaKind::Document, node))
    })?;

    // Com S3 habilitado a Evolution devolve `mediaUrl`; com webhook_base64, o binário inline
    let data_inline = str_at(message, &["/base64"])
        .and_then(|b64| base64::engine::general_purpose::STANDARD.decode(b64).ok());

    Some(MediaDescriptor {
        url: owned_at(message, &["/mediaUrl"]).or_else(|| owned_at(node, &["/url"])),
        kind,
        mime_type: owned_at(node, &["/mimetype"]),
        file_name: owned_at(node, &["/fileName"]),
        data: data_inline,
    })
}

// ---------------------------------------------------------------------------
// Z-API
// ---------------------------------------------------------------------------

fn parse_zapi(raw: Value, instance_ref: String) -> ProviderWebhook {
    let event_name = event_name(&raw).unwrap_or("unknown").to_string();

    let timestamp = raw
        .get("momment")
        .and_then(Value::as_i64)
        .and_then(DateTime::<Utc>::from_timestamp_millis);

    let mut webhook = ProviderWebhook {
        provider: ProviderKind::ZApi,
        instance_ref,
        event_name: event_name.clone(),
        kind: EventKind::Message,
        external_ids: Vec::new(),
        status: None,
        item_statuses: Vec::new(),
        connection_status: None,
        media: None,
        timestamp,
        raw: Value::Null,
    };

    match event_name.as_str() {
        "MessageStatusCallback" | "DeliveryCallback" => {
            webhook.kind = EventKind::StatusUpdate;
            webhook.external_ids = match raw.get("ids").and_then(Value::as_array) {
                Some(ids) => ids.iter().filter_map(Value::as_str).map(str::to_string).collect(),
                None => owned_at(&raw, &["/messageId", "/id"]).into_iter().collect(),
            };
            // DeliveryCallback confirma o envio e normalmente não traz `status`
            let status = MessageStatus::from_provider_token(str_at(&raw, &["/status"]).unwrap_or("SENT"));
            webhook.item_statuses = webhook
                .external_ids
                .iter()
                .map(|id| (id.clone(), status.clone()))
                .collect();
            webhook.status = Some(status);
        }
        "ConnectedCallback" => {
            webhook.kind = EventKind::ConnectionUpdate;
            webhook.connection_status = Some(ConnectionStatus::Connected);
        }
        "DisconnectedCallback" => {
            webhook.kind = EventKind::ConnectionUpdate;
            webhook.connection_status = Some(ConnectionStatus::Disconnected);
        }
        _ => {
            webhook.external_ids = owned_at(&raw, &["/messageId"]).into_iter().collect();
            webhook.media = zapi_media(&raw);
            if webhook.media.is_some() {
                webhook.kind = EventKind::Media;
            }
        }
    }

    webhook.raw = raw;
    webhook
}

fn zapi_media(raw: &Value) -> Option<MediaDescriptor> {
    [
        ("image", "imageUrl", MediaKind::Image),
        ("sticker", "stickerUrl", MediaKind::Image),
        ("video", "videoUrl", MediaKind::Video),
        ("audio", "audioUrl", MediaKind::Audio),
        ("document", "documentUrl", MediaKind::Document),
    ]
    .iter()
    .find_map(|(key, url_key, kind)| {
        let node = raw.get(*key).filter(|n| n.is_object())?;
        let url_pointer = format!("/{}", url_key);
        Some(MediaDescriptor {
            url: owned_at(node, &[url_pointer.as_str()]),
            kind: *kind,
            mime_type: owned_at(node, &["/mimeType"]),
            file_name: owned_at(node, &["/fileName", "/title"]),
            data: None,
        })
    })
}
