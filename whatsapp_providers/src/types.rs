//! Tipos compartilhados entre os clientes

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Família de provedor WhatsApp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    #[serde(rename = "evolution")]
    Evolution,
    #[serde(rename = "zapi", alias = "z-api", alias = "z_api")]
    ZApi,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Evolution => "evolution",
            ProviderKind::ZApi => "zapi",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "evolution" | "evolution-api" | "evolution_api" => Ok(ProviderKind::Evolution),
            "zapi" | "z-api" | "z_api" => Ok(ProviderKind::ZApi),
            other => Err(format!("unknown provider: {}", other)),
        }
    }
}

/// Tipo de mídia suportado pelos provedores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Document,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Document => "document",
        }
    }

    /// Interpreta o `mediaType` enviado pelos chamadores; desconhecido vira documento
    pub fn from_loose(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "image" | "imagem" | "photo" | "sticker" => MediaKind::Image,
            "video" => MediaKind::Video,
            "audio" | "ptt" | "voice" => MediaKind::Audio,
            _ => MediaKind::Document,
        }
    }
}

/// Conteúdo de uma mensagem de saída
#[derive(Debug, Clone, PartialEq)]
pub enum MessageContent {
    Text {
        text: String,
    },
    Media {
        url: String,
        kind: MediaKind,
        caption: Option<String>,
        file_name: Option<String>,
    },
}

/// Mensagem pronta para envio por um provedor
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub to: String,
    pub content: MessageContent,
}

impl OutboundMessage {
    pub fn text(to: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            content: MessageContent::Text { text: text.into() },
        }
    }

    /// Destino no formato aceito pelos provedores: JIDs (`@g.us`, `@s.whatsapp.net`)
    /// passam intactos, telefones ficam só com dígitos
    pub fn destination(&self) -> String {
        if self.to.contains('@') {
            self.to.clone()
        } else {
            self.to.chars().filter(|c| c.is_ascii_digit()).collect()
        }
    }
}

/// Resposta de um envio bem-sucedido
#[derive(Debug, Clone)]
pub struct ProviderReply {
    pub provider: ProviderKind,
    pub message_id: Option<String>,
    pub raw: Value,
}

/// Estado da sessão WhatsApp reportado pelo provedor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connected,
    Connecting,
    Disconnected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!("Z-API".parse::<ProviderKind>().unwrap(), ProviderKind::ZApi);
        assert_eq!("evolution".parse::<ProviderKind>().unwrap(), ProviderKind::Evolution);
        assert!("twilio".parse::<ProviderKind>().is_err());

        let kind: ProviderKind = serde_json::from_str(r#""z-api""#).unwrap();
        assert_eq!(kind, ProviderKind::ZApi);
        assert_eq!(serde_json::to_string(&ProviderKind::ZApi).unwrap(), r#""zapi""#);
    }

    #[test]
    fn test_media_kind_from_loose() {
        assert_eq!(MediaKind::from_loose("ptt"), MediaKind::Audio);
        assert_eq!(MediaKind::from_loose("IMAGE"), MediaKind::Image);
        assert_eq!(MediaKind::from_loose("planilha"), MediaKind::Document);
    }

    #[test]
    fn test_destination_normalization() {
        assert_eq!(OutboundMessage::text("+55 (11) 99999-0000", "oi").destination(), "5511999990000");
        assert_eq!(
            OutboundMessage::text("1203630@g.us", "oi").destination(),
            "1203630@g.us"
        );
    }
}
