// Configuration layer for transport selection and backend endpoints.
// The two transports are interchangeable implementations of ChatTransport;
// a deployment picks one here.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::sse::SseTransport;
use crate::traits::ChatTransport;
use crate::ws::WsTransport;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_WS_URL: &str = "ws://localhost:8000/ws";

/// Which streaming transport to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Sse,
    Websocket,
}

impl Default for TransportKind {
    fn default() -> Self {
        TransportKind::Sse
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// HTTP base URL, e.g. "http://localhost:8000".
    pub api_url: String,
    /// WebSocket base URL including the /ws prefix, e.g. "ws://localhost:8000/ws".
    pub ws_url: String,
    #[serde(default)]
    pub kind: TransportKind,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            kind: TransportKind::default(),
        }
    }
}

impl TransportConfig {
    pub fn new(api_url: impl Into<String>, ws_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ws_url: ws_url.into(),
            kind: TransportKind::default(),
        }
    }

    pub fn with_kind(mut self, kind: TransportKind) -> Self {
        self.kind = kind;
        self
    }

    /// Load from environment, falling back to localhost defaults so local
    /// development works without configuration.
    ///
    /// * `QUERYBOT_API_URL` — HTTP base URL
    /// * `QUERYBOT_WS_URL` — WebSocket base URL
    /// * `QUERYBOT_TRANSPORT` — "sse" (default) or "websocket"
    pub fn from_env() -> Self {
        let api_url =
            std::env::var("QUERYBOT_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let ws_url =
            std::env::var("QUERYBOT_WS_URL").unwrap_or_else(|_| DEFAULT_WS_URL.to_string());
        let kind = match std::env::var("QUERYBOT_TRANSPORT").as_deref() {
            Ok("websocket") => TransportKind::Websocket,
            Ok("sse") | Err(_) => TransportKind::Sse,
            Ok(other) => {
                tracing::warn!(value = other, "unknown QUERYBOT_TRANSPORT, using sse");
                TransportKind::Sse
            }
        };

        Self { api_url, ws_url, kind }
    }
}

/// Factory for creating a transport from configuration.
pub struct TransportFactory;

impl TransportFactory {
    pub fn create(config: &TransportConfig) -> Result<Arc<dyn ChatTransport>> {
        match config.kind {
            TransportKind::Sse => {
                let transport = SseTransport::new(&config.api_url)?;
                Ok(Arc::new(transport))
            }
            TransportKind::Websocket => {
                let transport = WsTransport::new(&config.ws_url);
                Ok(Arc::new(transport))
            }
        }
    }
}
