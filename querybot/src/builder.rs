use anyhow::Result;

use querybot_session::ChatSession;
use querybot_transport::{TransportConfig, TransportKind};

/// Fluent construction of a [`ChatSession`].
///
/// Unset fields fall back to environment variables and then to localhost
/// defaults, so local development needs no configuration.
#[derive(Debug, Default)]
pub struct SessionBuilder {
    api_url: Option<String>,
    ws_url: Option<String>,
    kind: Option<TransportKind>,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    pub fn ws_url(mut self, url: impl Into<String>) -> Self {
        self.ws_url = Some(url.into());
        self
    }

    /// Use the WebSocket transport instead of the default SSE stream.
    pub fn websocket(mut self) -> Self {
        self.kind = Some(TransportKind::Websocket);
        self
    }

    pub fn build(self) -> Result<ChatSession> {
        let mut config = TransportConfig::from_env();
        if let Some(api_url) = self.api_url {
            config.api_url = api_url;
        }
        if let Some(ws_url) = self.ws_url {
            config.ws_url = ws_url;
        }
        if let Some(kind) = self.kind {
            config.kind = kind;
        }

        ChatSession::new(&config)
    }
}
