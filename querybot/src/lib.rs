//! # QueryBot Client
//!
//! Streaming chat client for the QueryBot RAG backend:
//! - **Streaming turns** — SSE or WebSocket transport behind one trait, with
//!   partial assistant text merged into the log by stable message id
//! - **Conversation state** — single-owner message log with loading,
//!   connectivity and error slots
//! - **Uploads** — staged files sent sequentially with per-file outcomes in
//!   the conversation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use querybot::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut session = SessionBuilder::new()
//!         .api_url("http://localhost:8000")
//!         .build()?;
//!
//!     session.send_message("What does the handbook say about PTO?").await?;
//!
//!     for message in session.conversation().messages() {
//!         println!("[{:?}] {}", message.role, message.content);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! Composable crates:
//!
//! - **querybot-types**: message, event and wire types
//! - **querybot-transport**: SSE/WebSocket transports and the HTTP API client
//! - **querybot-session**: conversation state, uploads and the session driver

pub use querybot_session as session;
pub use querybot_transport as transport;
pub use querybot_types as types;

pub use querybot_session::{ChatSession, Conversation, UploadCoordinator, UploadResult};
pub use querybot_transport::{
    BackendApi, ChatTransport, SseTransport, TransportConfig, TransportKind, WsTransport,
};
pub use querybot_types::{ChatMessage, MessageKind, Role, Source, TransportEvent};

/// High-level builder for creating chat sessions
pub mod builder;

/// Convenient prelude with commonly used types
pub mod prelude {
    pub use crate::builder::SessionBuilder;
    pub use crate::session::ChatSession;
    pub use crate::transport::{TransportConfig, TransportKind};
    pub use crate::types::{ChatMessage, Role, Source, TransportEvent};
    pub use anyhow::Result;
}
