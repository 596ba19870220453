pub mod api;
pub mod config;
pub mod error;
pub mod line_buffer;
pub mod sse;
pub mod traits;
pub mod ws;

pub use api::{BackendApi, ChatReply, DocumentUploader};
pub use config::{TransportConfig, TransportFactory, TransportKind, DEFAULT_API_URL, DEFAULT_WS_URL};
pub use error::TransportError;
pub use line_buffer::LineBuffer;
pub use sse::SseTransport;
pub use traits::ChatTransport;
pub use ws::WsTransport;
