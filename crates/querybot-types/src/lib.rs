pub mod events;
pub mod message;
pub mod wire;

pub use events::TransportEvent;
pub use message::{ChatMessage, MessageKind, MessageMetadata, Role, Source};
pub use wire::{ChatRequest, ClientFrame, FrameMetadata, HistoryEntry, ServerFrame, StreamFrame};
