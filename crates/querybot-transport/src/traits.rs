use async_trait::async_trait;
use tokio::sync::mpsc;

use querybot_types::{ChatMessage, TransportEvent};

/// A streaming chat transport.
///
/// At most one logical stream per instance: a new `send` first tears down any
/// prior in-flight stream (closing the old connection is the cancellation
/// mechanism; cancelled streams replay nothing).
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Open a stream for one logical send.
    ///
    /// The receiver yields zero or more `Status`/`Partial` events in transport
    /// order, then exactly one terminal `Complete` or `Error`, which is always
    /// the last event observed for this send.
    async fn send(&self, message: &str, history: &[ChatMessage]) -> mpsc::Receiver<TransportEvent>;

    /// Close any open connection and release resources. Idempotent; safe to
    /// call when already disconnected.
    fn disconnect(&self);

    /// Whether an active connection is currently healthy.
    fn is_connected(&self) -> bool;
}
