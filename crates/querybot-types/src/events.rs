use serde::{Deserialize, Serialize};

use crate::message::Source;

/// Lifecycle events a transport emits for one logical send.
///
/// Ordering contract: zero or more `Status`, zero or more `Partial` (each
/// carrying the latest accumulated assistant text, not a delta), then exactly
/// one terminal `Complete` or `Error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportEvent {
    /// Informational progress note. Consumers may log or ignore.
    Status { content: String },

    /// Latest accumulated assistant text for the in-flight turn.
    Partial { content: String },

    /// Turn finished. `content` is the final assistant text.
    Complete {
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        sources: Vec<Source>,
    },

    /// Turn failed. The partially streamed text (if any) stays in the log.
    Error { message: String },
}

impl TransportEvent {
    /// Whether this event ends the turn.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }
}
