use thiserror::Error;

/// Hard transport failures that terminate a stream.
///
/// Isolated malformed frames are not errors at this level; they are logged
/// and skipped by the stream pumps.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("backend returned {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("stream error: {0}")]
    Stream(String),

    #[error("stream ended before completion")]
    Truncated,
}
