use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Which renderer and metadata fields apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    File,
    Image,
}

/// Retrieval citation attached to an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub excerpt: String,
    /// Similarity score in [0, 1].
    pub similarity: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Source>,

    #[serde(default)]
    pub is_streaming: bool,

    #[serde(default)]
    pub is_complete: bool,

    #[serde(default)]
    pub is_system: bool,

    #[serde(default)]
    pub is_error: bool,
}

/// One unit of conversation content.
///
/// The `id` is the merge key for streaming updates: every partial and the
/// final completion of one assistant turn share the same id, so the log
/// always holds a single bubble per turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

impl ChatMessage {
    /// User text message with a fresh id.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: format!("user-{}", Uuid::new_v4()),
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
            kind: MessageKind::Text,
            metadata: None,
        }
    }

    /// User file message, metadata populated from the staged file.
    pub fn user_file(
        file_name: impl Into<String>,
        file_type: impl Into<String>,
        file_size: u64,
    ) -> Self {
        let file_name = file_name.into();
        Self {
            id: format!("user-file-{}", Uuid::new_v4()),
            role: Role::User,
            content: format!("Uploaded file: {}", file_name),
            timestamp: Utc::now(),
            kind: MessageKind::File,
            metadata: Some(MessageMetadata {
                file_name: Some(file_name),
                file_type: Some(file_type.into()),
                file_size: Some(file_size),
                ..Default::default()
            }),
        }
    }

    /// In-progress assistant message for a streaming turn.
    pub fn assistant_streaming(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            kind: MessageKind::Text,
            metadata: Some(MessageMetadata {
                is_streaming: true,
                ..Default::default()
            }),
        }
    }

    /// Finalized assistant message for a completed turn.
    pub fn assistant_complete(
        id: impl Into<String>,
        content: impl Into<String>,
        sources: Vec<Source>,
    ) -> Self {
        Self {
            id: id.into(),
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            kind: MessageKind::Text,
            metadata: Some(MessageMetadata {
                sources,
                is_complete: true,
                ..Default::default()
            }),
        }
    }

    /// Assistant-styled side-channel notice (upload outcomes and similar).
    pub fn system_notice(content: impl Into<String>, is_error: bool) -> Self {
        Self {
            id: format!("bot-{}", Uuid::new_v4()),
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            kind: MessageKind::Text,
            metadata: Some(MessageMetadata {
                is_system: true,
                is_error,
                ..Default::default()
            }),
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.metadata.as_ref().map(|m| m.is_streaming).unwrap_or(false)
    }

    pub fn sources(&self) -> &[Source] {
        self.metadata.as_ref().map(|m| m.sources.as_slice()).unwrap_or(&[])
    }
}
