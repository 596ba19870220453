use querybot_types::{ChatMessage, TransportEvent};

use crate::uploads::UploadEvent;

/// The single source of truth for what the user sees.
///
/// Owns the ordered message log exclusively; transports and the upload
/// coordinator communicate outcomes via events, never by direct mutation.
#[derive(Debug)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    error: Option<String>,
    is_loading: bool,
    is_connected: bool,
}

impl Default for Conversation {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            error: None,
            is_loading: false,
            // Optimistic until a transport reports otherwise.
            is_connected: true,
        }
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only ordered view of the log.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_connected(&self) -> bool {
        self.is_connected
    }

    /// The single current-error slot. Setting a new error replaces any
    /// previous one; auto-expiry from the UI is the consumer's concern.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn append_user_message(&mut self, content: impl Into<String>) -> &ChatMessage {
        self.messages.push(ChatMessage::user(content));
        self.messages.last().expect("just pushed")
    }

    pub fn append_user_file_message(
        &mut self,
        file_name: &str,
        file_type: &str,
        file_size: u64,
    ) -> &ChatMessage {
        self.messages.push(ChatMessage::user_file(file_name, file_type, file_size));
        self.messages.last().expect("just pushed")
    }

    /// Insert-or-replace by id, index preserved. This is the merge point for
    /// streaming: every partial and the final completion of one turn carry
    /// the same id, so the log shows exactly one bubble per turn.
    pub fn upsert_assistant_message(&mut self, message: ChatMessage) {
        match self.messages.iter().position(|m| m.id == message.id) {
            Some(index) => self.messages[index] = message,
            None => self.messages.push(message),
        }
    }

    /// Assistant-styled side-channel notice (upload outcomes and similar).
    pub fn append_system_message(&mut self, content: impl Into<String>, is_error: bool) {
        self.messages.push(ChatMessage::system_notice(content, is_error));
    }

    /// Empties the log and clears any outstanding error in one step.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.error = None;
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Mark the start of a send: loading until the terminal event, error slot
    /// reset, connectivity assumed until proven otherwise.
    pub fn begin_turn(&mut self) {
        self.is_loading = true;
        self.error = None;
        self.is_connected = true;
    }

    /// Stop loading without a terminal event (stream abandoned mid-turn).
    /// Partial output stays in the log.
    pub fn abort_turn(&mut self) {
        self.is_loading = false;
    }

    /// Fold one transport event into view state. `turn_id` is the stable
    /// merge key for this send's assistant message.
    pub fn apply_transport_event(&mut self, turn_id: &str, event: TransportEvent) {
        match event {
            TransportEvent::Status { content } => {
                tracing::debug!(status = %content, "stream status");
            }
            TransportEvent::Partial { content } => {
                self.upsert_assistant_message(ChatMessage::assistant_streaming(turn_id, content));
            }
            TransportEvent::Complete { content, sources } => {
                self.upsert_assistant_message(ChatMessage::assistant_complete(
                    turn_id, content, sources,
                ));
                self.is_loading = false;
            }
            TransportEvent::Error { message } => {
                // Best-effort: the partially streamed message stays readable.
                self.set_error(message);
                self.is_loading = false;
                self.is_connected = false;
            }
        }
    }

    /// Fold one upload event into the log: a user file bubble when an upload
    /// starts, an assistant-styled outcome notice when it finishes.
    pub fn apply_upload_event(&mut self, event: UploadEvent) {
        match event {
            UploadEvent::Started { name, mime_type, size } => {
                self.append_user_file_message(&name, &mime_type, size);
            }
            UploadEvent::Finished(result) => {
                if result.success {
                    let text = result.message.unwrap_or_else(|| {
                        format!("File \"{}\" has been uploaded.", result.filename)
                    });
                    self.append_system_message(text, false);
                } else {
                    let reason = result.error.as_deref().unwrap_or("unknown error");
                    self.append_system_message(
                        format!("Failed to upload \"{}\": {}", result.filename, reason),
                        true,
                    );
                }
            }
        }
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.is_connected = connected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use querybot_types::Role;

    #[test]
    fn test_upsert_appends_then_replaces_in_place() {
        let mut conversation = Conversation::new();
        conversation.append_user_message("question");

        conversation.upsert_assistant_message(ChatMessage::assistant_streaming("msg-1", "Hi"));
        conversation
            .upsert_assistant_message(ChatMessage::assistant_streaming("msg-1", "Hi there"));

        assert_eq!(conversation.messages().len(), 2);
        assert_eq!(conversation.messages()[1].content, "Hi there");
        assert_eq!(conversation.messages()[1].role, Role::Assistant);
    }

    #[test]
    fn test_upsert_is_idempotent_under_replay() {
        let mut conversation = Conversation::new();
        let message = ChatMessage::assistant_complete("msg-1", "final", vec![]);

        conversation.upsert_assistant_message(message.clone());
        conversation.upsert_assistant_message(message);

        assert_eq!(conversation.messages().len(), 1);
        assert_eq!(conversation.messages()[0].content, "final");
    }

    #[test]
    fn test_clear_empties_log_and_error_together() {
        let mut conversation = Conversation::new();
        conversation.append_user_message("hello");
        conversation.set_error("boom");

        conversation.clear();

        assert!(conversation.messages().is_empty());
        assert!(conversation.error().is_none());
    }

    #[test]
    fn test_error_event_preserves_partial_output() {
        let mut conversation = Conversation::new();
        conversation.begin_turn();
        conversation.apply_transport_event(
            "msg-1",
            TransportEvent::Partial { content: "partial answer".into() },
        );

        conversation.apply_transport_event(
            "msg-1",
            TransportEvent::Error { message: "connection reset".into() },
        );

        assert_eq!(conversation.messages().len(), 1);
        assert_eq!(conversation.messages()[0].content, "partial answer");
        assert!(!conversation.is_loading());
        assert!(!conversation.is_connected());
        assert_eq!(conversation.error(), Some("connection reset"));
    }

    #[test]
    fn test_new_error_replaces_previous() {
        let mut conversation = Conversation::new();
        conversation.set_error("first");
        conversation.set_error("second");

        assert_eq!(conversation.error(), Some("second"));
    }

    #[test]
    fn test_single_streaming_message_per_turn() {
        let mut conversation = Conversation::new();
        conversation.begin_turn();

        for content in ["a", "a b", "a b c"] {
            conversation.apply_transport_event(
                "msg-1",
                TransportEvent::Partial { content: content.into() },
            );
        }

        let streaming: Vec<_> =
            conversation.messages().iter().filter(|m| m.is_streaming()).collect();
        assert_eq!(streaming.len(), 1);
    }
}
