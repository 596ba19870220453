use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use querybot_transport::{BackendApi, ChatTransport, TransportConfig, TransportFactory};

use crate::conversation::Conversation;
use crate::uploads::{UploadCoordinator, UploadEvent};

/// Wires the transport, conversation state and upload coordinator together
/// and drives one turn at a time.
///
/// Each send drains staged uploads into the log, appends the user message,
/// opens a stream, and folds every transport event into the conversation
/// under one stable assistant-message id until the terminal event. A send
/// issued while another is in flight supersedes it at the transport level
/// (cancel-then-start).
pub struct ChatSession {
    transport: Arc<dyn ChatTransport>,
    api: BackendApi,
    conversation: Conversation,
    uploads: UploadCoordinator,
    upload_events: mpsc::UnboundedReceiver<UploadEvent>,
}

impl ChatSession {
    pub fn new(config: &TransportConfig) -> Result<Self> {
        let transport = TransportFactory::create(config)?;
        let api = BackendApi::from_config(config)?;
        Ok(Self::with_transport(transport, api))
    }

    /// Assembly seam for tests and custom transports.
    pub fn with_transport(transport: Arc<dyn ChatTransport>, api: BackendApi) -> Self {
        let (uploads, upload_events) = UploadCoordinator::new();
        Self {
            transport,
            api,
            conversation: Conversation::new(),
            uploads,
            upload_events,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn uploads(&self) -> &UploadCoordinator {
        &self.uploads
    }

    /// Stage a file for the next upload batch.
    pub fn stage_file(
        &mut self,
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) {
        self.uploads.stage(name, mime_type, bytes);
    }

    pub fn unstage_file(&mut self, index: usize) {
        self.uploads.unstage(index);
    }

    /// Upload all staged files now, reflecting each outcome in the log.
    pub async fn upload_staged(&mut self) {
        if self.uploads.staged().is_empty() {
            return;
        }
        self.uploads.upload_all(&self.api).await;
        self.drain_upload_events();
    }

    /// Send a user message: staged uploads first, then the text (if any),
    /// streaming the assistant response into the log.
    pub async fn send_message(&mut self, content: &str) -> Result<()> {
        self.upload_staged().await;

        let content = content.trim();
        if content.is_empty() {
            return Ok(());
        }

        // History reflects the log before this turn's user message.
        let history = self.conversation.messages().to_vec();
        self.conversation.append_user_message(content);
        self.conversation.begin_turn();

        let turn_id = format!("msg-{}", Uuid::new_v4());
        let mut events = self.transport.send(content, &history).await;

        while let Some(event) = events.recv().await {
            let terminal = event.is_terminal();
            self.conversation.apply_transport_event(&turn_id, event);
            if terminal {
                break;
            }
        }

        // Stream abandoned without a terminal event (e.g. disconnect during
        // unmount): stop loading, keep whatever partial output arrived.
        if self.conversation.is_loading() {
            tracing::debug!("stream closed without terminal event");
            self.conversation.abort_turn();
        }

        Ok(())
    }

    /// Optional connectivity gate before the first message.
    pub async fn check_backend(&mut self) -> bool {
        let healthy = self.api.health().await;
        self.conversation.set_connected(healthy);
        healthy
    }

    /// Clear the local log and any error. Server-side history is untouched.
    pub fn clear(&mut self) {
        self.conversation.clear();
    }

    /// Clear both the backend history and the local log.
    pub async fn clear_history(&mut self) -> Result<()> {
        self.api.clear_history().await?;
        self.conversation.clear();
        Ok(())
    }

    pub fn clear_error(&mut self) {
        self.conversation.clear_error();
    }

    /// Tear down any in-flight stream. Safe to call repeatedly.
    pub fn disconnect(&mut self) {
        self.transport.disconnect();
        self.conversation.set_connected(false);
    }

    fn drain_upload_events(&mut self) {
        while let Ok(event) = self.upload_events.try_recv() {
            if let UploadEvent::Finished(result) = &event {
                if !result.success {
                    tracing::warn!(file = %result.filename, "upload reported failure");
                }
            }
            self.conversation.apply_upload_event(event);
        }
    }
}
