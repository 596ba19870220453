use std::mem;
use tokio::sync::mpsc;

use querybot_transport::DocumentUploader;

use crate::preview::{icon_for_mime, PreviewRegistry};

/// Preview handle for a staged file. Object URLs are registry-tracked and
/// must be revoked when the entry is removed; icon keys are static.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preview {
    ObjectUrl(String),
    Icon(&'static str),
}

/// A file selected by the user but not yet transmitted.
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub bytes: Vec<u8>,
    pub preview: Preview,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadResult {
    pub success: bool,
    pub filename: String,
    pub message: Option<String>,
    pub error: Option<String>,
}

/// Batch progress events, one `Started` + one `Finished` per file.
#[derive(Debug, Clone)]
pub enum UploadEvent {
    Started { name: String, mime_type: String, size: u64 },
    Finished(UploadResult),
}

/// Stages files client-side and uploads them sequentially, reporting each
/// outcome individually over a typed channel so the conversation log gets one
/// message per file rather than a batch summary.
pub struct UploadCoordinator {
    staged: Vec<StagedFile>,
    registry: PreviewRegistry,
    events: mpsc::UnboundedSender<UploadEvent>,
    is_uploading: bool,
    upload_error: Option<String>,
}

impl UploadCoordinator {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UploadEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (
            Self {
                staged: Vec::new(),
                registry: PreviewRegistry::new(),
                events,
                is_uploading: false,
                upload_error: None,
            },
            rx,
        )
    }

    pub fn staged(&self) -> &[StagedFile] {
        &self.staged
    }

    /// True for the duration of a whole batch.
    pub fn is_uploading(&self) -> bool {
        self.is_uploading
    }

    /// Last failure message. Independent slot from the chat error so a failed
    /// upload does not blank out an unrelated chat error.
    pub fn upload_error(&self) -> Option<&str> {
        self.upload_error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.upload_error = None;
    }

    pub fn registry(&self) -> &PreviewRegistry {
        &self.registry
    }

    /// Stage one selected file. Images get an object-URL preview token,
    /// everything else an icon key. Never blocks, never rejects.
    pub fn stage(&mut self, name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) {
        let name = name.into();
        let mime_type = mime_type.into();
        let preview = if mime_type.starts_with("image/") {
            Preview::ObjectUrl(self.registry.create_object_url())
        } else {
            Preview::Icon(icon_for_mime(&mime_type))
        };

        self.staged.push(StagedFile {
            size: bytes.len() as u64,
            name,
            mime_type,
            bytes,
            preview,
        });
    }

    /// Remove one staged file, revoking its preview token if it was an object
    /// URL. Out-of-range indices are ignored.
    pub fn unstage(&mut self, index: usize) {
        if index >= self.staged.len() {
            return;
        }
        let file = self.staged.remove(index);
        self.release(&file.preview);
    }

    /// Upload every staged file in staging order, one at a time. A failed
    /// upload records the error and moves on; one bad file must not block the
    /// rest. The staged set is empty afterward regardless of outcomes. An
    /// empty staged set is a no-op.
    pub async fn upload_all(&mut self, uploader: &dyn DocumentUploader) -> Vec<UploadResult> {
        if self.staged.is_empty() {
            return Vec::new();
        }

        self.is_uploading = true;
        self.upload_error = None;

        let batch = mem::take(&mut self.staged);
        let mut results = Vec::with_capacity(batch.len());

        for file in batch {
            let StagedFile { name, mime_type, size, bytes, preview } = file;

            let _ = self.events.send(UploadEvent::Started {
                name: name.clone(),
                mime_type: mime_type.clone(),
                size,
            });

            let result = match uploader.upload(&name, &mime_type, bytes).await {
                Ok(_) => {
                    let message = format!(
                        "File \"{}\" has been uploaded and processed successfully. \
                         You can now ask questions about its content.",
                        name
                    );
                    UploadResult {
                        success: true,
                        filename: name,
                        message: Some(message),
                        error: None,
                    }
                }
                Err(e) => {
                    let message = e.to_string();
                    tracing::warn!(file = %name, error = %message, "upload failed");
                    self.upload_error = Some(message.clone());
                    UploadResult {
                        success: false,
                        filename: name,
                        message: None,
                        error: Some(message),
                    }
                }
            };

            let _ = self.events.send(UploadEvent::Finished(result.clone()));
            results.push(result);
            self.release(&preview);
        }

        self.is_uploading = false;
        results
    }

    fn release(&self, preview: &Preview) {
        if let Preview::ObjectUrl(url) = preview {
            self.registry.revoke(url);
        }
    }
}
