// Non-streaming HTTP surface of the backend: health check, chat fallback,
// document upload and history clear.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use querybot_types::{ChatMessage, ChatRequest, Source};

use crate::config::TransportConfig;

/// Seam between the upload coordinator and the backend. Lets tests exercise
/// batch upload semantics without a network.
#[async_trait]
pub trait DocumentUploader: Send + Sync {
    async fn upload(
        &self,
        file_name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<serde_json::Value>;
}

/// Response from the non-streaming `POST /api/chat` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    pub content: String,
    #[serde(default)]
    pub sources: Vec<Source>,
}

#[derive(Clone)]
pub struct BackendApi {
    http: reqwest::Client,
    base_url: String,
}

impl BackendApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    pub fn from_config(config: &TransportConfig) -> Result<Self> {
        Self::new(&config.api_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /health`. Any failure reads as "not connected".
    pub async fn health(&self) -> bool {
        match self.http.get(format!("{}/health", self.base_url)).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "health check failed");
                false
            }
        }
    }

    /// Non-streaming chat fallback: `POST /api/chat`.
    pub async fn chat(&self, message: &str, history: &[ChatMessage]) -> Result<ChatReply> {
        let payload = ChatRequest::new(message, history);

        let response = self
            .http
            .post(format!("{}/api/chat", self.base_url))
            .json(&payload)
            .send()
            .await
            .context("Failed to send chat request")?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("Chat failed ({}): {}", status, detail);
        }

        response.json().await.context("Failed to parse chat response")
    }

    /// `DELETE /api/chat/history`.
    pub async fn clear_history(&self) -> Result<()> {
        let response = self
            .http
            .delete(format!("{}/api/chat/history", self.base_url))
            .send()
            .await
            .context("Failed to send history clear request")?;

        if !response.status().is_success() {
            anyhow::bail!("History clear failed ({})", response.status());
        }

        Ok(())
    }
}

#[async_trait]
impl DocumentUploader for BackendApi {
    /// `POST /api/documents/upload`, multipart with a single `file` field.
    /// Failure messages come from the JSON `detail` field when present, else
    /// from the HTTP status text.
    async fn upload(
        &self,
        file_name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<serde_json::Value> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime_type)
            .with_context(|| format!("Invalid MIME type: {}", mime_type))?;
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(format!("{}/api/documents/upload", self.base_url))
            .multipart(form)
            .send()
            .await
            .context("Failed to send upload request")?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|body| body.get("detail").and_then(|d| d.as_str()).map(str::to_string))
                .unwrap_or_else(|| {
                    status.canonical_reason().unwrap_or("upload rejected").to_string()
                });
            anyhow::bail!("Upload failed: {}", detail);
        }

        response.json().await.context("Failed to parse upload response")
    }
}
