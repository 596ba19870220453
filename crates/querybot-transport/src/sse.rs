// SSE-style streaming transport: one POST per send, response body read as a
// line-oriented `data: <json>` stream.

use anyhow::{Context, Result};
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use querybot_types::{ChatMessage, ChatRequest, StreamFrame, TransportEvent};

use crate::error::TransportError;
use crate::line_buffer::LineBuffer;
use crate::traits::ChatTransport;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Folds wire frames into lifecycle events, maintaining the local text
/// accumulator for the in-flight turn.
///
/// Dual accumulation: a frame's `accumulated` field replaces the local
/// accumulator verbatim (server is authoritative); otherwise `content` is a
/// delta appended with a separating space.
#[derive(Debug, Default)]
pub struct SseAccumulator {
    acc: String,
}

impl SseAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, frame: StreamFrame) -> TransportEvent {
        match frame {
            StreamFrame::Status { content, .. } => TransportEvent::Status { content },
            StreamFrame::Stream { content, accumulated, .. } => {
                match accumulated {
                    Some(full) => self.acc = full,
                    None => {
                        self.acc.push_str(&content);
                        self.acc.push(' ');
                    }
                }
                TransportEvent::Partial {
                    content: self.acc.trim().to_string(),
                }
            }
            StreamFrame::Complete { content, metadata, .. } => {
                let content = if content.is_empty() {
                    self.acc.trim().to_string()
                } else {
                    content
                };
                TransportEvent::Complete {
                    content,
                    sources: metadata.map(|m| m.sources).unwrap_or_default(),
                }
            }
            StreamFrame::Error { content, .. } => TransportEvent::Error { message: content },
        }
    }
}

pub struct SseTransport {
    http: reqwest::Client,
    base_url: String,
    connected: Arc<AtomicBool>,
    inflight: Mutex<Option<JoinHandle<()>>>,
}

impl SseTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            connected: Arc::new(AtomicBool::new(false)),
            inflight: Mutex::new(None),
        })
    }

    fn supersede(&self, next: Option<JoinHandle<()>>) {
        let mut inflight = self.inflight.lock().expect("inflight lock poisoned");
        if let Some(prior) = inflight.take() {
            prior.abort();
        }
        *inflight = next;
    }

    async fn pump(
        http: reqwest::Client,
        url: String,
        payload: ChatRequest,
        connected: Arc<AtomicBool>,
        tx: mpsc::Sender<TransportEvent>,
    ) {
        let response = match http
            .post(&url)
            .header(ACCEPT, "text/event-stream")
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                connected.store(false, Ordering::SeqCst);
                let _ = tx
                    .send(TransportEvent::Error {
                        message: TransportError::Connect(e.to_string()).to_string(),
                    })
                    .await;
                return;
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            connected.store(false, Ordering::SeqCst);
            let _ = tx
                .send(TransportEvent::Error {
                    message: TransportError::Status {
                        status: status.as_u16(),
                        detail,
                    }
                    .to_string(),
                })
                .await;
            return;
        }

        connected.store(true, Ordering::SeqCst);

        let mut chunks = response.bytes_stream();
        let mut buffer = LineBuffer::with_capacity(8192);
        let mut accumulator = SseAccumulator::new();
        let mut terminal_sent = false;

        'read: while let Some(chunk) = chunks.next().await {
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(e) => {
                    connected.store(false, Ordering::SeqCst);
                    let _ = tx
                        .send(TransportEvent::Error {
                            message: TransportError::Stream(e.to_string()).to_string(),
                        })
                        .await;
                    terminal_sent = true;
                    break;
                }
            };

            buffer.extend(&bytes);

            while let Some(line) = buffer.next_line() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::warn!(error = %e, "skipping non-UTF-8 stream line");
                        continue;
                    }
                };

                if line.is_empty() {
                    continue;
                }

                let Some(data) = line.strip_prefix("data: ") else {
                    continue;
                };

                if data == "[DONE]" {
                    break 'read;
                }

                let frame = match serde_json::from_str::<StreamFrame>(data) {
                    Ok(frame) => frame,
                    Err(e) => {
                        // Isolated corrupt lines must not kill a healthy turn.
                        tracing::warn!(error = %e, data = %data, "skipping malformed stream frame");
                        continue;
                    }
                };

                let event = accumulator.apply(frame);
                let is_terminal = event.is_terminal();
                if let TransportEvent::Error { .. } = event {
                    connected.store(false, Ordering::SeqCst);
                }
                if tx.send(event).await.is_err() {
                    // Receiver dropped; the turn was abandoned.
                    return;
                }
                if is_terminal {
                    terminal_sent = true;
                    break 'read;
                }
            }
        }

        // The stream closed (or sent [DONE]) without an explicit completion.
        if !terminal_sent {
            connected.store(false, Ordering::SeqCst);
            let _ = tx
                .send(TransportEvent::Error {
                    message: TransportError::Truncated.to_string(),
                })
                .await;
        }
    }
}

#[async_trait::async_trait]
impl ChatTransport for SseTransport {
    async fn send(&self, message: &str, history: &[ChatMessage]) -> mpsc::Receiver<TransportEvent> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let payload = ChatRequest::new(message, history);
        let http = self.http.clone();
        let url = format!("{}/api/chat/stream", self.base_url);
        let connected = Arc::clone(&self.connected);

        let handle = tokio::spawn(Self::pump(http, url, payload, connected, tx));
        self.supersede(Some(handle));

        rx
    }

    fn disconnect(&self) {
        self.supersede(None);
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
