// WebSocket streaming transport, mutually exclusive with the SSE transport in
// a given deployment. One query frame out per send, stream/complete/error
// frames back in.

use chrono::Utc;
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use querybot_types::{ChatMessage, ClientFrame, ServerFrame, TransportEvent};

use crate::error::TransportError;
use crate::traits::ChatTransport;

const EVENT_CHANNEL_CAPACITY: usize = 64;
const MAX_CONNECT_ATTEMPTS: u32 = 5;
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const BACKOFF_CAP: Duration = Duration::from_secs(10);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Folds inbound WebSocket frames into lifecycle events. Stream frames carry
/// deltas, appended with a separating space; complete frames carry the final
/// text.
#[derive(Debug, Default)]
pub struct WsAccumulator {
    acc: String,
}

impl WsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, frame: ServerFrame) -> TransportEvent {
        match frame {
            ServerFrame::Stream { content } => {
                self.acc.push_str(&content);
                self.acc.push(' ');
                TransportEvent::Partial {
                    content: self.acc.trim().to_string(),
                }
            }
            ServerFrame::Complete { content, sources } => {
                let content = if content.is_empty() {
                    self.acc.trim().to_string()
                } else {
                    content
                };
                TransportEvent::Complete { content, sources }
            }
            ServerFrame::Error { content } => TransportEvent::Error { message: content },
        }
    }
}

pub struct WsTransport {
    /// WebSocket base URL including the /ws prefix; /chat is appended.
    base_url: String,
    connected: Arc<AtomicBool>,
    inflight: Mutex<Option<JoinHandle<()>>>,
}

impl WsTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            connected: Arc::new(AtomicBool::new(false)),
            inflight: Mutex::new(None),
        }
    }

    fn supersede(&self, next: Option<JoinHandle<()>>) {
        let mut inflight = self.inflight.lock().expect("inflight lock poisoned");
        if let Some(prior) = inflight.take() {
            prior.abort();
        }
        *inflight = next;
    }

    /// Exponential backoff: 1s doubling, capped at 10s, up to 5 attempts.
    async fn connect_with_backoff(url: &str) -> Option<WsStream> {
        let mut delay = INITIAL_BACKOFF;

        for attempt in 1..=MAX_CONNECT_ATTEMPTS {
            match connect_async(url).await {
                Ok((ws, _)) => return Some(ws),
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "websocket connect failed");
                }
            }
            if attempt < MAX_CONNECT_ATTEMPTS {
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(BACKOFF_CAP);
            }
        }

        None
    }

    async fn pump(
        url: String,
        query: ClientFrame,
        connected: Arc<AtomicBool>,
        tx: mpsc::Sender<TransportEvent>,
    ) {
        let Some(mut ws) = Self::connect_with_backoff(&url).await else {
            connected.store(false, Ordering::SeqCst);
            let _ = tx
                .send(TransportEvent::Error {
                    message: TransportError::Connect(format!(
                        "websocket unreachable after {} attempts",
                        MAX_CONNECT_ATTEMPTS
                    ))
                    .to_string(),
                })
                .await;
            return;
        };

        connected.store(true, Ordering::SeqCst);

        let outbound = match serde_json::to_string(&query) {
            Ok(json) => json,
            Err(e) => {
                let _ = tx
                    .send(TransportEvent::Error {
                        message: TransportError::Stream(e.to_string()).to_string(),
                    })
                    .await;
                return;
            }
        };

        if let Err(e) = ws.send(WsMessage::Text(outbound)).await {
            connected.store(false, Ordering::SeqCst);
            let _ = tx
                .send(TransportEvent::Error {
                    message: TransportError::Stream(e.to_string()).to_string(),
                })
                .await;
            return;
        }

        let mut accumulator = WsAccumulator::new();
        let mut terminal_sent = false;

        while let Some(message) = ws.next().await {
            let message = match message {
                Ok(message) => message,
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

            let text = match message {
                WsMessage::Text(text) => text,
                WsMessage::Close(_) => break,
                // Ping/pong handled by the library; binary frames are not part
                // of the protocol.
                _ => continue,
            };

            let frame = match serde_json::from_str::<ServerFrame>(&text) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed websocket frame");
                    continue;
                }
            };

            let event = accumulator.apply(frame);
            let is_terminal = event.is_terminal();
            if let TransportEvent::Error { .. } = event {
                connected.store(false, Ordering::SeqCst);
            }
            if tx.send(event).await.is_err() {
                return;
            }
            if is_terminal {
                terminal_sent = true;
                break;
            }
        }

        if !terminal_sent {
            connected.store(false, Ordering::SeqCst);
            let _ = tx
                .send(TransportEvent::Error {
                    message: TransportError::Truncated.to_string(),
                })
                .await;
        }

        let _ = ws.close(None).await;
    }
}

#[async_trait::async_trait]
impl ChatTransport for WsTransport {
    async fn send(
        &self,
        message: &str,
        _history: &[ChatMessage],
    ) -> mpsc::Receiver<TransportEvent> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        // History stays client-side on this transport; the backend keeps its
        // own session state per connection.
        let query = ClientFrame::Query {
            content: message.to_string(),
            timestamp: Utc::now().to_rfc3339(),
        };
        let url = format!("{}/chat", self.base_url);
        let connected = Arc::clone(&self.connected);

        let handle = tokio::spawn(Self::pump(url, query, connected, tx));
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
