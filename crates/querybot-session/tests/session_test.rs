use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use querybot_session::{ChatSession, Conversation, UploadCoordinator};
use querybot_transport::{BackendApi, ChatTransport, DocumentUploader};
use querybot_types::{ChatMessage, Role, Source, TransportEvent};

/// Transport that replays one scripted event sequence per send.
struct ScriptedTransport {
    scripts: Mutex<Vec<Vec<TransportEvent>>>,
    connected: AtomicBool,
}

impl ScriptedTransport {
    fn new(scripts: Vec<Vec<TransportEvent>>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts),
            connected: AtomicBool::new(true),
        })
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn send(
        &self,
        _message: &str,
        _history: &[ChatMessage],
    ) -> mpsc::Receiver<TransportEvent> {
        let events = {
            let mut scripts = self.scripts.lock().unwrap();
            if scripts.is_empty() {
                Vec::new()
            } else {
                scripts.remove(0)
            }
        };

        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            for event in events {
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });
        rx
    }

    fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

fn session_with(scripts: Vec<Vec<TransportEvent>>) -> ChatSession {
    let transport = ScriptedTransport::new(scripts);
    let api = BackendApi::new("http://localhost:8000").unwrap();
    ChatSession::with_transport(transport, api)
}

fn partial(content: &str) -> TransportEvent {
    TransportEvent::Partial { content: content.to_string() }
}

#[tokio::test]
async fn test_streaming_turn_converges_to_final_text() {
    let mut session = session_with(vec![vec![
        partial("Hi"),
        partial("Hi there"),
        TransportEvent::Complete { content: "Hi there!".to_string(), sources: vec![] },
    ]]);

    session.send_message("hello").await.unwrap();

    let messages = session.conversation().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].content, "hello");
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].content, "Hi there!");
    assert!(!messages[1].is_streaming());
    assert!(!session.conversation().is_loading());
    assert!(session.conversation().error().is_none());
}

#[tokio::test]
async fn test_status_events_do_not_touch_the_log() {
    let mut session = session_with(vec![vec![
        TransportEvent::Status { content: "retrieving documents".to_string() },
        TransportEvent::Complete { content: "answer".to_string(), sources: vec![] },
    ]]);

    session.send_message("question").await.unwrap();

    assert_eq!(session.conversation().messages().len(), 2);
}

#[tokio::test]
async fn test_error_mid_stream_preserves_partial() {
    let mut session = session_with(vec![vec![
        partial("partial answer"),
        TransportEvent::Error { message: "connection reset".to_string() },
    ]]);

    session.send_message("hello").await.unwrap();

    let messages = session.conversation().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content, "partial answer");
    assert!(!session.conversation().is_loading());
    assert!(!session.conversation().is_connected());
    assert_eq!(session.conversation().error(), Some("connection reset"));
}

#[tokio::test]
async fn test_completion_carries_sources() {
    let sources = vec![Source {
        title: "handbook.pdf".to_string(),
        excerpt: "relevant passage".to_string(),
        similarity: 0.92,
    }];
    let mut session = session_with(vec![vec![TransportEvent::Complete {
        content: "cited answer".to_string(),
        sources: sources.clone(),
    }]]);

    session.send_message("cite me").await.unwrap();

    let assistant = &session.conversation().messages()[1];
    assert_eq!(assistant.sources(), sources.as_slice());
}

#[tokio::test]
async fn test_empty_send_is_a_noop() {
    let mut session = session_with(vec![]);

    session.send_message("   ").await.unwrap();

    assert!(session.conversation().messages().is_empty());
    assert!(!session.conversation().is_loading());
}

#[tokio::test]
async fn test_stream_closing_without_terminal_stops_loading() {
    // Script ends after one partial; the channel closes with no terminal.
    let mut session = session_with(vec![vec![partial("half an answer")]]);

    session.send_message("hello").await.unwrap();

    assert!(!session.conversation().is_loading());
    assert_eq!(session.conversation().messages()[1].content, "half an answer");
}

#[tokio::test]
async fn test_next_turn_after_error_is_clean() {
    let mut session = session_with(vec![
        vec![TransportEvent::Error { message: "boom".to_string() }],
        vec![TransportEvent::Complete { content: "recovered".to_string(), sources: vec![] }],
    ]);

    session.send_message("first").await.unwrap();
    assert!(session.conversation().error().is_some());

    session.send_message("second").await.unwrap();

    // begin_turn cleared the stale error; new turn completed normally.
    assert!(session.conversation().error().is_none());
    let messages = session.conversation().messages();
    assert_eq!(messages.last().unwrap().content, "recovered");
}

#[tokio::test]
async fn test_two_turns_get_distinct_assistant_messages() {
    let mut session = session_with(vec![
        vec![TransportEvent::Complete { content: "one".to_string(), sources: vec![] }],
        vec![TransportEvent::Complete { content: "two".to_string(), sources: vec![] }],
    ]);

    session.send_message("a").await.unwrap();
    session.send_message("b").await.unwrap();

    let messages = session.conversation().messages();
    assert_eq!(messages.len(), 4);
    assert_ne!(messages[1].id, messages[3].id);
}

// --- upload wiring -------------------------------------------------------

struct StubUploader {
    fail_for: Vec<String>,
}

#[async_trait]
impl DocumentUploader for StubUploader {
    async fn upload(
        &self,
        file_name: &str,
        _mime: &str,
        _bytes: Vec<u8>,
    ) -> anyhow::Result<serde_json::Value> {
        if self.fail_for.iter().any(|n| n == file_name) {
            anyhow::bail!("Upload failed: Internal Server Error");
        }
        Ok(serde_json::json!({"status": "ok"}))
    }
}

#[tokio::test]
async fn test_upload_batch_maps_to_conversation_messages() {
    let (mut coordinator, mut events) = UploadCoordinator::new();
    let mut conversation = Conversation::new();

    coordinator.stage("good.pdf", "application/pdf", vec![1, 2]);
    coordinator.stage("bad.pdf", "application/pdf", vec![3]);

    let uploader = StubUploader { fail_for: vec!["bad.pdf".to_string()] };
    let results = coordinator.upload_all(&uploader).await;
    assert_eq!(results.len(), 2);

    while let Ok(event) = events.try_recv() {
        conversation.apply_upload_event(event);
    }

    // One user file bubble plus one outcome notice per file.
    let messages = conversation.messages();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0].content, "Uploaded file: good.pdf");
    assert!(messages[1].content.contains("uploaded and processed successfully"));
    assert_eq!(messages[2].content, "Uploaded file: bad.pdf");
    assert!(messages[3].content.contains("Failed to upload \"bad.pdf\""));
    assert!(messages[3].metadata.as_ref().unwrap().is_error);

    assert!(!coordinator.is_uploading());
    assert!(coordinator.staged().is_empty());
    assert!(coordinator.upload_error().is_some());
    // A failed upload never touches the chat error slot.
    assert!(conversation.error().is_none());
}
