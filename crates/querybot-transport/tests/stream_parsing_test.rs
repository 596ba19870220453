use querybot_transport::sse::SseAccumulator;
use querybot_transport::LineBuffer;
use querybot_types::{StreamFrame, TransportEvent};

/// Feed raw network chunks through the line buffer and accumulator the same
/// way the SSE pump does, collecting the resulting events.
fn replay(chunks: &[&[u8]]) -> Vec<TransportEvent> {
    let mut buffer = LineBuffer::with_capacity(256);
    let mut accumulator = SseAccumulator::new();
    let mut events = Vec::new();

    'outer: for chunk in chunks {
        buffer.extend(chunk);
        while let Some(line) = buffer.next_line() {
            let line = line.expect("test input is valid UTF-8");
            if line.is_empty() {
                continue;
            }
            let Some(data) = line.strip_prefix("data: ") else {
                continue;
            };
            if data == "[DONE]" {
                break 'outer;
            }
            let Ok(frame) = serde_json::from_str::<StreamFrame>(data) else {
                continue; // malformed frames are skipped
            };
            let event = accumulator.apply(frame);
            let terminal = event.is_terminal();
            events.push(event);
            if terminal {
                break 'outer;
            }
        }
    }

    events
}

#[test]
fn test_full_turn_over_chunked_stream() {
    let events = replay(&[
        b"data: {\"type\":\"status\",\"content\":\"retrieving\",\"timestamp\":\"t\"}\n",
        b"data: {\"type\":\"stream\",\"content\":\"Hi\",\"timestamp\":\"t\"}\ndata: {\"type\":\"str",
        b"eam\",\"content\":\"there\",\"timestamp\":\"t\"}\n",
        b"data: {\"type\":\"complete\",\"content\":\"Hi there!\",\"timestamp\":\"t\"}\n",
        b"data: [DONE]\n",
    ]);

    assert_eq!(
        events,
        vec![
            TransportEvent::Status { content: "retrieving".into() },
            TransportEvent::Partial { content: "Hi".into() },
            TransportEvent::Partial { content: "Hi there".into() },
            TransportEvent::Complete { content: "Hi there!".into(), sources: vec![] },
        ]
    );
}

#[test]
fn test_malformed_frame_does_not_kill_the_turn() {
    let events = replay(&[
        b"data: {\"type\":\"stream\",\"content\":\"Hello\"}\n",
        b"data: {not json at all\n",
        b"data: {\"type\":\"complete\",\"content\":\"Hello world\"}\n",
    ]);

    assert_eq!(events.len(), 2);
    assert_eq!(
        events[1],
        TransportEvent::Complete { content: "Hello world".into(), sources: vec![] }
    );
}

#[test]
fn test_non_data_lines_are_ignored() {
    let events = replay(&[
        b": keepalive comment\n",
        b"event: message\n",
        b"data: {\"type\":\"complete\",\"content\":\"done\"}\n",
    ]);

    assert_eq!(events.len(), 1);
}

#[test]
fn test_accumulated_override_beats_deltas() {
    let events = replay(&[
        b"data: {\"type\":\"stream\",\"content\":\"wrong\"}\n",
        b"data: {\"type\":\"stream\",\"content\":\"x\",\"accumulated\":\"Corrected text\"}\n",
        b"data: {\"type\":\"complete\",\"content\":\"\"}\n",
    ]);

    assert_eq!(
        events.last().unwrap(),
        &TransportEvent::Complete { content: "Corrected text".into(), sources: vec![] }
    );
}

#[test]
fn test_terminal_event_is_last() {
    // Frames after an error must never surface.
    let events = replay(&[
        b"data: {\"type\":\"error\",\"content\":\"backend exploded\"}\n",
        b"data: {\"type\":\"stream\",\"content\":\"ghost\"}\n",
    ]);

    assert_eq!(events.len(), 1);
    assert_eq!(events[0], TransportEvent::Error { message: "backend exploded".into() });
}
