use hfspaces::client::{Channel, ClientError, QueueEstimate, QueueSession};
use hfspaces::util::SessionHash;
use serde_json::{Value, json};
use std::collections::VecDeque;

/// Channel replaying a fixed list of server frames and recording what the
/// client sends.
struct MockChannel {
    inbound: VecDeque<String>,
    outbound: Vec<Value>,
}

impl MockChannel {
    fn new(frames: Vec<Value>) -> Self {
        Self {
            inbound: frames.into_iter().map(|frame| frame.to_string()).collect(),
            outbound: Vec::new(),
        }
    }
}

impl Channel for &mut MockChannel {
    fn send_text(&mut self, text: String) -> Result<(), ClientError> {
        self.outbound.push(serde_json::from_str(&text)?);
        Ok(())
    }

    fn recv_text(&mut self) -> Result<String, ClientError> {
        self.inbound.pop_front().ok_or(ClientError::ConnectionClosed)
    }
}

fn run(channel: &mut MockChannel, fn_index: usize, data: Value) -> (Result<Option<Value>, ClientError>, Vec<QueueEstimate>) {
    let mut estimates = Vec::new();
    let result = QueueSession::new(channel, fn_index, SessionHash::new("abcdefghijk"))
        .run(data, |estimate| estimates.push(estimate.clone()));
    (result, estimates)
}

#[test]
fn handshake_sends_two_messages_and_returns_the_output() {
    let mut channel = MockChannel::new(vec![
        json!({"msg": "send_hash"}),
        json!({"msg": "estimation", "rank": 3, "queue_size": 4, "rank_eta": 12.5}),
        json!({"msg": "send_data"}),
        json!({"msg": "process_completed", "output": [42], "success": true}),
    ]);

    let (result, estimates) = run(&mut channel, 0, json!(["Ada"]));

    assert_eq!(result.unwrap(), Some(json!([42])));
    assert_eq!(estimates.len(), 1);
    assert_eq!(estimates[0].rank, Some(3));
    assert_eq!(
        channel.outbound,
        vec![
            json!({"session_hash": "abcdefghijk", "fn_index": 0}),
            json!({"fn_index": 0, "data": ["Ada"], "session_hash": "abcdefghijk"}),
        ]
    );
}

#[test]
fn unexpected_first_message_sends_nothing() {
    let mut channel = MockChannel::new(vec![
        json!({"msg": "process_completed", "output": [1]}),
        json!({"msg": "send_hash"}),
    ]);

    let (result, estimates) = run(&mut channel, 2, json!([]));

    assert_eq!(result.unwrap(), None);
    assert!(estimates.is_empty());
    assert!(channel.outbound.is_empty());
}

#[test]
fn status_messages_are_ignored_while_processing() {
    let mut channel = MockChannel::new(vec![
        json!({"msg": "send_hash"}),
        json!({"msg": "send_data"}),
        json!({"msg": "process_starts"}),
        json!({"msg": "estimation", "rank": 0}),
        json!({"msg": "process_generating", "output": {"data": ["partial"]}}),
        json!({"msg": "process_completed", "output": {"data": ["done"]}}),
    ]);

    let (result, estimates) = run(&mut channel, 1, json!([1, 2]));

    assert_eq!(result.unwrap(), Some(json!({"data": ["done"]})));
    assert!(estimates.is_empty());
    assert_eq!(channel.outbound.len(), 2);
}

#[test]
fn queue_full_is_an_error() {
    let mut channel = MockChannel::new(vec![
        json!({"msg": "send_hash"}),
        json!({"msg": "queue_full"}),
    ]);

    let (result, _) = run(&mut channel, 0, json!([]));

    assert!(matches!(result, Err(ClientError::QueueFull)));
    assert_eq!(channel.outbound.len(), 1);
}

#[test]
fn non_json_frames_are_errors() {
    let mut channel = MockChannel::new(Vec::new());
    channel.inbound.push_back("<html>502</html>".to_string());

    let (result, _) = run(&mut channel, 0, json!([]));

    assert!(matches!(result, Err(ClientError::Json(_))));
}

#[test]
fn missing_completion_is_a_closed_connection() {
    let mut channel = MockChannel::new(vec![json!({"msg": "send_hash"}), json!({"msg": "send_data"})]);

    let (result, _) = run(&mut channel, 0, json!([]));

    assert!(matches!(result, Err(ClientError::ConnectionClosed)));
}
