//! Queue wire format.
//!
//! Inbound frames are dispatched on their `msg` tag. [`Handshake::advance`]
//! maps each one to the next [`Transition`] without doing any I/O.

use serde::Serialize;
use serde_json::Value;

use super::ClientError;

/// Queue position report sent while a request waits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueEstimate {
    /// Zero-based position in the queue.
    pub rank: Option<u64>,
    /// Total queue length.
    pub queue_size: Option<u64>,
    /// Estimated seconds until processing starts.
    pub rank_eta: Option<f64>,
}

/// Messages the server sends, keyed by their `msg` tag.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// `send_hash`: the server wants the session hash.
    SendHash,
    /// `estimation`: queue progress.
    Estimation(QueueEstimate),
    /// `send_data`: the server wants the payload.
    SendData,
    /// `process_completed`: the function finished.
    ProcessCompleted {
        /// Function output, `null` when absent.
        output: Value,
        /// Reported success flag.
        success: Option<bool>,
    },
    /// `queue_full`: the request was rejected.
    QueueFull,
    /// Any other tag, such as `process_starts` or `heartbeat`.
    Status(String),
}

impl InboundMessage {
    /// Decode one text frame.
    pub fn parse(text: &str) -> Result<Self, ClientError> {
        let value: Value = serde_json::from_str(text)?;
        let tag = value
            .get("msg")
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::MalformedMessage(format!("missing msg tag in {text}")))?;

        Ok(match tag {
            "send_hash" => InboundMessage::SendHash,
            "send_data" => InboundMessage::SendData,
            "queue_full" => InboundMessage::QueueFull,
            "estimation" => InboundMessage::Estimation(QueueEstimate {
                rank: value.get("rank").and_then(Value::as_u64),
                queue_size: value.get("queue_size").and_then(Value::as_u64),
                rank_eta: value.get("rank_eta").and_then(Value::as_f64),
            }),
            "process_completed" => InboundMessage::ProcessCompleted {
                output: value.get("output").cloned().unwrap_or(Value::Null),
                success: value.get("success").and_then(Value::as_bool),
            },
            other => InboundMessage::Status(other.to_string()),
        })
    }

    /// The `msg` tag this message was decoded from.
    pub fn tag(&self) -> &str {
        match self {
            InboundMessage::SendHash => "send_hash",
            InboundMessage::Estimation(_) => "estimation",
            InboundMessage::SendData => "send_data",
            InboundMessage::ProcessCompleted { .. } => "process_completed",
            InboundMessage::QueueFull => "queue_full",
            InboundMessage::Status(tag) => tag,
        }
    }
}

/// Messages the client sends.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutboundMessage {
    /// Answer to `send_hash`.
    Join {
        /// Session hash of this invocation.
        session_hash: String,
        /// Function being invoked.
        fn_index: usize,
    },
    /// Answer to `send_data`.
    Data {
        /// Function being invoked.
        fn_index: usize,
        /// Positional payload.
        data: Value,
        /// Session hash of this invocation.
        session_hash: String,
    },
}

/// Where an invocation stands in the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// Waiting for the first message, which must be `send_hash`.
    AwaitHashRequest,
    /// Joined the queue; waiting for `send_data`.
    AwaitSendData,
    /// Payload sent; waiting for `process_completed`.
    AwaitCompletion,
    /// Output received.
    Completed,
}

/// What the driver should do after a message.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Send this message and keep reading.
    Send(OutboundMessage),
    /// Report queue progress and keep reading.
    Progress(QueueEstimate),
    /// Keep reading.
    Wait,
    /// The exchange finished with this output.
    Complete(Value),
    /// The server opened with an unexpected tag.
    Violation(String),
    /// The server rejected the request.
    QueueFull,
}

/// Client side of the queue exchange for one invocation.
#[derive(Debug, Clone)]
pub struct Handshake {
    state: HandshakeState,
    session_hash: String,
    fn_index: usize,
    data: Option<Value>,
}

impl Handshake {
    /// Exchange that will submit `data` to `fn_index`.
    pub fn new(session_hash: impl Into<String>, fn_index: usize, data: Value) -> Self {
        Self {
            state: HandshakeState::AwaitHashRequest,
            session_hash: session_hash.into(),
            fn_index,
            data: Some(data),
        }
    }

    /// Current state.
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Feed one inbound message.
    pub fn advance(&mut self, message: InboundMessage) -> Transition {
        match (self.state, message) {
            (HandshakeState::AwaitHashRequest, InboundMessage::SendHash) => {
                self.state = HandshakeState::AwaitSendData;
                Transition::Send(OutboundMessage::Join {
                    session_hash: self.session_hash.clone(),
                    fn_index: self.fn_index,
                })
            }
            (HandshakeState::AwaitHashRequest, other) => Transition::Violation(other.tag().to_string()),
            (_, InboundMessage::QueueFull) => Transition::QueueFull,
            (HandshakeState::AwaitSendData, InboundMessage::Estimation(estimate)) => {
                Transition::Progress(estimate)
            }
            (HandshakeState::AwaitSendData, InboundMessage::SendData) => {
                self.state = HandshakeState::AwaitCompletion;
                Transition::Send(OutboundMessage::Data {
                    fn_index: self.fn_index,
                    data: self.data.take().unwrap_or(Value::Null),
                    session_hash: self.session_hash.clone(),
                })
            }
            (HandshakeState::AwaitCompletion, InboundMessage::ProcessCompleted { output, .. }) => {
                self.state = HandshakeState::Completed;
                Transition::Complete(output)
            }
            _ => Transition::Wait,
        }
    }
}
