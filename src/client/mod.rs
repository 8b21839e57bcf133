//! Queue client for invoking functions of a running Space.
//!
//! An invocation is a short message exchange over a fresh WebSocket: the
//! server asks for a session hash, reports queue progress, asks for the
//! payload and finally delivers the output. [`protocol`] holds the wire
//! messages and the transition function, [`session`] drives them over a
//! [`session::Channel`].

/// Wire messages and the handshake state machine.
pub mod protocol;
/// Transport abstraction and the blocking session driver.
pub mod session;

pub use protocol::{Handshake, HandshakeState, InboundMessage, OutboundMessage, QueueEstimate, Transition};
pub use session::{Channel, QueueSession, WebSocketChannel};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::space::ApplicationModel;
use crate::util::SessionHash;

/// Errors produced while invoking a remote function.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure on the WebSocket.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    /// A frame was not valid JSON, or a message failed to serialise.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// The server closed the connection before delivering an output.
    #[error("connection closed before the process completed")]
    ConnectionClosed,
    /// The server rejected the request because its queue is full.
    #[error("the remote queue is full")]
    QueueFull,
    /// The model has no function at the requested index.
    #[error("no function with index {fn_index} (the model has {available})")]
    UnknownFunction {
        /// Requested index.
        fn_index: usize,
        /// Number of functions in the model.
        available: usize,
    },
    /// A frame was JSON but not a queue message.
    #[error("malformed message: {0}")]
    MalformedMessage(String),
}

/// Invoke function `fn_index` of the modelled Space with `data`.
///
/// `data` is the positional payload, typically a JSON array with one entry
/// per input of the function's schema. Returns `Ok(None)` when the server
/// opens with something other than a session hash request.
pub fn invoke(
    model: &ApplicationModel,
    fn_index: usize,
    data: Value,
) -> Result<Option<Value>, ClientError> {
    invoke_with_progress(model, fn_index, data, |_| {})
}

/// [`invoke`], reporting each queue estimate to `on_progress`.
pub fn invoke_with_progress(
    model: &ApplicationModel,
    fn_index: usize,
    data: Value,
    on_progress: impl FnMut(&QueueEstimate),
) -> Result<Option<Value>, ClientError> {
    let schema = model
        .schema(fn_index)
        .ok_or(ClientError::UnknownFunction {
            fn_index,
            available: model.schemas().len(),
        })?;
    if let Value::Array(items) = &data {
        if items.len() != schema.arity() {
            warn!(
                fn_index,
                expected = schema.arity(),
                given = items.len(),
                "payload length differs from the discovered schema"
            );
        }
    }

    info!(endpoint = model.endpoint(), fn_index, "invoking remote function");
    let channel = WebSocketChannel::connect(model.endpoint())?;
    let session = QueueSession::new(channel, fn_index, SessionHash::generate());
    debug!(session_hash = %session.session_hash(), "joining queue");
    session.run(data, on_progress)
}
