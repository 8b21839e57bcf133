//! Blocking queue session over a [`Channel`].

use serde_json::Value;
use std::net::TcpStream;
use tracing::{debug, error, info};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

use super::ClientError;
use super::protocol::{Handshake, InboundMessage, QueueEstimate, Transition};
use crate::util::SessionHash;

/// Bidirectional text transport carrying queue messages.
pub trait Channel {
    /// Send one text frame.
    fn send_text(&mut self, text: String) -> Result<(), ClientError>;

    /// Block until the next text frame arrives.
    fn recv_text(&mut self) -> Result<String, ClientError>;
}

/// [`Channel`] over a blocking WebSocket connection.
pub struct WebSocketChannel {
    socket: WebSocket<MaybeTlsStream<TcpStream>>,
}

impl WebSocketChannel {
    /// Open a connection to `endpoint` (`ws://` or `wss://`).
    pub fn connect(endpoint: &str) -> Result<Self, ClientError> {
        let (socket, response) = tungstenite::connect(endpoint)?;
        debug!(endpoint, status = %response.status(), "websocket connected");
        Ok(Self { socket })
    }
}

impl Channel for WebSocketChannel {
    fn send_text(&mut self, text: String) -> Result<(), ClientError> {
        self.socket.send(Message::Text(text))?;
        Ok(())
    }

    fn recv_text(&mut self) -> Result<String, ClientError> {
        loop {
            match self.socket.read() {
                Ok(Message::Text(text)) => return Ok(text),
                Ok(Message::Binary(bytes)) => {
                    return String::from_utf8(bytes).map_err(|err| {
                        ClientError::MalformedMessage(format!("binary frame is not UTF-8: {err}"))
                    });
                }
                Ok(Message::Close(_)) => return Err(ClientError::ConnectionClosed),
                Ok(_) => continue,
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    return Err(ClientError::ConnectionClosed);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

impl Drop for WebSocketChannel {
    fn drop(&mut self) {
        if self.socket.can_write() {
            let _ = self.socket.close(None);
            let _ = self.socket.flush();
        }
    }
}

/// Drives one invocation over a channel.
pub struct QueueSession<C: Channel> {
    channel: C,
    fn_index: usize,
    session_hash: SessionHash,
}

impl<C: Channel> QueueSession<C> {
    /// Session for `fn_index` identified by `session_hash`.
    pub fn new(channel: C, fn_index: usize, session_hash: SessionHash) -> Self {
        Self {
            channel,
            fn_index,
            session_hash,
        }
    }

    /// Session hash sent to the server.
    pub fn session_hash(&self) -> &SessionHash {
        &self.session_hash
    }

    /// Run the exchange to completion, submitting `data`.
    ///
    /// Returns `Ok(None)` if the server does not open by asking for the
    /// session hash; nothing is sent in that case.
    pub fn run(
        mut self,
        data: Value,
        mut on_progress: impl FnMut(&QueueEstimate),
    ) -> Result<Option<Value>, ClientError> {
        let mut handshake = Handshake::new(self.session_hash.as_str(), self.fn_index, data);
        loop {
            let text = self.channel.recv_text()?;
            let message = InboundMessage::parse(&text)?;
            debug!(tag = message.tag(), state = ?handshake.state(), "queue message");

            match handshake.advance(message) {
                Transition::Send(outbound) => {
                    self.channel.send_text(serde_json::to_string(&outbound)?)?;
                }
                Transition::Progress(estimate) => {
                    info!(
                        fn_index = self.fn_index,
                        rank = ?estimate.rank,
                        queue_size = ?estimate.queue_size,
                        "waiting in queue"
                    );
                    on_progress(&estimate);
                }
                Transition::Wait => {}
                Transition::Complete(output) => return Ok(Some(output)),
                Transition::Violation(tag) => {
                    error!(%tag, session_hash = %self.session_hash, "expected send_hash as the first message");
                    return Ok(None);
                }
                Transition::QueueFull => return Err(ClientError::QueueFull),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct Scripted {
        inbound: VecDeque<String>,
        sent: Vec<String>,
    }

    impl Scripted {
        fn new(messages: &[Value]) -> Self {
            Self {
                inbound: messages.iter().map(Value::to_string).collect(),
                sent: Vec::new(),
            }
        }
    }

    impl Channel for &mut Scripted {
        fn send_text(&mut self, text: String) -> Result<(), ClientError> {
            self.sent.push(text);
            Ok(())
        }

        fn recv_text(&mut self) -> Result<String, ClientError> {
            self.inbound.pop_front().ok_or(ClientError::ConnectionClosed)
        }
    }

    #[test]
    fn sends_join_then_data() {
        let mut channel = Scripted::new(&[
            json!({"msg": "send_hash"}),
            json!({"msg": "estimation", "rank": 0}),
            json!({"msg": "send_data"}),
            json!({"msg": "process_starts"}),
            json!({"msg": "process_completed", "output": {"data": [42]}}),
        ]);
        let mut ranks = Vec::new();
        let session = QueueSession::new(&mut channel, 3, SessionHash::new("h"));
        assert_eq!(session.session_hash().as_str(), "h");
        let output = session
            .run(json!([1]), |estimate| ranks.push(estimate.rank))
            .unwrap();

        assert_eq!(output, Some(json!({"data": [42]})));
        assert_eq!(ranks, vec![Some(0)]);
        assert_eq!(
            channel.sent,
            vec![
                r#"{"session_hash":"h","fn_index":3}"#.to_string(),
                r#"{"fn_index":3,"data":[1],"session_hash":"h"}"#.to_string(),
            ]
        );
    }

    #[test]
    fn early_close_is_an_error() {
        let mut channel = Scripted::new(&[json!({"msg": "send_hash"})]);
        let result = QueueSession::new(&mut channel, 0, SessionHash::new("h")).run(json!([]), |_| {});
        assert!(matches!(result, Err(ClientError::ConnectionClosed)));
    }
}
