use hfspaces::analyzer::{ComponentDescriptor, InvocationSchema};
use hfspaces::client::{self, ClientError};
use hfspaces::ApplicationModel;
use serde_json::{Value, json};
use std::net::{TcpListener, TcpStream};
use std::thread;
use tungstenite::{Message, WebSocket};

/// Serve one queue exchange on a local port and return what the client sent.
fn spawn_queue_server(frames_before_data: Vec<Value>, completion: Value) -> (String, thread::JoinHandle<Vec<Value>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let endpoint = format!("ws://{}/queue/join", listener.local_addr().unwrap());

    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut socket = tungstenite::accept(stream).unwrap();
        let mut received = Vec::new();

        socket
            .send(Message::Text(json!({"msg": "send_hash"}).to_string()))
            .unwrap();
        received.push(read_json(&mut socket));

        for frame in frames_before_data {
            socket.send(Message::Text(frame.to_string())).unwrap();
        }
        socket
            .send(Message::Text(json!({"msg": "send_data"}).to_string()))
            .unwrap();
        received.push(read_json(&mut socket));

        socket
            .send(Message::Text(json!({"msg": "process_starts"}).to_string()))
            .unwrap();
        socket.send(Message::Text(completion.to_string())).unwrap();

        // Drain until the client hangs up.
        while socket.read().is_ok() {}
        received
    });

    (endpoint, handle)
}

fn read_json(socket: &mut WebSocket<TcpStream>) -> Value {
    loop {
        if let Message::Text(text) = socket.read().unwrap() {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

fn model(endpoint: String) -> ApplicationModel {
    ApplicationModel::from_parts(
        "local",
        "echo",
        endpoint,
        vec![InvocationSchema {
            fn_index: 0,
            trigger: "btn.click".to_string(),
            inputs: vec![ComponentDescriptor::of_type("Textbox")],
        }],
    )
}

#[test]
fn invocation_over_a_real_websocket() {
    let (endpoint, server) = spawn_queue_server(
        vec![json!({"msg": "estimation", "rank": 1, "queue_size": 2})],
        json!({"msg": "process_completed", "output": {"data": ["HELLO"]}, "success": true}),
    );

    let mut ranks = Vec::new();
    let output = client::invoke_with_progress(&model(endpoint), 0, json!(["hello"]), |estimate| {
        ranks.push(estimate.rank)
    })
    .unwrap();

    assert_eq!(output, Some(json!({"data": ["HELLO"]})));
    assert_eq!(ranks, vec![Some(1)]);

    let received = server.join().unwrap();
    assert_eq!(received.len(), 2);
    assert_eq!(received[0]["fn_index"], json!(0));
    let session_hash = received[0]["session_hash"].as_str().unwrap().to_string();
    assert_eq!(session_hash.len(), 11);
    assert_eq!(
        received[1],
        json!({"fn_index": 0, "data": ["hello"], "session_hash": session_hash})
    );
}

#[test]
fn unknown_function_index_is_rejected_before_connecting() {
    let model = model("ws://127.0.0.1:9/queue/join".to_string());
    let result = client::invoke(&model, 5, json!([]));
    assert!(matches!(
        result,
        Err(ClientError::UnknownFunction {
            fn_index: 5,
            available: 1
        })
    ));
}

#[test]
fn refused_connection_is_a_websocket_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let endpoint = format!("ws://{}/queue/join", listener.local_addr().unwrap());
    drop(listener);

    let result = client::invoke(&model(endpoint), 0, json!(["x"]));
    assert!(matches!(result, Err(ClientError::WebSocket(_))));
}
