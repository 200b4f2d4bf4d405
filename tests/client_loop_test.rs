//! Integration tests driving the session client against an in-process
//! WebSocket server.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{WebSocketStream, accept_async, tungstenite::protocol::Message};

use worklink::config::Config;
use worklink::protocol::types::ApprovalDecision;
use worklink::session::{ClientAction, ClientEvent, SessionClient};
use worklink::workspace::StateChange;

async fn recv_json(ws: &mut WebSocketStream<TcpStream>) -> Value {
    loop {
        match ws
            .next()
            .await
            .expect("connection ended")
            .expect("frame error")
        {
            Message::Text(text) => return serde_json::from_str(&text).expect("invalid JSON"),
            Message::Ping(data) => ws.send(Message::Pong(data)).await.unwrap(),
            _ => {}
        }
    }
}

async fn send_json(ws: &mut WebSocketStream<TcpStream>, value: Value) {
    ws.send(Message::Text(value.to_string())).await.unwrap();
}

/// Read the join handshake every fresh connection must open with:
/// `join_session` followed by a listing request.
async fn expect_handshake(ws: &mut WebSocketStream<TcpStream>) -> Value {
    let join = recv_json(ws).await;
    assert_eq!(join["type"], "join_session");

    let list = recv_json(ws).await;
    assert_eq!(list["type"], "file_operation");
    assert_eq!(list["data"]["operation"], "list");
    list
}

fn test_config(addr: std::net::SocketAddr) -> Config {
    let mut config = Config::default();
    config.server.ws_url = format!("ws://{}", addr);
    config.server.reconnect_interval_ms = 100;
    config.workspace_root = "/".to_string();
    config
}

async fn wait_for_event(
    events: &mut mpsc::UnboundedReceiver<ClientEvent>,
    pred: impl Fn(&ClientEvent) -> bool,
) -> ClientEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = events.recv().await.expect("event channel closed");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

#[tokio::test]
async fn test_join_handshake_and_chat_roundtrip() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();

        let list = expect_handshake(&mut ws).await;
        assert_eq!(list["data"]["path"], "/");

        send_json(
            &mut ws,
            json!({"type": "session_joined", "data": {"session_id": "s-1"}}),
        )
        .await;

        // A whitespace-only chat must never reach the wire; the first chat
        // frame we see is the real one.
        let chat = recv_json(&mut ws).await;
        assert_eq!(chat["type"], "chat");
        assert_eq!(chat["data"]["message"], "hello");

        send_json(
            &mut ws,
            json!({"type": "user_message", "data": {"message": "hello"}}),
        )
        .await;
        send_json(
            &mut ws,
            json!({"type": "ai_response", "data": {"message": "hi there"}}),
        )
        .await;

        // Hold the connection until the client quits.
        while ws.next().await.is_some() {}
    });

    let mut client = SessionClient::new(test_config(addr));
    let actions = client.action_sender();
    let mut events = client.event_receiver().unwrap();

    let client_task = tokio::spawn(async move {
        client.run().await.unwrap();
        client
    });

    wait_for_event(&mut events, |e| {
        matches!(
            e,
            ClientEvent::StateChanged {
                change: StateChange::SessionJoined { .. }
            }
        )
    })
    .await;

    // Rejected locally, never sent.
    actions
        .send(ClientAction::SendChat {
            text: "   ".to_string(),
        })
        .unwrap();
    actions
        .send(ClientAction::SendChat {
            text: "hello".to_string(),
        })
        .unwrap();

    wait_for_event(&mut events, |e| {
        matches!(e, ClientEvent::ActionRejected { .. })
    })
    .await;

    // Both transcript entries come back from the server.
    let mut roles = Vec::new();
    for _ in 0..2 {
        if let ClientEvent::StateChanged {
            change: StateChange::TranscriptAppended { entry },
        } = wait_for_event(&mut events, |e| {
            matches!(
                e,
                ClientEvent::StateChanged {
                    change: StateChange::TranscriptAppended { .. }
                }
            )
        })
        .await
        {
            roles.push(entry.text.clone());
        }
    }
    assert_eq!(roles, vec!["hello", "hi there"]);

    actions.send(ClientAction::Quit).unwrap();
    let client = client_task.await.unwrap();
    server.await.unwrap();

    assert_eq!(client.state().transcript().len(), 2);
    // Session identity does not survive shutdown.
    assert!(client.state().session_id().is_none());
}

#[tokio::test]
async fn test_reconnect_issues_fresh_join_and_relists() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        // First connection: join, then drop from the server side.
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        expect_handshake(&mut ws).await;
        send_json(
            &mut ws,
            json!({"type": "session_joined", "data": {"session_id": "s-1"}}),
        )
        .await;
        ws.close(None).await.unwrap();
        drop(ws);

        // Second connection: a new join handshake must arrive, with the
        // same directory re-requested.
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        let list = expect_handshake(&mut ws).await;
        assert_eq!(list["data"]["path"], "/");
        send_json(
            &mut ws,
            json!({"type": "session_joined", "data": {"session_id": "s-2"}}),
        )
        .await;

        while ws.next().await.is_some() {}
    });

    let mut client = SessionClient::new(test_config(addr));
    let actions = client.action_sender();
    let mut events = client.event_receiver().unwrap();

    let client_task = tokio::spawn(async move {
        client.run().await.unwrap();
        client
    });

    let first = wait_for_event(&mut events, |e| {
        matches!(
            e,
            ClientEvent::StateChanged {
                change: StateChange::SessionJoined { .. }
            }
        )
    })
    .await;
    let second = wait_for_event(&mut events, |e| {
        matches!(
            e,
            ClientEvent::StateChanged {
                change: StateChange::SessionJoined { .. }
            }
        )
    })
    .await;

    let id = |event: &ClientEvent| match event {
        ClientEvent::StateChanged {
            change: StateChange::SessionJoined { session_id },
        } => session_id.clone(),
        _ => unreachable!(),
    };
    assert_eq!(id(&first), "s-1");
    assert_eq!(id(&second), "s-2");

    actions.send(ClientAction::Quit).unwrap();
    client_task.await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn test_quit_during_reconnect_delay_stops_retrying() {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let reconnects = Arc::new(AtomicUsize::new(0));
    let reconnects_seen = reconnects.clone();

    tokio::spawn(async move {
        // First connection: join, then drop from the server side so the
        // client enters its retry delay.
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        expect_handshake(&mut ws).await;
        ws.close(None).await.unwrap();
        drop(ws);

        // Any further accept is a leaked reconnect attempt.
        while listener.accept().await.is_ok() {
            reconnects_seen.fetch_add(1, Ordering::SeqCst);
        }
    });

    let mut config = test_config(addr);
    config.server.reconnect_interval_ms = 500;

    let mut client = SessionClient::new(config);
    let actions = client.action_sender();
    let mut events = client.event_receiver().unwrap();

    let client_task = tokio::spawn(async move {
        client.run().await.unwrap();
    });

    // Wait until the drop is observed, then quit inside the retry delay.
    wait_for_event(&mut events, |e| {
        matches!(
            e,
            ClientEvent::StatusChanged {
                status: worklink::protocol::types::ConnectionStatus::Disconnected
            }
        )
    })
    .await;
    actions.send(ClientAction::Quit).unwrap();

    // The quit must cancel the retry timer, not wait it out.
    tokio::time::timeout(Duration::from_millis(300), client_task)
        .await
        .expect("client did not stop during the retry delay")
        .unwrap();

    // Give a leaked timer time to fire; no new connection may arrive.
    tokio::time::sleep(Duration::from_millis(700)).await;
    assert_eq!(reconnects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_approval_flow_end_to_end() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        expect_handshake(&mut ws).await;
        send_json(
            &mut ws,
            json!({"type": "session_joined", "data": {"session_id": "s-1"}}),
        )
        .await;

        // The client asks to run a command; approval comes back.
        let command = recv_json(&mut ws).await;
        assert_eq!(command["type"], "command");
        assert_eq!(command["data"]["command"], "ls /tmp");

        send_json(
            &mut ws,
            json!({"type": "command_approval_required",
                   "data": {"command": "ls /tmp", "command_id": "c1"}}),
        )
        .await;

        let resolution = recv_json(&mut ws).await;
        assert_eq!(resolution["type"], "approval_response");
        assert_eq!(resolution["data"]["command_id"], "c1");
        assert_eq!(resolution["data"]["decision"], "approve");
        assert!(resolution["data"].get("modified_command").is_none());

        while ws.next().await.is_some() {}
    });

    let mut client = SessionClient::new(test_config(addr));
    let actions = client.action_sender();
    let mut events = client.event_receiver().unwrap();

    let client_task = tokio::spawn(async move {
        client.run().await.unwrap();
        client
    });

    wait_for_event(&mut events, |e| {
        matches!(
            e,
            ClientEvent::StateChanged {
                change: StateChange::SessionJoined { .. }
            }
        )
    })
    .await;

    actions
        .send(ClientAction::RunCommand {
            command: "ls /tmp".to_string(),
        })
        .unwrap();

    let requested = wait_for_event(&mut events, |e| {
        matches!(
            e,
            ClientEvent::StateChanged {
                change: StateChange::ApprovalRequested { .. }
            }
        )
    })
    .await;
    match requested {
        ClientEvent::StateChanged {
            change:
                StateChange::ApprovalRequested {
                    command,
                    command_id,
                },
        } => {
            assert_eq!(command, "ls /tmp");
            assert_eq!(command_id, "c1");
        }
        _ => unreachable!(),
    }

    actions
        .send(ClientAction::ResolveApproval {
            decision: ApprovalDecision::Approve,
            modified_command: None,
        })
        .unwrap();

    actions.send(ClientAction::Quit).unwrap();
    let client = client_task.await.unwrap();
    server.await.unwrap();

    assert!(client.state().pending_approval().is_none());
}
