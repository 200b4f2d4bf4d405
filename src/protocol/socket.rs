//! WebSocket transport wrapper for the workspace server

use futures_util::sink::SinkExt;
use futures_util::stream::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message,
};
use tracing::{debug, info, warn};

use super::types::{ClientMessage, ConnectionStatus, ProtocolError, ServerMessage};

/// Workspace server WebSocket connection
///
/// Owned exclusively by the session client task; status transitions are
/// published on a watch channel for observers.
pub struct WorkspaceSocket {
    url: String,
    status_tx: watch::Sender<ConnectionStatus>,
    status_rx: watch::Receiver<ConnectionStatus>,
    stream: Option<WebSocketStream<MaybeTlsStream<TcpStream>>>,
}

impl WorkspaceSocket {
    /// Create a new disconnected socket for the given server URL
    pub fn new(url: impl Into<String>) -> Self {
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Disconnected);

        Self {
            url: url.into(),
            status_tx,
            status_rx,
            stream: None,
        }
    }

    /// Get current connection status
    pub fn status(&self) -> ConnectionStatus {
        *self.status_rx.borrow()
    }

    /// Connect to the workspace server
    pub async fn connect(&mut self) -> Result<(), ProtocolError> {
        self.set_status(ConnectionStatus::Connecting);

        match connect_async(&self.url).await {
            Ok((ws_stream, _)) => {
                self.stream = Some(ws_stream);
                self.set_status(ConnectionStatus::Connected);
                info!("Connected to workspace server at {}", self.url);
                Ok(())
            }
            Err(e) => {
                self.set_status(ConnectionStatus::Disconnected);
                Err(ProtocolError::Connection(format!(
                    "failed to connect to {}: {}",
                    self.url, e
                )))
            }
        }
    }

    /// Close the connection if one is open
    pub async fn close(&mut self) {
        if let Some(mut ws) = self.stream.take() {
            if let Err(e) = ws.close(None).await {
                warn!("Error closing workspace connection: {}", e);
            }
            info!("Disconnected from workspace server");
        }
        self.set_status(ConnectionStatus::Disconnected);
    }

    /// Send a typed message to the server
    pub async fn send(&mut self, message: &ClientMessage) -> Result<(), ProtocolError> {
        let wire = message.to_wire()?;
        match self.stream.as_mut() {
            Some(ws) => {
                debug!("Sending message: {}", wire);
                ws.send(Message::Text(wire))
                    .await
                    .map_err(|e| ProtocolError::Connection(format!("send failed: {}", e)))
            }
            None => Err(ProtocolError::NotConnected),
        }
    }

    /// Receive the next typed message from the server
    ///
    /// Returns `None` when the connection has ended (server close or
    /// transport failure); the caller re-enters the reconnect path. Parse
    /// failures are returned as errors and the connection stays up.
    pub async fn next(&mut self) -> Option<Result<ServerMessage, ProtocolError>> {
        loop {
            let ws = self.stream.as_mut()?;

            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    debug!("Received frame: {}", text);
                    return Some(ServerMessage::parse(&text));
                }
                Some(Ok(Message::Ping(data))) => {
                    debug!("Received ping, sending pong");
                    if let Err(e) = ws.send(Message::Pong(data)).await {
                        warn!("Failed to send pong: {}", e);
                    }
                }
                Some(Ok(Message::Pong(_))) => {
                    debug!("Received pong");
                }
                Some(Ok(Message::Close(_))) => {
                    info!("Workspace server closed the connection");
                    self.drop_connection();
                    return None;
                }
                Some(Ok(other)) => {
                    debug!("Ignoring non-text frame: {:?}", other);
                }
                Some(Err(e)) => {
                    warn!("WebSocket transport error: {}", e);
                    self.drop_connection();
                    return None;
                }
                None => {
                    info!("Workspace connection ended");
                    self.drop_connection();
                    return None;
                }
            }
        }
    }

    fn drop_connection(&mut self) {
        self.stream = None;
        self.set_status(ConnectionStatus::Disconnected);
    }

    fn set_status(&self, status: ConnectionStatus) {
        // Watch send only fails when every receiver is gone; the socket
        // holds one itself, so this cannot fail.
        let _ = self.status_tx.send(status);
    }
}
