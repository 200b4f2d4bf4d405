//! Session client: connection lifecycle and event dispatch
//!
//! One client task owns the socket and the workspace mirrors. The lifecycle
//! is `Disconnected -> Connecting -> Connected -> Disconnected` in a loop:
//! a fixed-interval retry timer drives reconnection indefinitely, and a new
//! join handshake runs on every successful connect.

use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::protocol::socket::WorkspaceSocket;
use crate::protocol::types::{ClientMessage, ConnectionStatus, ServerMessage};
use crate::workspace::{ActionError, WorkspaceState};

use super::action_channel::{ActionChannel, ClientAction, ClientEvent, StatusReport};

/// Why the per-connection loop ended
#[derive(Debug, PartialEq, Eq)]
enum LoopOutcome {
    /// Transport closed or failed; take the reconnect path
    Disconnected,
    /// User quit or the front-end went away; stop for good
    Shutdown,
}

/// Client for one workspace session
pub struct SessionClient {
    config: Config,
    state: WorkspaceState,
    socket: WorkspaceSocket,
    actions: ActionChannel,
    event_tx: mpsc::UnboundedSender<ClientEvent>,
    event_rx: Option<mpsc::UnboundedReceiver<ClientEvent>>,
}

impl SessionClient {
    /// Create a new client; no connection is attempted until [`run`]
    pub fn new(config: Config) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let socket = WorkspaceSocket::new(config.server.ws_url.clone());

        Self {
            config,
            state: WorkspaceState::new(),
            socket,
            actions: ActionChannel::new(),
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    /// Sender handle for delivering user actions to the client
    pub fn action_sender(&self) -> mpsc::UnboundedSender<ClientAction> {
        self.actions.sender()
    }

    /// Take the event receiver; the front-end renders these
    pub fn event_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<ClientEvent>> {
        self.event_rx.take()
    }

    /// Current workspace state, for inspection
    pub fn state(&self) -> &WorkspaceState {
        &self.state
    }

    /// Run the connection lifecycle until the user quits
    ///
    /// Retries forever on transport failure with a fixed delay between
    /// attempts; a quit during the delay cancels the timer so no reconnect
    /// attempt leaks after teardown.
    pub async fn run(&mut self) -> Result<()> {
        info!("Session client starting, server {}", self.config.server.ws_url);

        loop {
            self.emit(ClientEvent::StatusChanged {
                status: ConnectionStatus::Connecting,
            });

            match self.socket.connect().await {
                Ok(()) => {
                    self.emit(ClientEvent::StatusChanged {
                        status: ConnectionStatus::Connected,
                    });

                    if let Err(e) = self.after_connect().await {
                        warn!("Post-connect handshake failed: {}", e);
                    }

                    let outcome = self.serve_connection().await;

                    self.state.handle_disconnect();
                    self.socket.close().await;
                    self.emit(ClientEvent::StatusChanged {
                        status: ConnectionStatus::Disconnected,
                    });

                    if outcome == LoopOutcome::Shutdown {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Connect attempt failed: {}", e);
                    self.emit(ClientEvent::ConnectFailed {
                        error: e.to_string(),
                    });
                }
            }

            if !self.wait_for_retry().await {
                break;
            }
        }

        info!("Session client stopped");
        Ok(())
    }

    /// Join handshake plus listing refresh, run on every successful connect
    async fn after_connect(&mut self) -> Result<()> {
        self.socket.send(&ClientMessage::JoinSession {}).await?;

        // The previous listing (if any) is stale after a drop; re-request
        // the same path, falling back to the workspace root.
        let path = self
            .state
            .awaited_listing()
            .unwrap_or(&self.config.workspace_root)
            .to_string();
        let request = self.state.request_listing(&path);
        self.socket.send(&request).await?;

        Ok(())
    }

    /// Serve one live connection until it drops or the user quits
    async fn serve_connection(&mut self) -> LoopOutcome {
        loop {
            tokio::select! {
                inbound = self.socket.next() => {
                    match inbound {
                        Some(Ok(message)) => self.handle_server_message(message),
                        Some(Err(e)) => {
                            // Malformed frames are dropped, never fatal.
                            warn!("Dropping bad frame: {}", e);
                        }
                        None => return LoopOutcome::Disconnected,
                    }
                }
                action = self.actions.next() => {
                    match action {
                        Some(ClientAction::Quit) => {
                            info!("User requested quit");
                            return LoopOutcome::Shutdown;
                        }
                        Some(action) => self.handle_action(action).await,
                        None => {
                            info!("Action channel closed, shutting down");
                            return LoopOutcome::Shutdown;
                        }
                    }
                }
            }
        }
    }

    /// Sleep the fixed reconnect delay, still serving local actions
    ///
    /// Returns false when the client should shut down instead of retrying.
    async fn wait_for_retry(&mut self) -> bool {
        let delay = tokio::time::sleep(Duration::from_millis(
            self.config.server.reconnect_interval_ms,
        ));
        tokio::pin!(delay);

        loop {
            tokio::select! {
                _ = &mut delay => return true,
                action = self.actions.next() => {
                    match action {
                        Some(ClientAction::Quit) | None => return false,
                        Some(action) => self.handle_offline_action(action),
                    }
                }
            }
        }
    }

    /// Dispatch one inbound message into the workspace state
    fn handle_server_message(&mut self, message: ServerMessage) {
        debug!("Handling server message: {:?}", message);
        if let Some(change) = self.state.apply(message) {
            self.emit(ClientEvent::StateChanged { change });
        }
    }

    /// Handle a user action while connected
    async fn handle_action(&mut self, action: ClientAction) {
        debug!("Handling action: {:?}", action);

        let outbound = match action {
            ClientAction::SendChat { text } => self.state.chat(&text).map(Some),
            ClientAction::ListDirectory { path } => Ok(Some(self.state.request_listing(&path))),
            ClientAction::OpenFile { path } => Ok(Some(self.state.request_file(&path))),
            ClientAction::SaveFile { path } => {
                self.state.save_file(path.as_deref()).map(Some)
            }
            ClientAction::RunCommand { command } => self.state.run_command(&command).map(Some),
            ClientAction::ResolveApproval {
                decision,
                modified_command,
            } => self
                .state
                .resolve_approval(decision, modified_command.as_deref())
                .map(Some),
            ClientAction::EditFile { path, content } => {
                self.state.edit_file(&path, &content).map(|()| None)
            }
            ClientAction::Activate { path } => self.state.activate(&path).map(|()| None),
            ClientAction::ClearTranscript => {
                self.state.clear_transcript();
                self.emit(ClientEvent::TranscriptCleared);
                Ok(None)
            }
            ClientAction::Status => {
                self.emit_status_report();
                Ok(None)
            }
            ClientAction::Quit => unreachable!("quit is handled by the caller"),
        };

        match outbound {
            Ok(Some(message)) => {
                if let Err(e) = self.socket.send(&message).await {
                    // The read side will observe the drop and reconnect.
                    warn!("Send failed, message lost: {}", e);
                }
            }
            Ok(None) => {}
            Err(error) => {
                warn!("Action rejected: {}", error);
                self.emit(ClientEvent::ActionRejected { error });
            }
        }
    }

    /// Handle a user action while disconnected
    ///
    /// Anything that would produce a wire message is rejected explicitly
    /// with `NotConnected`; purely local actions still work.
    fn handle_offline_action(&mut self, action: ClientAction) {
        match action {
            ClientAction::EditFile { path, content } => {
                if let Err(error) = self.state.edit_file(&path, &content) {
                    self.emit(ClientEvent::ActionRejected { error });
                }
            }
            ClientAction::Activate { path } => {
                if let Err(error) = self.state.activate(&path) {
                    self.emit(ClientEvent::ActionRejected { error });
                }
            }
            ClientAction::ClearTranscript => {
                self.state.clear_transcript();
                self.emit(ClientEvent::TranscriptCleared);
            }
            ClientAction::Status => self.emit_status_report(),
            ClientAction::Quit => {}
            _ => {
                warn!("Action rejected while disconnected: {:?}", action);
                self.emit(ClientEvent::ActionRejected {
                    error: ActionError::NotConnected,
                });
            }
        }
    }

    fn emit_status_report(&self) {
        let report = StatusReport {
            connection: self.socket.status(),
            session_id: self.state.session_id().map(str::to_string),
            open_files: self.state.open_file_count(),
            dirty_files: self.state.dirty_file_count(),
            transcript_len: self.state.transcript().len(),
            pending_approval: self
                .state
                .pending_approval()
                .map(|p| p.command_id.clone()),
        };
        self.emit(ClientEvent::StatusReport { report });
    }

    fn emit(&self, event: ClientEvent) {
        if self.event_tx.send(event).is_err() {
            debug!("Event receiver dropped");
        }
    }
}
