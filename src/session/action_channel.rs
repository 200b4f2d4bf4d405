//! Channels between the front-end and the session client

use tokio::sync::mpsc;

use crate::protocol::types::{ApprovalDecision, ConnectionStatus};
use crate::workspace::{ActionError, StateChange};

/// User intent delivered to the session client
#[derive(Debug, Clone, PartialEq)]
pub enum ClientAction {
    /// Send a chat message to the assistant
    SendChat { text: String },
    /// Request a fresh directory listing
    ListDirectory { path: String },
    /// Open a remote file into a local buffer
    OpenFile { path: String },
    /// Apply a local edit to an open buffer
    EditFile { path: String, content: String },
    /// Save an open buffer (active file when `path` is None)
    SaveFile { path: Option<String> },
    /// Make an open buffer the active one
    Activate { path: String },
    /// Ask the server to execute a shell command
    RunCommand { command: String },
    /// Resolve the pending command approval
    ResolveApproval {
        decision: ApprovalDecision,
        modified_command: Option<String>,
    },
    /// Truncate the transcript
    ClearTranscript,
    /// Report current client status
    Status,
    /// Shut the client down
    Quit,
}

/// Event emitted by the session client for the front-end to render
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Connection status transition
    StatusChanged { status: ConnectionStatus },
    /// A connect attempt failed; the retry timer is running
    ConnectFailed { error: String },
    /// An inbound message changed the workspace state
    StateChanged { change: StateChange },
    /// A local action failed its preconditions; nothing was sent
    ActionRejected { error: ActionError },
    /// Snapshot of the client status on request
    StatusReport { report: StatusReport },
    /// The transcript was cleared
    TranscriptCleared,
}

/// Point-in-time status snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub connection: ConnectionStatus,
    pub session_id: Option<String>,
    pub open_files: usize,
    pub dirty_files: usize,
    pub transcript_len: usize,
    pub pending_approval: Option<String>,
}

/// Action channel feeding the session client
pub struct ActionChannel {
    action_tx: mpsc::UnboundedSender<ClientAction>,
    action_rx: mpsc::UnboundedReceiver<ClientAction>,
}

impl ActionChannel {
    pub fn new() -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();

        Self {
            action_tx,
            action_rx,
        }
    }

    /// Receive the next action
    pub async fn next(&mut self) -> Option<ClientAction> {
        self.action_rx.recv().await
    }

    /// Get a sender handle for external producers
    pub fn sender(&self) -> mpsc::UnboundedSender<ClientAction> {
        self.action_tx.clone()
    }
}
