//! Wire protocol for the workspace server
//!
//! Messages travel as `{"type": ..., "data": {...}}` envelopes over a single
//! persistent WebSocket connection.

pub mod socket;
pub mod types;

pub use socket::WorkspaceSocket;
pub use types::{
    ApprovalDecision, ClientMessage, ConnectionStatus, FileEntry, FileOp, ProtocolError,
    ServerMessage,
};
