//! Wire message types for the workspace server protocol

use serde::{Deserialize, Serialize};

/// Connection status for the workspace socket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

/// Decision on a pending command approval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalDecision {
    Approve,
    Reject,
    Modify,
}

/// File operation kinds understood by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileOp {
    List,
    Read,
    Write,
}

/// One entry in a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub is_directory: bool,
    pub path: String,
}

/// Outbound message to the workspace server
///
/// Serializes as the `{"type": ..., "data": {...}}` envelope the server
/// expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    JoinSession {},
    Chat {
        message: String,
    },
    FileOperation {
        operation: FileOp,
        path: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },
    Command {
        command: String,
    },
    ApprovalResponse {
        command_id: String,
        decision: ApprovalDecision,
        #[serde(skip_serializing_if = "Option::is_none")]
        modified_command: Option<String>,
    },
}

impl ClientMessage {
    /// Encode to the wire format
    pub fn to_wire(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::from)
    }
}

/// Inbound message from the workspace server, decoded from the envelope
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    SessionJoined {
        session_id: String,
    },
    UserMessage {
        message: String,
    },
    AiResponse {
        message: String,
    },
    AiTyping {
        typing: bool,
    },
    ErrorNotice {
        message: String,
    },
    FileList {
        files: Vec<FileEntry>,
        path: String,
    },
    FileContent {
        path: String,
        content: String,
    },
    CommandApprovalRequired {
        command: String,
        command_id: String,
    },
    /// Unrecognized type discriminator; logged and ignored upstream
    Unknown {
        kind: String,
    },
}

/// Raw wire envelope before payload decoding
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct SessionJoinedPayload {
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct TextPayload {
    message: String,
}

#[derive(Debug, Deserialize)]
struct TypingPayload {
    typing: bool,
}

#[derive(Debug, Deserialize)]
struct FileListPayload {
    files: Vec<FileEntry>,
    path: String,
}

#[derive(Debug, Deserialize)]
struct FileContentPayload {
    path: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApprovalPayload {
    command: String,
    command_id: String,
}

impl ServerMessage {
    /// Decode a wire frame into a typed message
    ///
    /// Unknown type discriminators map to `ServerMessage::Unknown`; a known
    /// type with a malformed payload is a `ProtocolError::Parse`.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope = serde_json::from_str(text)
            .map_err(|e| ProtocolError::Parse(format!("invalid envelope: {}", e)))?;

        let payload_err = |e: serde_json::Error| {
            ProtocolError::Parse(format!("bad {} payload: {}", envelope.kind, e))
        };

        match envelope.kind.as_str() {
            "session_joined" => {
                let p: SessionJoinedPayload =
                    serde_json::from_value(envelope.data).map_err(payload_err)?;
                Ok(Self::SessionJoined {
                    session_id: p.session_id,
                })
            }
            "user_message" => {
                let p: TextPayload = serde_json::from_value(envelope.data).map_err(payload_err)?;
                Ok(Self::UserMessage { message: p.message })
            }
            "ai_response" => {
                let p: TextPayload = serde_json::from_value(envelope.data).map_err(payload_err)?;
                Ok(Self::AiResponse { message: p.message })
            }
            "ai_typing" => {
                let p: TypingPayload =
                    serde_json::from_value(envelope.data).map_err(payload_err)?;
                Ok(Self::AiTyping { typing: p.typing })
            }
            "error" => {
                let p: TextPayload = serde_json::from_value(envelope.data).map_err(payload_err)?;
                Ok(Self::ErrorNotice { message: p.message })
            }
            "file_list" => {
                let p: FileListPayload =
                    serde_json::from_value(envelope.data).map_err(payload_err)?;
                Ok(Self::FileList {
                    files: p.files,
                    path: p.path,
                })
            }
            "file_content" => {
                let p: FileContentPayload =
                    serde_json::from_value(envelope.data).map_err(payload_err)?;
                Ok(Self::FileContent {
                    path: p.path,
                    content: p.content,
                })
            }
            "command_approval_required" => {
                let p: ApprovalPayload =
                    serde_json::from_value(envelope.data).map_err(payload_err)?;
                Ok(Self::CommandApprovalRequired {
                    command: p.command,
                    command_id: p.command_id,
                })
            }
            other => Ok(Self::Unknown {
                kind: other.to_string(),
            }),
        }
    }
}

/// Error types for socket and wire-format operations
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("not connected")]
    NotConnected,
    #[error("connection closed by server")]
    Closed,
    #[error("parse error: {0}")]
    Parse(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
