//! Local mirrors of the authoritative server-side workspace state
//!
//! One `WorkspaceState` instance exists per session client. It is mutated
//! only from the client's own event loop, so no locking is needed. Inbound
//! server messages flow through [`WorkspaceState::apply`]; user actions are
//! validated here and turned into outbound wire messages.

pub mod transcript;

use std::collections::HashMap;

use tracing::warn;

use crate::protocol::types::{
    ApprovalDecision, ClientMessage, FileEntry, FileOp, ServerMessage,
};
pub use transcript::{Role, Transcript, TranscriptEntry};

/// An in-memory buffer mirroring a remote file plus local edits
#[derive(Debug, Clone, PartialEq)]
pub struct OpenFile {
    pub path: String,
    /// Content as last received from the server
    pub synced_content: String,
    /// Content including local edits
    pub local_content: String,
    /// True once local content diverges from synced content, until an
    /// explicit save
    pub dirty: bool,
}

/// The most recently received directory listing
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryListing {
    pub path: String,
    pub entries: Vec<FileEntry>,
}

/// A single outstanding command awaiting a human decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingApproval {
    pub command: String,
    pub command_id: String,
}

/// Rejected-precondition results for local user actions
///
/// Surfaced explicitly rather than silently swallowed; no wire message is
/// produced when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("not connected to the workspace server")]
    NotConnected,
    #[error("command is empty")]
    EmptyCommand,
    #[error("no command approval is pending")]
    NoPendingApproval,
    #[error("file is not open: {0}")]
    UnknownFile(String),
    #[error("no file is active")]
    NoActiveFile,
}

/// Observable effect of applying one inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    SessionJoined {
        session_id: String,
    },
    TranscriptAppended {
        entry: TranscriptEntry,
    },
    TypingChanged {
        typing: bool,
    },
    ListingReplaced {
        listing: DirectoryListing,
    },
    StaleListingDropped {
        path: String,
    },
    FileOpened {
        path: String,
        content: String,
    },
    ApprovalRequested {
        command: String,
        command_id: String,
    },
    /// A second approval arrived before the first resolved; the earlier one
    /// was replaced and must be surfaced as a warning
    ApprovalReplaced {
        dropped_id: String,
        command: String,
        command_id: String,
    },
}

/// Client-side mirror of one workspace session
#[derive(Debug, Default)]
pub struct WorkspaceState {
    session_id: Option<String>,
    /// Path of the most recently requested directory listing;
    /// last-request-wins, responses for other paths are stale
    awaited_listing: Option<String>,
    listing: Option<DirectoryListing>,
    open_files: HashMap<String, OpenFile>,
    active_path: Option<String>,
    transcript: Transcript,
    assistant_typing: bool,
    pending_approval: Option<PendingApproval>,
}

impl WorkspaceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn listing(&self) -> Option<&DirectoryListing> {
        self.listing.as_ref()
    }

    pub fn awaited_listing(&self) -> Option<&str> {
        self.awaited_listing.as_deref()
    }

    pub fn open_file(&self, path: &str) -> Option<&OpenFile> {
        self.open_files.get(path)
    }

    pub fn active_file(&self) -> Option<&OpenFile> {
        self.active_path
            .as_deref()
            .and_then(|path| self.open_files.get(path))
    }

    pub fn open_file_count(&self) -> usize {
        self.open_files.len()
    }

    pub fn dirty_file_count(&self) -> usize {
        self.open_files.values().filter(|f| f.dirty).count()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn assistant_typing(&self) -> bool {
        self.assistant_typing
    }

    pub fn pending_approval(&self) -> Option<&PendingApproval> {
        self.pending_approval.as_ref()
    }

    /// Forget connection-scoped state after a transport drop
    ///
    /// Open files, transcript, and the last listing persist so a transient
    /// drop does not lose work; the session id and any pending approval are
    /// bound to the dead connection and are discarded.
    pub fn handle_disconnect(&mut self) {
        self.session_id = None;
        self.assistant_typing = false;
        if let Some(dropped) = self.pending_approval.take() {
            warn!(
                "Discarding pending approval {} on disconnect",
                dropped.command_id
            );
        }
    }

    /// Build a chat message; empty-after-trim text is rejected
    pub fn chat(&self, text: &str) -> Result<ClientMessage, ActionError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ActionError::EmptyMessage);
        }
        Ok(ClientMessage::Chat {
            message: trimmed.to_string(),
        })
    }

    /// Request a fresh listing for `path`; supersedes any in-flight request
    pub fn request_listing(&mut self, path: &str) -> ClientMessage {
        self.awaited_listing = Some(path.to_string());
        ClientMessage::FileOperation {
            operation: FileOp::List,
            path: path.to_string(),
            content: None,
        }
    }

    /// Request file content; the response will open (or overwrite) the buffer
    pub fn request_file(&self, path: &str) -> ClientMessage {
        ClientMessage::FileOperation {
            operation: FileOp::Read,
            path: path.to_string(),
            content: None,
        }
    }

    /// Apply a local edit to an open file, recomputing the dirty flag
    pub fn edit_file(&mut self, path: &str, content: &str) -> Result<(), ActionError> {
        let file = self
            .open_files
            .get_mut(path)
            .ok_or_else(|| ActionError::UnknownFile(path.to_string()))?;
        file.local_content = content.to_string();
        file.dirty = file.local_content != file.synced_content;
        Ok(())
    }

    /// Make an already-open file the active buffer
    pub fn activate(&mut self, path: &str) -> Result<(), ActionError> {
        if !self.open_files.contains_key(path) {
            return Err(ActionError::UnknownFile(path.to_string()));
        }
        self.active_path = Some(path.to_string());
        Ok(())
    }

    /// Build a save message for `path` (or the active file)
    ///
    /// Optimistically marks the buffer clean; there is no rollback if the
    /// server rejects the write.
    pub fn save_file(&mut self, path: Option<&str>) -> Result<ClientMessage, ActionError> {
        let path = match path {
            Some(p) => p.to_string(),
            None => self
                .active_path
                .clone()
                .ok_or(ActionError::NoActiveFile)?,
        };
        let file = self
            .open_files
            .get_mut(&path)
            .ok_or_else(|| ActionError::UnknownFile(path.clone()))?;

        let content = file.local_content.clone();
        file.synced_content = content.clone();
        file.dirty = false;

        Ok(ClientMessage::FileOperation {
            operation: FileOp::Write,
            path,
            content: Some(content),
        })
    }

    /// Ask the server to run a shell command; approval will come back as
    /// `command_approval_required`
    pub fn run_command(&self, command: &str) -> Result<ClientMessage, ActionError> {
        let trimmed = command.trim();
        if trimmed.is_empty() {
            return Err(ActionError::EmptyCommand);
        }
        Ok(ClientMessage::Command {
            command: trimmed.to_string(),
        })
    }

    /// Resolve the pending approval
    ///
    /// Clears it locally regardless of server acknowledgement; `Modify`
    /// requires a non-empty replacement command.
    pub fn resolve_approval(
        &mut self,
        decision: ApprovalDecision,
        modified_command: Option<&str>,
    ) -> Result<ClientMessage, ActionError> {
        if self.pending_approval.is_none() {
            return Err(ActionError::NoPendingApproval);
        }

        let modified_command = match decision {
            ApprovalDecision::Modify => {
                let replacement = modified_command.map(str::trim).unwrap_or("");
                if replacement.is_empty() {
                    return Err(ActionError::EmptyCommand);
                }
                Some(replacement.to_string())
            }
            _ => None,
        };

        let pending = self
            .pending_approval
            .take()
            .ok_or(ActionError::NoPendingApproval)?;

        Ok(ClientMessage::ApprovalResponse {
            command_id: pending.command_id,
            decision,
            modified_command,
        })
    }

    /// Truncate the transcript to empty
    pub fn clear_transcript(&mut self) {
        self.transcript.clear();
    }

    /// Apply one inbound server message to the local mirrors
    ///
    /// Returns the observable effect, or `None` for messages that are
    /// ignored (unknown types).
    pub fn apply(&mut self, message: ServerMessage) -> Option<StateChange> {
        match message {
            ServerMessage::SessionJoined { session_id } => {
                self.session_id = Some(session_id.clone());
                Some(StateChange::SessionJoined { session_id })
            }
            ServerMessage::UserMessage { message } => {
                let entry = self.transcript.append(Role::User, message);
                Some(StateChange::TranscriptAppended { entry })
            }
            ServerMessage::AiResponse { message } => {
                let entry = self.transcript.append(Role::Assistant, message);
                Some(StateChange::TranscriptAppended { entry })
            }
            ServerMessage::AiTyping { typing } => {
                self.assistant_typing = typing;
                Some(StateChange::TypingChanged { typing })
            }
            ServerMessage::ErrorNotice { message } => {
                let entry = self.transcript.append(Role::Error, message);
                Some(StateChange::TranscriptAppended { entry })
            }
            ServerMessage::FileList { files, path } => {
                if self.awaited_listing.as_deref() == Some(path.as_str()) {
                    let listing = DirectoryListing {
                        path,
                        entries: files,
                    };
                    self.listing = Some(listing.clone());
                    Some(StateChange::ListingReplaced { listing })
                } else {
                    warn!(
                        "Dropping stale file listing for {} (awaiting {:?})",
                        path, self.awaited_listing
                    );
                    Some(StateChange::StaleListingDropped { path })
                }
            }
            ServerMessage::FileContent { path, content } => {
                // Unconditional overwrite, even over a dirty local edit;
                // last writer wins.
                self.open_files.insert(
                    path.clone(),
                    OpenFile {
                        path: path.clone(),
                        synced_content: content.clone(),
                        local_content: content.clone(),
                        dirty: false,
                    },
                );
                self.active_path = Some(path.clone());
                Some(StateChange::FileOpened { path, content })
            }
            ServerMessage::CommandApprovalRequired {
                command,
                command_id,
            } => {
                let replaced = self.pending_approval.replace(PendingApproval {
                    command: command.clone(),
                    command_id: command_id.clone(),
                });
                match replaced {
                    Some(dropped) => {
                        warn!(
                            "Approval {} arrived while {} was unresolved; replacing",
                            command_id, dropped.command_id
                        );
                        Some(StateChange::ApprovalReplaced {
                            dropped_id: dropped.command_id,
                            command,
                            command_id,
                        })
                    }
                    None => Some(StateChange::ApprovalRequested {
                        command,
                        command_id,
                    }),
                }
            }
            ServerMessage::Unknown { kind } => {
                warn!("Ignoring unknown message type: {}", kind);
                None
            }
        }
    }
}
