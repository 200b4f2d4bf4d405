//! Parsing of interactive input lines into client actions
//!
//! Lines starting with `/` are commands; anything else is chat text.

use crate::protocol::types::ApprovalDecision;

use super::action_channel::ClientAction;

/// Line parser for the interactive prompt
pub struct CommandRouter;

impl CommandRouter {
    /// Parse one input line
    ///
    /// Returns `Ok(None)` for blank lines, `Err` with a usage message for a
    /// malformed command.
    pub fn parse(line: &str) -> Result<Option<ClientAction>, String> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        if !trimmed.starts_with('/') {
            return Ok(Some(ClientAction::SendChat {
                text: trimmed.to_string(),
            }));
        }

        let mut parts = trimmed.splitn(2, char::is_whitespace);
        let command = parts.next().unwrap_or("");
        let rest = parts.next().map(str::trim).unwrap_or("");

        match command {
            "/ls" => Ok(Some(ClientAction::ListDirectory {
                path: if rest.is_empty() {
                    ".".to_string()
                } else {
                    rest.to_string()
                },
            })),
            "/open" => {
                if rest.is_empty() {
                    Err("usage: /open <path>".to_string())
                } else {
                    Ok(Some(ClientAction::OpenFile {
                        path: rest.to_string(),
                    }))
                }
            }
            "/edit" => match rest.split_once(char::is_whitespace) {
                Some((path, content)) => Ok(Some(ClientAction::EditFile {
                    path: path.to_string(),
                    content: content.to_string(),
                })),
                None => Err("usage: /edit <path> <new content>".to_string()),
            },
            "/activate" => {
                if rest.is_empty() {
                    Err("usage: /activate <path>".to_string())
                } else {
                    Ok(Some(ClientAction::Activate {
                        path: rest.to_string(),
                    }))
                }
            }
            "/save" => Ok(Some(ClientAction::SaveFile {
                path: if rest.is_empty() {
                    None
                } else {
                    Some(rest.to_string())
                },
            })),
            "/run" => {
                if rest.is_empty() {
                    Err("usage: /run <command>".to_string())
                } else {
                    Ok(Some(ClientAction::RunCommand {
                        command: rest.to_string(),
                    }))
                }
            }
            "/approve" => Ok(Some(ClientAction::ResolveApproval {
                decision: ApprovalDecision::Approve,
                modified_command: None,
            })),
            "/reject" => Ok(Some(ClientAction::ResolveApproval {
                decision: ApprovalDecision::Reject,
                modified_command: None,
            })),
            "/modify" => {
                if rest.is_empty() {
                    Err("usage: /modify <replacement command>".to_string())
                } else {
                    Ok(Some(ClientAction::ResolveApproval {
                        decision: ApprovalDecision::Modify,
                        modified_command: Some(rest.to_string()),
                    }))
                }
            }
            "/clear" => Ok(Some(ClientAction::ClearTranscript)),
            "/status" => Ok(Some(ClientAction::Status)),
            "/quit" | "/exit" => Ok(Some(ClientAction::Quit)),
            "/help" => Err(Self::help_messages().join("\n")),
            other => Err(format!("unknown command: {} (try /help)", other)),
        }
    }

    /// Help text for the interactive prompt
    pub fn help_messages() -> &'static [&'static str] {
        &[
            "Available commands:",
            "  <text>              send a chat message",
            "  /ls [path]          list a directory",
            "  /open <path>        open a remote file",
            "  /edit <path> <text> replace an open file's content locally",
            "  /activate <path>    make an open file the active buffer",
            "  /save [path]        save an open file (active file by default)",
            "  /run <command>      ask the server to run a shell command",
            "  /approve            approve the pending command",
            "  /reject             reject the pending command",
            "  /modify <command>   approve with a replacement command",
            "  /clear              clear the transcript",
            "  /status             show connection and session status",
            "  /quit               exit",
        ]
    }
}
