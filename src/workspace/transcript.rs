//! Conversation transcript: an append-only log of chat turns and errors

use chrono::{DateTime, Utc};

/// Author role of a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    Error,
}

/// One chat turn or error notice
///
/// The timestamp is the client-observed arrival time, not a
/// server-authoritative one.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEntry {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Ordered, append-only conversation log
///
/// Entries are never reordered or mutated after insertion; `clear` is the
/// only operation that shrinks the transcript, and it truncates to empty.
#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry stamped with the current local time
    pub fn append(&mut self, role: Role, text: impl Into<String>) -> TranscriptEntry {
        let entry = TranscriptEntry {
            role,
            text: text.into(),
            timestamp: Utc::now(),
        };
        self.entries.push(entry.clone());
        entry
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Truncate the transcript to empty
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
