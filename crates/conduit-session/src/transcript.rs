//! In-memory conversation transcript.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    fn tag(self) -> &'static str {
        match self {
            Role::System => "System",
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub role: Role,
    pub content: String,
}

/// Append-only transcript. A system entry, if any, is the first entry and
/// appears at most once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    entries: Vec<Entry>,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            entries: Vec::new(),
        }
    }

    /// Short hex prefix of the session id for display.
    pub fn short_id(&self) -> String {
        self.id.simple().to_string()[..8].to_string()
    }

    /// Install the system preamble. Only allowed once, on an empty transcript.
    pub fn prime(&mut self, preamble: impl Into<String>) -> Result<(), SessionError> {
        if self.system().is_some() {
            return Err(SessionError::AlreadyPrimed);
        }
        if !self.entries.is_empty() {
            return Err(SessionError::PrimeAfterRecord);
        }
        self.entries.push(Entry {
            role: Role::System,
            content: preamble.into(),
        });
        Ok(())
    }

    /// Append a user or assistant entry.
    pub fn record(&mut self, role: Role, content: impl Into<String>) -> Result<(), SessionError> {
        if role == Role::System {
            return Err(SessionError::SystemRecord);
        }
        self.entries.push(Entry {
            role,
            content: content.into(),
        });
        Ok(())
    }

    pub fn system(&self) -> Option<&str> {
        self.entries
            .first()
            .filter(|e| e.role == Role::System)
            .map(|e| e.content.as_str())
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Entries after the system preamble.
    pub fn dialogue(&self) -> &[Entry] {
        match self.system() {
            Some(_) => &self.entries[1..],
            None => &self.entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The full transcript, one role-tagged block per entry.
    pub fn render(&self) -> String {
        render_entries(&self.entries)
    }

    /// Only the dialogue, without the preamble.
    pub fn render_dialogue(&self) -> String {
        render_entries(self.dialogue())
    }
}

fn render_entries(entries: &[Entry]) -> String {
    entries
        .iter()
        .map(|e| format!("{}: {}", e.role.tag(), e.content))
        .collect::<Vec<_>>()
        .join("\n")
}
