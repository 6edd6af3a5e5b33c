//! Append-only chat log: a JSON array of timestamped entries on disk.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SessionError;

/// One logged event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub session_id: Uuid,
    #[serde(flatten)]
    pub kind: LogKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogKind {
    UserMessage {
        content: String,
    },
    AssistantMessage {
        content: String,
    },
    McpCall {
        endpoint: String,
        tool: String,
        args: serde_json::Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

/// File-backed chat log. Every append rewrites the file atomically
/// (.tmp then rename).
pub struct ChatLog {
    path: PathBuf,
    session_id: Uuid,
}

impl ChatLog {
    pub fn new(path: impl Into<PathBuf>, session_id: Uuid) -> Self {
        Self {
            path: path.into(),
            session_id,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry stamped with the current time.
    pub async fn append(&self, kind: LogKind) -> Result<(), SessionError> {
        let mut entries = match self.read_all().await {
            Ok(entries) => entries,
            Err(SessionError::Serialization(e)) => {
                let backup = self.path.with_extension("json.corrupt");
                tracing::warn!(
                    "Chat log {} is not a JSON array ({e}); moving it to {}",
                    self.path.display(),
                    backup.display()
                );
                tokio::fs::rename(&self.path, &backup).await?;
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        entries.push(LogEntry {
            timestamp: Utc::now(),
            session_id: self.session_id,
            kind,
        });

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(&entries)?;
        tokio::fs::write(&tmp_path, json).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }

    /// Every entry in the file, oldest first. A missing or empty file is an
    /// empty log.
    pub async fn read_all(&self) -> Result<Vec<LogEntry>, SessionError> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if data.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&data)?)
    }
}
