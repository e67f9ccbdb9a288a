//! Conversation session and its persisted representation.
//!
//! The store owns the ordered message list. Every mutation goes through
//! `append` or `reset`, both of which write the session back to disk in the
//! same call, so the on-disk copy never lags the in-memory one by more than
//! a failed write (which is logged and otherwise ignored).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

/// Bump when the stored shape changes; older files are treated as corrupt.
const STORAGE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Version envelope around the persisted message list.
#[derive(Serialize, Deserialize)]
struct StoredSession {
    version: u32,
    messages: Vec<Message>,
}

pub struct SessionStore {
    path: PathBuf,
    messages: Vec<Message>,
}

impl SessionStore {
    /// Open the session at `path`, restoring persisted messages when they
    /// exist and parse. Missing or corrupt data reseeds a one-message
    /// welcome session and persists it immediately.
    pub fn open(path: PathBuf, voice_available: bool) -> Self {
        let messages = match Self::load(&path) {
            Some(messages) if !messages.is_empty() => messages,
            _ => {
                let seed = vec![welcome_message(voice_available)];
                persist(&path, &seed);
                seed
            }
        };
        Self { path, messages }
    }

    /// Read and parse the persisted session. Fails soft: any read or parse
    /// problem, including a version mismatch, yields `None`.
    pub fn load(path: &Path) -> Option<Vec<Message>> {
        let raw = fs::read_to_string(path).ok()?;
        let stored: StoredSession = serde_json::from_str(&raw).ok()?;
        if stored.version != STORAGE_VERSION {
            tracing::debug!(
                version = stored.version,
                "discarding session with unknown storage version"
            );
            return None;
        }
        Some(stored.messages)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append a message and persist the session.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
        persist(&self.path, &self.messages);
    }

    /// Truncate to a fresh one-message welcome session and persist it.
    pub fn reset(&mut self, voice_available: bool) {
        self.messages = vec![welcome_message(voice_available)];
        persist(&self.path, &self.messages);
    }
}

/// Overwrite semantics, fire-and-forget: a failed write is logged, never
/// surfaced.
fn persist(path: &Path, messages: &[Message]) {
    let stored = StoredSession {
        version: STORAGE_VERSION,
        messages: messages.to_vec(),
    };
    let result = (|| -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string(&stored)?;
        fs::write(path, raw)?;
        Ok(())
    })();
    if let Err(err) = result {
        tracing::warn!(%err, path = %path.display(), "failed to persist session");
    }
}

pub fn welcome_message(voice_available: bool) -> Message {
    let content = if voice_available {
        "Hi! I'm the resident assistant. I can answer questions about the work, \
         skills, and projects on this page, or take you to a section. You can \
         type or press the mic key to speak. What would you like to know?"
    } else {
        "Hi! I'm the resident assistant. I can answer questions about the work, \
         skills, and projects on this page, or take you to a section. What \
         would you like to know?"
    };
    Message::assistant(content)
}

/// Single fixed location for the persisted conversation.
pub fn default_session_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;
    Ok(config_dir.join("concierge").join("session.json"))
}
