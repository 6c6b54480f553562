//! Conversation log, client identity, and pre-chat metadata persistence.
//!
//! DESIGN
//! ======
//! The store owns the in-memory log and writes the full serialized log back
//! to session storage after every mutation, so a half-written entry can
//! never survive. Corrupt persisted state degrades to empty rather than
//! failing the activation.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::storage::{KEY_CLIENT_ID, KEY_CONVERSATION, KEY_METADATA, StorageArea};

/// Who authored a conversation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

/// One immutable conversation entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
    /// Milliseconds since the Unix epoch at creation time.
    pub ts: i64,
}

impl ChatMessage {
    /// Create a visitor-authored entry stamped with the current time.
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, text: text.into(), ts: now_ms() }
    }

    /// Create a backend/assistant entry stamped with the current time.
    pub fn bot(text: impl Into<String>) -> Self {
        Self { role: Role::Bot, text: text.into(), ts: now_ms() }
    }
}

/// Visitor contact details captured by the pre-chat gate.
///
/// Field names on the wire and in storage follow the backend's contract
/// (`username`/`useremail`/`userphone`/`ownerId`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreChatMetadata {
    #[serde(rename = "username", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "useremail", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "userphone", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "ownerId", skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}

/// Persistent state for one widget activation.
pub struct ConversationStore {
    storage: StorageArea,
    log: Vec<ChatMessage>,
}

impl ConversationStore {
    /// Restore the persisted log (empty on absence or corruption).
    #[must_use]
    pub fn new(storage: StorageArea) -> Self {
        let log = storage
            .session
            .get(KEY_CONVERSATION)
            .and_then(|raw| serde_json::from_str::<Vec<ChatMessage>>(&raw).ok())
            .unwrap_or_default();
        Self { storage, log }
    }

    /// The current conversation, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.log
    }

    /// Append one entry and persist the full log.
    pub fn append(&mut self, message: ChatMessage) {
        self.log.push(message);
        self.persist_log();
    }

    /// Empty the log and persist the empty state.
    pub fn clear(&mut self) {
        self.log.clear();
        self.persist_log();
    }

    /// The durable client identity, generated and persisted on first use.
    ///
    /// Once a value exists it is never regenerated.
    pub fn client_identity(&mut self) -> String {
        if let Some(existing) = self.storage.durable.get(KEY_CLIENT_ID) {
            if !existing.is_empty() {
                return existing;
            }
        }
        let generated = generate_client_id();
        self.storage.durable.set(KEY_CLIENT_ID, &generated);
        generated
    }

    /// The persisted pre-chat metadata, `None` when absent or corrupt.
    #[must_use]
    pub fn metadata(&self) -> Option<PreChatMetadata> {
        let raw = self.storage.durable.get(KEY_METADATA)?;
        serde_json::from_str(&raw).ok()
    }

    /// Persist pre-chat metadata durably.
    pub fn save_metadata(&mut self, metadata: &PreChatMetadata) {
        let Ok(raw) = serde_json::to_string(metadata) else {
            return;
        };
        self.storage.durable.set(KEY_METADATA, &raw);
    }

    fn persist_log(&mut self) {
        let Ok(raw) = serde_json::to_string(&self.log) else {
            return;
        };
        self.storage.session.set(KEY_CONVERSATION, &raw);
    }
}

/// Current time as milliseconds since Unix epoch.
pub(crate) fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

/// Generate a client identity in the `u_` + 7 base-36 characters format.
fn generate_client_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::rng();
    let suffix: String = (0..7)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect();
    format!("u_{suffix}")
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
