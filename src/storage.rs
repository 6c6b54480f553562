//! Client-side storage abstraction.
//!
//! DESIGN
//! ======
//! The widget persists three things: a durable client identity, durable
//! pre-chat metadata, and a session-scoped conversation log. The host
//! supplies one backend per scope; the runtime never touches storage outside
//! its own `aiofc-` key namespace. Write failures are swallowed (warn-logged)
//! so a broken backend can never take the widget down.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::warn;

/// Namespace prefix applied to every key this widget writes.
pub const STORAGE_PREFIX: &str = "aiofc-";

/// Durable key holding the generated client identity.
pub const KEY_CLIENT_ID: &str = "aiofc-userId";

/// Durable key holding the pre-chat metadata object.
pub const KEY_METADATA: &str = "aiofc-meta";

/// Session key holding the serialized conversation log.
pub const KEY_CONVERSATION: &str = "aiofc-convo";

/// A string key-value store, modeled on the host page's storage areas.
///
/// Implementations must not fail loudly: `set` and `remove` swallow backend
/// errors, and `get` answers `None` for anything unreadable.
pub trait Storage: Send {
    /// Read a value, `None` when absent or unreadable.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value. Backend failures are logged, never raised.
    fn set(&mut self, key: &str, value: &str);

    /// Delete a value if present.
    fn remove(&mut self, key: &str);
}

/// The two storage scopes a widget activation works with.
pub struct StorageArea {
    /// Survives across sessions (identity, pre-chat metadata).
    pub durable: Box<dyn Storage>,
    /// Cleared when the browsing session ends (conversation log).
    pub session: Box<dyn Storage>,
}

impl StorageArea {
    /// Pair a durable and a session backend.
    #[must_use]
    pub fn new(durable: Box<dyn Storage>, session: Box<dyn Storage>) -> Self {
        Self { durable, session }
    }

    /// Both scopes backed by fresh in-memory maps. Used by tests and demos.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStorage::new()), Box::new(MemoryStorage::new()))
    }
}

/// In-memory storage backend.
///
/// Clones share the same underlying map, mirroring how two handles to the
/// same browser storage area observe each other's writes.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        let Ok(entries) = self.entries.lock() else {
            return None;
        };
        entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_owned(), value.to_owned());
        }
    }

    fn remove(&mut self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }
}

/// File-backed storage: one JSON object per file, rewritten on every write.
///
/// Used by the terminal host for the durable scope. A missing or corrupt
/// file degrades to an empty map, matching the runtime's persistence
/// taxonomy.
pub struct JsonFileStorage {
    path: PathBuf,
    entries: HashMap<String, String>,
}

impl JsonFileStorage {
    /// Open (or start fresh at) the given path.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str::<HashMap<String, String>>(&raw).ok())
            .unwrap_or_default();
        Self { path, entries }
    }

    fn flush(&self) {
        let Ok(raw) = serde_json::to_string_pretty(&self.entries) else {
            return;
        };
        if let Err(error) = fs::write(&self.path, raw) {
            warn!(path = %self.path.display(), error = %error, "storage write failed");
        }
    }
}

impl Storage for JsonFileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_owned(), value.to_owned());
        self.flush();
    }

    fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_round_trips_values() {
        let mut storage = MemoryStorage::new();
        assert_eq!(storage.get("aiofc-userId"), None);

        storage.set("aiofc-userId", "u_abc1234");
        assert_eq!(storage.get("aiofc-userId").as_deref(), Some("u_abc1234"));

        storage.remove("aiofc-userId");
        assert_eq!(storage.get("aiofc-userId"), None);
    }

    #[test]
    fn memory_storage_clones_share_entries() {
        let mut writer = MemoryStorage::new();
        let reader = writer.clone();

        writer.set("aiofc-meta", "{}");
        assert_eq!(reader.get("aiofc-meta").as_deref(), Some("{}"));
    }

    #[test]
    fn storage_keys_carry_the_namespace_prefix() {
        for key in [KEY_CLIENT_ID, KEY_METADATA, KEY_CONVERSATION] {
            assert!(key.starts_with(STORAGE_PREFIX));
        }
    }
}
