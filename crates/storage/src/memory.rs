use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::KeyValueStore;
use super::error::StorageResult;

/// Process-local store; nothing outlives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        let store = Self::new();
        store
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
        store
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("chat_session_id").unwrap(), None);

        store.set("chat_session_id", "abc").unwrap();
        assert_eq!(store.get("chat_session_id").unwrap().as_deref(), Some("abc"));

        store.set("chat_session_id", "def").unwrap();
        assert_eq!(store.get("chat_session_id").unwrap().as_deref(), Some("def"));

        store.remove("chat_session_id").unwrap();
        assert_eq!(store.get("chat_session_id").unwrap(), None);
        // Removing a missing key is not an error.
        store.remove("chat_session_id").unwrap();
    }
}
