use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use snafu::ResultExt;

use super::KeyValueStore;
use super::error::{
    CreateDirectorySnafu, ParseFileSnafu, ReadFileSnafu, RenameTempFileSnafu, SerializeStateSnafu,
    StorageResult, WriteFileSnafu,
};

/// Key-value store backed by one JSON object on disk.
///
/// The whole object is cached in memory and rewritten through a temporary file on every
/// mutation, so a crash never leaves a half-written state file behind.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let entries = Self::load_from_disk(&path)?;
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_disk(path: &Path) -> StorageResult<BTreeMap<String, String>> {
        if !path.exists() {
            tracing::info!("state file not found at {:?}, starting empty", path);
            return Ok(BTreeMap::new());
        }

        let content = std::fs::read_to_string(path).context(ReadFileSnafu {
            stage: "read-state-file",
            path: path.to_path_buf(),
        })?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&content).context(ParseFileSnafu {
            stage: "parse-state-file",
            path: path.to_path_buf(),
        })
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).context(CreateDirectorySnafu {
                stage: "create-state-directory",
                path: parent.to_path_buf(),
            })?;
        }

        let content = serde_json::to_string_pretty(entries).context(SerializeStateSnafu {
            stage: "serialize-state-json",
        })?;

        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, content).context(WriteFileSnafu {
            stage: "write-temporary-state-file",
            path: temp_path.clone(),
        })?;

        std::fs::rename(&temp_path, &self.path).context(RenameTempFileSnafu {
            stage: "rename-temporary-state-file",
            from: temp_path,
            to: self.path.clone(),
        })?;

        tracing::debug!("saved state to {:?}", self.path);
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.get(key).map(String::as_str) == Some(value) {
            return Ok(());
        }

        let mut next = entries.clone();
        next.insert(key.to_string(), value.to_string());
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if !entries.contains_key(key) {
            return Ok(());
        }

        let mut next = entries.clone();
        next.remove(key);
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }
}
