pub mod error;
pub mod file;
pub mod ids;
pub mod memory;

pub use error::{StorageError, StorageResult};
pub use file::JsonFileStore;
pub use ids::SessionId;
pub use memory::MemoryStore;

/// Small string key-value capability used for dashboard state that must survive restarts.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    fn remove(&self, key: &str) -> StorageResult<()>;
}
