//! Storage layer: repository and event-type registries plus append-only
//! event persistence, with in-memory and JSON-file backends.

pub mod backends;
pub mod error;
pub mod traits;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use backends::file::FileStore;
pub use backends::memory::MemoryStore;
pub use error::{StoreError, StoreResult};
pub use traits::{EventStore, MonitorStore, RepositoryStore};
pub use types::{slugify, Event, EventType, Repository};

/// Storage backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Ephemeral, for tests and dry runs.
    Memory,
    /// JSON documents under the data directory.
    #[default]
    File,
}

/// The `[storage]` configuration table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Defaults to `~/.repowatch` when unset.
    pub data_dir: Option<PathBuf>,
}

/// Open the configured storage backend.
pub async fn open_store(config: &StorageConfig) -> StoreResult<Arc<dyn MonitorStore>> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StorageBackend::File => {
            let dir = config.data_dir.clone().unwrap_or_else(default_data_dir);
            Ok(Arc::new(FileStore::open(dir).await?))
        }
    }
}

/// `~/.repowatch`, falling back to the working directory when no home
/// directory can be determined.
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".repowatch"))
        .unwrap_or_else(|| PathBuf::from(".repowatch"))
}
