use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process map, lost on exit
    #[default]
    Memory,
    /// Embedded sled database at `db_path`
    Sled,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: BackendKind,

    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_cache_capacity_bytes")]
    pub cache_capacity_bytes: u64,

    /// `None` disables periodic flushing
    #[serde(default = "default_flush_every_ms")]
    pub flush_every_ms: Option<u64>,

    #[serde(default = "default_use_compression")]
    pub use_compression: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            db_path: default_db_path(),
            cache_capacity_bytes: default_cache_capacity_bytes(),
            flush_every_ms: default_flush_every_ms(),
            use_compression: default_use_compression(),
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<()> {
        if self.backend == BackendKind::Sled && self.db_path.as_os_str().is_empty() {
            return Err(Error::InvalidConfig(
                "storage.db_path cannot be empty for the sled backend".into(),
            ));
        }

        if self.cache_capacity_bytes == 0 {
            return Err(Error::InvalidConfig(
                "storage.cache_capacity_bytes must be greater than 0".into(),
            ));
        }

        if self.flush_every_ms == Some(0) {
            return Err(Error::InvalidConfig(
                "storage.flush_every_ms must be greater than 0 when set".into(),
            ));
        }

        Ok(())
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("/tmp/cluster-state/db")
}
fn default_cache_capacity_bytes() -> u64 {
    10 * 1024 * 1024 //10MB
}
fn default_flush_every_ms() -> Option<u64> {
    Some(3)
}
fn default_use_compression() -> bool {
    true
}
