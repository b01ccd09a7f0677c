use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogConfig {
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Used when `RUST_LOG` is not set
    #[serde(default = "default_filter")]
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            default_filter: default_filter(),
        }
    }
}

impl LogConfig {
    pub fn validate(&self) -> Result<()> {
        if self.log_dir.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("log.log_dir cannot be empty".into()));
        }
        Ok(())
    }
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("/tmp/cluster-state/logs")
}
fn default_filter() -> String {
    "info".to_string()
}
