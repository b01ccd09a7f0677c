use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Change-stream buffering
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StreamConfig {
    /// Capacity of the typed event queue handed to each stream consumer
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,

    /// Capacity of the raw backend watch channel
    #[serde(default = "default_watch_buffer_size")]
    pub watch_buffer_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: default_event_buffer_size(),
            watch_buffer_size: default_watch_buffer_size(),
        }
    }
}

impl StreamConfig {
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::InvalidConfig(
                "stream.event_buffer_size must be greater than 0".into(),
            ));
        }
        if self.watch_buffer_size == 0 {
            return Err(Error::InvalidConfig(
                "stream.watch_buffer_size must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

fn default_event_buffer_size() -> usize {
    64
}
fn default_watch_buffer_size() -> usize {
    128
}
