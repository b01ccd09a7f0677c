use std::collections::HashMap;

#[cfg(test)]
use mockall::automock;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::Result;

/// One backend watch notification: updated key -> new document.
pub type RawEventBatch = HashMap<String, String>;

/// Receiving half of a prefix watch. Closed by the backend when the watch
/// ends (cancellation, backend shutdown).
pub type RawEventReceiver = mpsc::Receiver<RawEventBatch>;

/// Key-value capability consumed by the container instance store.
///
/// Reads return maps keyed by backend key. A point [`DataStore::get`] may by
/// construction yield 0, 1 or N entries; callers decide what N > 1 means.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DataStore: Send + Sync + 'static {
    async fn get(
        &self,
        key: &str,
    ) -> Result<HashMap<String, String>>;

    async fn get_with_prefix(
        &self,
        prefix: &str,
    ) -> Result<HashMap<String, String>>;

    /// Unconditional write
    async fn add(
        &self,
        key: &str,
        value: &str,
    ) -> Result<()>;

    /// Returns the number of deleted keys
    async fn delete(
        &self,
        key: &str,
    ) -> Result<u64>;

    /// Watches every key under `prefix` from now on. Only inserts and
    /// updates are delivered.
    async fn stream_with_prefix(
        &self,
        cancel: CancellationToken,
        prefix: &str,
    ) -> Result<RawEventReceiver>;
}
