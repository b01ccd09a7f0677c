//! In-process backend
//!
//! Keeps every key in an ordered map guarded by a `RwLock`, stamps each
//! write with a store-wide revision, and fans updates out to prefix
//! watchers registered in a `DashMap`.
//!
//! # Watch delivery
//!
//! Notifications are pushed with `try_send` while the write lock is held, so
//! each watcher observes updates in commit order. When a watcher's buffer is
//! full the update is dropped for that watcher and a warning is logged; a
//! slow watcher never blocks the write path.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::instrument;
use tracing::trace;
use tracing::warn;

use crate::DataStore;
use crate::RawEventBatch;
use crate::RawEventReceiver;
use crate::Result;
use crate::TxStore;
use crate::TxnAction;
use crate::TxnFn;

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    mod_revision: u64,
}

#[derive(Debug)]
struct PrefixWatcher {
    prefix: String,
    sender: mpsc::Sender<RawEventBatch>,
}

/// Ordered in-memory key space with prefix watches.
///
/// Each watcher buffers at most `watch_buffer_size` undelivered batches.
/// Writes that arrive while a watcher's buffer is full are lost for that
/// watcher and never redelivered; consumers that must see every update
/// need a buffer sized for their largest burst.
#[derive(Debug)]
pub struct MemoryDataStore {
    entries: RwLock<BTreeMap<String, StoredValue>>,

    /// Last revision handed out; 0 means "never written"
    revision: AtomicU64,

    watchers: Arc<DashMap<u64, PrefixWatcher>>,
    next_watcher_id: AtomicU64,
    watch_buffer_size: usize,
}

impl MemoryDataStore {
    pub fn new(watch_buffer_size: usize) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            revision: AtomicU64::new(0),
            watchers: Arc::new(DashMap::new()),
            next_watcher_id: AtomicU64::new(1),
            watch_buffer_size: watch_buffer_size.max(1),
        }
    }

    /// Number of live prefix watchers.
    pub fn watcher_count(&self) -> usize {
        self.watchers.len()
    }

    /// Revision of the last write to `key`, 0 when absent.
    pub fn mod_revision(
        &self,
        key: &str,
    ) -> u64 {
        self.entries.read().get(key).map(|v| v.mod_revision).unwrap_or(0)
    }

    fn snapshot(
        &self,
        key: &str,
    ) -> (Option<String>, u64) {
        match self.entries.read().get(key) {
            Some(stored) => (Some(stored.value.clone()), stored.mod_revision),
            None => (None, 0),
        }
    }

    /// Inserts `value` and notifies watchers. Caller must hold the write lock.
    fn put_locked(
        &self,
        entries: &mut BTreeMap<String, StoredValue>,
        key: &str,
        value: &str,
    ) {
        let mod_revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        entries.insert(
            key.to_string(),
            StoredValue {
                value: value.to_string(),
                mod_revision,
            },
        );
        trace!(key, mod_revision, "put");
        self.notify_put(key, value);
    }

    fn notify_put(
        &self,
        key: &str,
        value: &str,
    ) {
        self.watchers.retain(|id, watcher| {
            if !key.starts_with(&watcher.prefix) {
                return true;
            }

            let batch = RawEventBatch::from([(key.to_string(), value.to_string())]);
            match watcher.sender.try_send(batch) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    warn!(watcher_id = id, key, "watcher buffer full, update dropped");
                    true
                }
                Err(TrySendError::Closed(_)) => {
                    trace!(watcher_id = id, "watcher receiver gone, unregistering");
                    false
                }
            }
        });
    }
}

impl Default for MemoryDataStore {
    fn default() -> Self {
        Self::new(128)
    }
}

#[async_trait]
impl DataStore for MemoryDataStore {
    async fn get(
        &self,
        key: &str,
    ) -> Result<HashMap<String, String>> {
        let entries = self.entries.read();
        Ok(entries
            .get(key)
            .map(|stored| (key.to_string(), stored.value.clone()))
            .into_iter()
            .collect())
    }

    async fn get_with_prefix(
        &self,
        prefix: &str,
    ) -> Result<HashMap<String, String>> {
        let entries = self.entries.read();
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, stored)| (k.clone(), stored.value.clone()))
            .collect())
    }

    async fn add(
        &self,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let mut entries = self.entries.write();
        self.put_locked(&mut entries, key, value);
        Ok(())
    }

    async fn delete(
        &self,
        key: &str,
    ) -> Result<u64> {
        let removed = self.entries.write().remove(key);
        trace!(key, removed = removed.is_some(), "delete");
        Ok(removed.map(|_| 1).unwrap_or(0))
    }

    #[instrument(skip(self, cancel))]
    async fn stream_with_prefix(
        &self,
        cancel: CancellationToken,
        prefix: &str,
    ) -> Result<RawEventReceiver> {
        let id = self.next_watcher_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.watch_buffer_size);
        let closed = sender.clone();

        self.watchers.insert(
            id,
            PrefixWatcher {
                prefix: prefix.to_string(),
                sender,
            },
        );
        debug!(watcher_id = id, prefix, "watcher registered");

        // Unregister on cancellation or once the receiving side is dropped.
        // Removing the entry drops the last sender, which closes the receiver.
        let watchers = self.watchers.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = closed.closed() => {}
            }
            drop(closed);
            watchers.remove(&id);
            debug!(watcher_id = id, "watcher unregistered");
        });

        Ok(receiver)
    }
}

#[async_trait]
impl TxStore for MemoryDataStore {
    async fn execute_repeatable(
        &self,
        key: &str,
        apply: TxnFn,
    ) -> Result<()> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let (current, read_revision) = self.snapshot(key);

            let value = match apply(current.as_deref())? {
                TxnAction::Skip => {
                    trace!(key, attempt, "transaction skipped write");
                    return Ok(());
                }
                TxnAction::Put(value) => value,
            };

            let committed = {
                let mut entries = self.entries.write();
                let now = entries.get(key).map(|v| v.mod_revision).unwrap_or(0);
                if now == read_revision {
                    self.put_locked(&mut entries, key, &value);
                    true
                } else {
                    false
                }
            };

            if committed {
                trace!(key, attempt, "transaction committed");
                return Ok(());
            }

            debug!(key, attempt, "transaction conflict, retrying");
            tokio::task::yield_now().await;
        }
    }
}
