use std::collections::HashMap;

use async_trait::async_trait;
use sled::IVec;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::instrument;
use tracing::trace;
use tracing::warn;

use crate::DataStore;
use crate::RawEventBatch;
use crate::RawEventReceiver;
use crate::Result;
use crate::StorageConfig;
use crate::StorageError;
use crate::TxStore;
use crate::TxnAction;
use crate::TxnFn;

/// Sled tree holding instance documents
const INSTANCE_TREE: &str = "instances";

/// Persistent backend over an embedded sled database.
///
/// Transactions are optimistic: read, decide, then `compare_and_swap`
/// against the value that was read, retrying on mismatch.
#[derive(Debug, Clone)]
pub struct SledDataStore {
    tree: sled::Tree,
    watch_buffer_size: usize,
}

pub fn init_sled_instance_db(config: &StorageConfig) -> std::result::Result<sled::Db, std::io::Error> {
    debug!("init_sled_instance_db from path: {:?}", &config.db_path);

    sled::Config::default()
        .path(&config.db_path)
        .cache_capacity(config.cache_capacity_bytes)
        .flush_every_ms(config.flush_every_ms)
        .use_compression(config.use_compression)
        .compression_factor(1)
        .open()
        .map_err(|e| {
            warn!(
                "Try to open DB at this location: {:?} and failed: {:?}",
                config.db_path, e
            );
            std::io::Error::other(e)
        })
}

impl SledDataStore {
    pub fn open(
        config: &StorageConfig,
        watch_buffer_size: usize,
    ) -> Result<Self> {
        let db = init_sled_instance_db(config).map_err(|source| StorageError::PathError {
            path: config.db_path.clone(),
            source,
        })?;
        Self::from_db(&db, watch_buffer_size)
    }

    pub fn from_db(
        db: &sled::Db,
        watch_buffer_size: usize,
    ) -> Result<Self> {
        Ok(Self {
            tree: db.open_tree(INSTANCE_TREE)?,
            watch_buffer_size: watch_buffer_size.max(1),
        })
    }

    pub fn flush(&self) -> Result<()> {
        self.tree.flush()?;
        Ok(())
    }
}

fn ivec_to_string(
    key: &[u8],
    value: &IVec,
) -> std::result::Result<String, StorageError> {
    String::from_utf8(value.to_vec()).map_err(|_| StorageError::Encoding {
        key: String::from_utf8_lossy(key).into_owned(),
    })
}

fn key_to_string(key: &[u8]) -> std::result::Result<String, StorageError> {
    String::from_utf8(key.to_vec()).map_err(|_| StorageError::Encoding {
        key: String::from_utf8_lossy(key).into_owned(),
    })
}

#[async_trait]
impl DataStore for SledDataStore {
    #[instrument(skip(self))]
    async fn get(
        &self,
        key: &str,
    ) -> Result<HashMap<String, String>> {
        let mut result = HashMap::new();
        if let Some(value) = self.tree.get(key)? {
            result.insert(key.to_string(), ivec_to_string(key.as_bytes(), &value)?);
        }
        Ok(result)
    }

    #[instrument(skip(self))]
    async fn get_with_prefix(
        &self,
        prefix: &str,
    ) -> Result<HashMap<String, String>> {
        let mut result = HashMap::new();
        for item in self.tree.scan_prefix(prefix) {
            let (key, value) = item?;
            result.insert(key_to_string(&key)?, ivec_to_string(&key, &value)?);
        }
        trace!(prefix, matches = result.len(), "scan_prefix");
        Ok(result)
    }

    async fn add(
        &self,
        key: &str,
        value: &str,
    ) -> Result<()> {
        self.tree.insert(key, value.as_bytes())?;
        Ok(())
    }

    async fn delete(
        &self,
        key: &str,
    ) -> Result<u64> {
        Ok(self.tree.remove(key)?.map(|_| 1).unwrap_or(0))
    }

    #[instrument(skip(self, cancel))]
    async fn stream_with_prefix(
        &self,
        cancel: CancellationToken,
        prefix: &str,
    ) -> Result<RawEventReceiver> {
        let mut subscriber = self.tree.watch_prefix(prefix.as_bytes());
        let (tx, rx) = mpsc::channel::<RawEventBatch>(self.watch_buffer_size);
        let prefix = prefix.to_string();

        tokio::spawn(async move {
            debug!(%prefix, "sled watch started");
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tx.closed() => break,
                    event = &mut subscriber => match event {
                        Some(sled::Event::Insert { key, value }) => {
                            let batch = match (key_to_string(&key), ivec_to_string(&key, &value)) {
                                (Ok(k), Ok(v)) => RawEventBatch::from([(k, v)]),
                                (Err(e), _) | (_, Err(e)) => {
                                    warn!(error = %e, "skipping undecodable watch event");
                                    continue;
                                }
                            };
                            if tx.send(batch).await.is_err() {
                                break;
                            }
                        }
                        Some(sled::Event::Remove { .. }) => continue,
                        None => break,
                    }
                }
            }
            debug!(%prefix, "sled watch stopped");
        });

        Ok(rx)
    }
}

#[async_trait]
impl TxStore for SledDataStore {
    async fn execute_repeatable(
        &self,
        key: &str,
        apply: TxnFn,
    ) -> Result<()> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let current = self.tree.get(key)?;
            let current_str = current
                .as_ref()
                .map(|v| ivec_to_string(key.as_bytes(), v))
                .transpose()?;

            let value = match apply(current_str.as_deref())? {
                TxnAction::Skip => {
                    trace!(key, attempt, "transaction skipped write");
                    return Ok(());
                }
                TxnAction::Put(value) => value,
            };

            match self.tree.compare_and_swap(key, current.as_ref(), Some(value.as_bytes()))? {
                Ok(()) => {
                    trace!(key, attempt, "transaction committed");
                    return Ok(());
                }
                Err(_) => {
                    debug!(key, attempt, "transaction conflict, retrying");
                    tokio::task::yield_now().await;
                }
            }
        }
    }
}
