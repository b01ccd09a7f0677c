//! Backend store capabilities
//!
//! The store component never keeps record copies; everything lives behind
//! these two traits:
//! - [`DataStore`]: point/prefix reads, writes, deletes and prefix watches
//! - [`TxStore`]: repeatable read-modify-write against a single key
//!
//! Adaptors for an in-process map and for an embedded sled database live in
//! [`adaptors`]; [`open_backend`] picks one from [`StorageConfig`].

mod adaptors;
mod data_store;
mod tx_store;

pub use adaptors::*;
pub use data_store::*;
pub use tx_store::*;

use std::sync::Arc;

use tracing::info;

use crate::BackendKind;
use crate::Result;
use crate::StorageConfig;

/// A backend that offers both capabilities.
pub trait Backend: DataStore + TxStore {}
impl<B: DataStore + TxStore> Backend for B {}

/// Opens the backend selected in `config`.
pub fn open_backend(
    config: &StorageConfig,
    watch_buffer_size: usize,
) -> Result<Arc<dyn Backend>> {
    info!(backend = ?config.backend, "opening backend");

    let backend: Arc<dyn Backend> = match config.backend {
        BackendKind::Memory => Arc::new(MemoryDataStore::new(watch_buffer_size)),
        BackendKind::Sled => Arc::new(SledDataStore::open(config, watch_buffer_size)?),
    };
    Ok(backend)
}
