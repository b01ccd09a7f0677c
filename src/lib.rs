//! Authoritative store for container-instance records.
//!
//! Documents are kept in a strongly consistent key-value backend, one key per
//! instance, partitioned by cluster. Versioned writes never regress a stored
//! record; reads, listings and filters decode straight from the backend; and
//! [`ContainerInstanceStore::stream_instances`] turns the backend's change
//! feed into a cancellable stream of decoded instances.
//!
//! ```text
//!  caller ──▶ ContainerInstanceStore ──▶ DataStore / TxStore ──▶ memory | sled
//!                     ▲                          │
//!                     └── InstanceEventStream ◀──┘ prefix watch
//! ```

mod config;
mod errors;
mod instance;
mod storage;
mod store;
pub mod utils;

pub use config::*;
pub use errors::*;
pub use instance::*;
pub use storage::*;
pub use store::*;
pub use utils::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
