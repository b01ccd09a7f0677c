#[cfg(test)]
use mockall::automock;
use async_trait::async_trait;

use crate::Result;

/// Outcome of one read-modify-write attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxnAction {
    /// Replace the value at the key
    Put(String),
    /// Leave the key untouched
    Skip,
}

/// Read-modify-write step. Receives the value currently stored at the key
/// (`None` when absent) and may be invoked once per attempt.
pub type TxnFn = Box<dyn Fn(Option<&str>) -> Result<TxnAction> + Send + Sync>;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait TxStore: Send + Sync + 'static {
    /// Runs `apply` against `key` and commits its decision atomically with
    /// respect to other transactions on the same key, retrying on conflict
    /// until the commit succeeds. Errors returned by `apply` abort the
    /// transaction and are propagated unchanged.
    async fn execute_repeatable(
        &self,
        key: &str,
        apply: TxnFn,
    ) -> Result<()>;
}

/// Boxes a closure as a [`TxnFn`], letting the compiler infer its signature.
pub fn txn_fn<F>(f: F) -> TxnFn
where
    F: Fn(Option<&str>) -> Result<TxnAction> + Send + Sync + 'static,
{
    Box::new(f)
}
