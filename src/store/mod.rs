//! Container instance persistence
//!
//! [`ContainerInstanceStore`] is the only surface callers see. It turns
//! instance documents into keyed backend records, reads them back, and
//! exposes the backend change feed as a stream of decoded instances.

mod instance_store;
mod stream;

pub use instance_store::*;
pub use stream::CloseReason;
pub use stream::StreamState;

pub(crate) use stream::InstanceStreamWorker;


use std::collections::HashMap;

use async_trait::async_trait;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::ContainerInstance;
use crate::Result;

/// One item of an instance change stream
pub type ContainerInstanceEvent = Result<ContainerInstance>;

pub type InstanceEventStream = ReceiverStream<ContainerInstanceEvent>;

#[async_trait]
pub trait ContainerInstanceStore: Send + Sync + 'static {
    /// Stores `document` unless an equal-or-newer version is already stored.
    ///
    /// Compare and write happen in one backend transaction, so concurrent
    /// writers cannot regress the stored version.
    async fn add_instance(
        &self,
        document: &str,
    ) -> Result<()>;

    /// Unconditional write for documents carrying the unversioned sentinel.
    async fn add_unversioned_instance(
        &self,
        document: &str,
    ) -> Result<()>;

    /// `cluster` may be a short name or a full ARN.
    async fn get_instance(
        &self,
        cluster: &str,
        instance_arn: &str,
    ) -> Result<Option<ContainerInstance>>;

    async fn list_instances(&self) -> Result<Vec<ContainerInstance>>;

    /// Supported keys are `status` and `cluster`. A `cluster` filter
    /// narrows the backend scan to that cluster's key range.
    async fn filter_instances(
        &self,
        filters: &HashMap<String, String>,
    ) -> Result<Vec<ContainerInstance>>;

    /// Starts a change stream over every instance key.
    ///
    /// The stream ends when `cancel` fires, when the backend feed closes,
    /// or right after a decode failure has been delivered.
    async fn stream_instances(
        &self,
        cancel: CancellationToken,
    ) -> Result<InstanceEventStream>;

    /// Deleting a missing instance is not an error.
    async fn delete_instance(
        &self,
        cluster: &str,
        instance_arn: &str,
    ) -> Result<()>;
}
