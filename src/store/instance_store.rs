use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::instrument;
use tracing::trace;

use super::ContainerInstanceStore;
use super::InstanceEventStream;
use super::InstanceStreamWorker;
use crate::cluster_prefix;
use crate::decode_instance;
use crate::instance_key;
use crate::require_non_empty;
use crate::txn_fn;
use crate::validate_for_write;
use crate::validate_unversioned;
use crate::validate_versioned;
use crate::ContainerInstance;
use crate::DataStore;
use crate::Error;
use crate::InstanceFilter;
use crate::Result;
use crate::StreamConfig;
use crate::TxStore;
use crate::TxnAction;
use crate::INSTANCE_KEY_PREFIX;

pub struct DefaultContainerInstanceStore<D, T>
where
    D: DataStore + ?Sized,
    T: TxStore + ?Sized,
{
    data_store: Arc<D>,
    tx_store: Arc<T>,
    stream_config: StreamConfig,
}

impl<D, T> DefaultContainerInstanceStore<D, T>
where
    D: DataStore + ?Sized,
    T: TxStore + ?Sized,
{
    pub fn new(
        data_store: Arc<D>,
        tx_store: Arc<T>,
        stream_config: StreamConfig,
    ) -> Self {
        Self {
            data_store,
            tx_store,
            stream_config,
        }
    }
}

/// Incoming documents that fail to parse are the caller's fault.
fn decode_incoming(document: &str) -> Result<ContainerInstance> {
    require_non_empty("instance document", document)?;
    decode_instance(document)
        .map_err(|e| Error::InvalidInput(format!("instance document could not be decoded: {e}")))
}

/// All-or-nothing: one corrupt record fails the whole read.
fn decode_all(records: HashMap<String, String>) -> Result<Vec<ContainerInstance>> {
    records
        .into_iter()
        .map(|(key, document)| {
            decode_instance(&document).map_err(|e| {
                debug!(%key, error = %e, "stored instance is malformed");
                Error::from(e)
            })
        })
        .collect()
}

#[async_trait]
impl<D, T> ContainerInstanceStore for DefaultContainerInstanceStore<D, T>
where
    D: DataStore + ?Sized,
    T: TxStore + ?Sized,
{
    #[instrument(skip_all)]
    async fn add_instance(
        &self,
        document: &str,
    ) -> Result<()> {
        let instance = decode_incoming(document)?;
        validate_for_write(&instance)?;
        validate_versioned(&instance)?;

        let key = instance_key(instance.cluster_arn(), instance.instance_arn());
        let incoming_version = instance.version();
        let document = document.to_string();

        self.tx_store
            .execute_repeatable(
                &key,
                txn_fn(move |current| {
                    let Some(stored) = current else {
                        return Ok(TxnAction::Put(document.clone()));
                    };
                    // `None < Some(_)`, so a stored record without a version
                    // always loses to a versioned one.
                    let stored_version = decode_instance(stored)?.version();
                    if incoming_version > stored_version {
                        Ok(TxnAction::Put(document.clone()))
                    } else {
                        trace!(?incoming_version, ?stored_version, "stale instance write skipped");
                        Ok(TxnAction::Skip)
                    }
                }),
            )
            .await
    }

    #[instrument(skip_all)]
    async fn add_unversioned_instance(
        &self,
        document: &str,
    ) -> Result<()> {
        let instance = decode_incoming(document)?;
        validate_for_write(&instance)?;
        validate_unversioned(&instance)?;

        let key = instance_key(instance.cluster_arn(), instance.instance_arn());
        self.data_store.add(&key, document).await
    }

    #[instrument(skip(self))]
    async fn get_instance(
        &self,
        cluster: &str,
        instance_arn: &str,
    ) -> Result<Option<ContainerInstance>> {
        require_non_empty("cluster", cluster)?;
        require_non_empty("instance ARN", instance_arn)?;

        let key = instance_key(cluster, instance_arn);
        let results = self.data_store.get(&key).await?;

        if results.len() > 1 {
            return Err(Error::AmbiguousResult {
                key,
                matches: results.len(),
            });
        }

        match results.into_values().next() {
            Some(document) => Ok(Some(decode_instance(&document)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn list_instances(&self) -> Result<Vec<ContainerInstance>> {
        let records = self.data_store.get_with_prefix(INSTANCE_KEY_PREFIX).await?;
        decode_all(records)
    }

    #[instrument(skip(self))]
    async fn filter_instances(
        &self,
        filters: &HashMap<String, String>,
    ) -> Result<Vec<ContainerInstance>> {
        let filter = InstanceFilter::parse(filters)?;

        let prefix = match filter.cluster.as_deref() {
            Some(cluster) => cluster_prefix(cluster),
            None => INSTANCE_KEY_PREFIX.to_string(),
        };
        let records = self.data_store.get_with_prefix(&prefix).await?;

        let mut instances = decode_all(records)?;
        instances.retain(|instance| filter.matches(instance));
        debug!(%prefix, matches = instances.len(), "filtered instances");
        Ok(instances)
    }

    #[instrument(skip_all)]
    async fn stream_instances(
        &self,
        cancel: CancellationToken,
    ) -> Result<InstanceEventStream> {
        let upstream = self
            .data_store
            .stream_with_prefix(cancel.clone(), INSTANCE_KEY_PREFIX)
            .await?;

        let (tx, rx) = mpsc::channel(self.stream_config.event_buffer_size.max(1));
        let worker = InstanceStreamWorker::new(upstream, tx, cancel);
        tokio::spawn(worker.run());

        Ok(ReceiverStream::new(rx))
    }

    #[instrument(skip(self))]
    async fn delete_instance(
        &self,
        cluster: &str,
        instance_arn: &str,
    ) -> Result<()> {
        require_non_empty("cluster", cluster)?;
        require_non_empty("instance ARN", instance_arn)?;

        let key = instance_key(cluster, instance_arn);
        let deleted = self.data_store.delete(&key).await?;
        debug!(%key, deleted, "instance delete");
        Ok(())
    }
}
