//! Change-stream adapter
//!
//! One backend prefix watch feeds one [`InstanceStreamWorker`], which is the
//! sole producer of one downstream event queue. The worker decodes every
//! document it receives and republishes it as a [`ContainerInstanceEvent`].
//!
//! ```text
//!  backend watch ──▶ InstanceStreamWorker ──▶ mpsc ──▶ consumer
//!                     Running
//!                       │ cancel, source closed, decode failure or consumer gone
//!                       ▼
//!                     Closing(reason) ──▶ Closed (downstream sender dropped)
//! ```
//!
//! A malformed document ends the stream: the failure is delivered as the
//! last event and the queue is closed, even if the backend watch is still
//! open. Consumers observe the end as `None` from the stream.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::decode_instance;
use crate::ContainerInstanceEvent;
use crate::RawEventBatch;
use crate::RawEventReceiver;

/// Why a stream stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Caller's cancellation token fired
    Cancelled,
    /// Backend closed the watch
    SourceClosed,
    /// A document failed to decode; the failure was the final event
    DecodeFailed,
    /// Consumer dropped its end of the queue
    ConsumerDropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Running,
    Closing(CloseReason),
    Closed,
}

pub(crate) struct InstanceStreamWorker {
    upstream: RawEventReceiver,
    downstream: Option<mpsc::Sender<ContainerInstanceEvent>>,
    cancel: CancellationToken,
    state: StreamState,
}

impl InstanceStreamWorker {
    pub(crate) fn new(
        upstream: RawEventReceiver,
        downstream: mpsc::Sender<ContainerInstanceEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            upstream,
            downstream: Some(downstream),
            cancel,
            state: StreamState::Running,
        }
    }

    pub(crate) fn state(&self) -> StreamState {
        self.state
    }

    /// Drives the worker until it reaches [`StreamState::Closed`].
    pub(crate) async fn run(mut self) -> CloseReason {
        debug!("instance stream worker started");

        while self.state == StreamState::Running {
            self.step().await;
        }

        let reason = match self.state {
            StreamState::Closing(reason) => reason,
            // run() only leaves the loop through Closing
            _ => CloseReason::SourceClosed,
        };
        self.close();

        debug!(?reason, "instance stream worker stopped");
        reason
    }

    /// Waits for the next backend batch, cancellation, or the consumer going
    /// away, whichever is first.
    async fn step(&mut self) {
        let downstream = &self.downstream;
        let consumer_gone = async move {
            if let Some(tx) = downstream {
                tx.closed().await;
            }
        };

        let next = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(CloseReason::Cancelled),
            _ = consumer_gone => Err(CloseReason::ConsumerDropped),
            batch = self.upstream.recv() => Ok(batch),
        };

        match next {
            Ok(Some(batch)) => self.publish_batch(batch).await,
            Ok(None) => self.begin_close(CloseReason::SourceClosed),
            Err(reason) => self.begin_close(reason),
        }
    }

    async fn publish_batch(
        &mut self,
        batch: RawEventBatch,
    ) {
        trace!(updates = batch.len(), "backend batch received");

        for (key, document) in batch {
            match decode_instance(&document) {
                Ok(instance) => {
                    if !self.publish(Ok(instance)).await {
                        return;
                    }
                }
                Err(e) => {
                    warn!(%key, error = %e, "malformed instance in change stream, closing");
                    if self.publish(Err(e.into())).await {
                        self.begin_close(CloseReason::DecodeFailed);
                    }
                    return;
                }
            }
        }
    }

    /// Returns `false` when the event could not be delivered and the worker
    /// moved to Closing.
    async fn publish(
        &mut self,
        event: ContainerInstanceEvent,
    ) -> bool {
        let Some(tx) = self.downstream.as_ref() else {
            return false;
        };

        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(CloseReason::Cancelled),
            sent = tx.send(event) => sent.map_err(|_| CloseReason::ConsumerDropped),
        };

        match outcome {
            Ok(()) => true,
            Err(reason) => {
                self.begin_close(reason);
                false
            }
        }
    }

    /// Running -> Closing. The first trigger wins; later ones are ignored.
    fn begin_close(
        &mut self,
        reason: CloseReason,
    ) {
        if self.state == StreamState::Running {
            trace!(?reason, "instance stream closing");
            self.state = StreamState::Closing(reason);
        }
    }

    /// Closing -> Closed. Dropping the sender is what the consumer observes
    /// as end-of-stream; calling this again is a no-op.
    fn close(&mut self) {
        if self.state == StreamState::Closed {
            return;
        }
        self.downstream.take();
        self.upstream.close();
        self.state = StreamState::Closed;
    }
}
