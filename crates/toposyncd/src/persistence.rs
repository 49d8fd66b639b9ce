//! Best-effort asynchronous persistence of applied topology updates.
//!
//! Persistence is a side effect that happens *after* an in-memory commit
//! succeeds, decoupled through a bounded queue. A backend failure is logged
//! and counted; it never rolls back or blocks the in-memory state. The store
//! converges toward durable storage eventually, not transactionally.

use crate::error::Result;
use crate::metrics::MetricsCollector;
use crate::types::{IslLink, SwitchNode};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use topo_types::SwitchId;
use tracing::{debug, info, warn};

/// An update that was committed to the in-memory store.
///
/// This doubles as the derived event stream for downstream observability
/// consumers: the persistence worker is simply its first subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppliedUpdate {
    /// A switch was created or updated.
    SwitchUpserted(SwitchNode),
    /// A switch was tombstoned.
    SwitchRemoved {
        /// The removed switch.
        switch_id: SwitchId,
        /// Timestamp of the REMOVE event.
        timestamp: i64,
    },
    /// A link was created or updated.
    LinkUpserted(IslLink),
}

/// Narrow interface to whatever durable store sits behind the daemon.
#[async_trait]
pub trait PersistenceBackend: Send + Sync {
    /// Persists one applied update. Failures are reported, not retried here.
    async fn persist(&self, update: &AppliedUpdate) -> Result<()>;
}

/// Backend that only logs, for deployments without a durable store and for
/// tests.
#[derive(Debug, Default)]
pub struct LogOnlyBackend;

#[async_trait]
impl PersistenceBackend for LogOnlyBackend {
    async fn persist(&self, update: &AppliedUpdate) -> Result<()> {
        match update {
            AppliedUpdate::SwitchUpserted(node) => {
                debug!(switch_id = %node.switch_id, state = ?node.state, "persist: switch upserted");
            }
            AppliedUpdate::SwitchRemoved {
                switch_id,
                timestamp,
            } => {
                debug!(switch_id = %switch_id, timestamp, "persist: switch removed");
            }
            AppliedUpdate::LinkUpserted(link) => {
                debug!(link = %link.endpoints, "persist: link upserted");
            }
        }
        Ok(())
    }
}

/// Drains the persistence queue into a backend.
pub struct PersistenceWorker {
    receiver: mpsc::Receiver<AppliedUpdate>,
    backend: Box<dyn PersistenceBackend>,
    metrics: MetricsCollector,
}

impl PersistenceWorker {
    /// Creates the worker plus the sender side handed to the dispatcher.
    pub fn new(
        capacity: usize,
        backend: Box<dyn PersistenceBackend>,
        metrics: MetricsCollector,
    ) -> (mpsc::Sender<AppliedUpdate>, Self) {
        let (sender, receiver) = mpsc::channel(capacity);
        (
            sender,
            PersistenceWorker {
                receiver,
                backend,
                metrics,
            },
        )
    }

    /// Runs until cancelled *and* drained.
    ///
    /// On shutdown the queue is drained first so updates committed in memory
    /// before the signal still reach the backend.
    pub async fn run(mut self, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                update = self.receiver.recv() => {
                    match update {
                        Some(update) => self.persist_one(&update).await,
                        None => break, // all senders gone
                    }
                }
                _ = shutdown.cancelled() => {
                    self.receiver.close();
                    while let Some(update) = self.receiver.recv().await {
                        self.persist_one(&update).await;
                    }
                    break;
                }
            }
            self.metrics
                .persistence_queue_depth
                .set(self.receiver.len() as f64);
        }
        info!("persistence worker stopped");
    }

    async fn persist_one(&self, update: &AppliedUpdate) {
        if let Err(e) = self.backend.persist(update).await {
            // Best-effort: the in-memory commit stands regardless.
            self.metrics.persistence_failures_total.inc();
            warn!(error = %e, "persistence attempt failed");
        }
    }
}

/// Backend wrapper that always fails, for failure-path tests.
#[cfg(test)]
pub struct FailingBackend;

#[cfg(test)]
#[async_trait]
impl PersistenceBackend for FailingBackend {
    async fn persist(&self, _update: &AppliedUpdate) -> Result<()> {
        Err(crate::error::ToposyncError::Persistence(
            "backend down".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SwitchNode, SwitchState};

    fn sample_update() -> AppliedUpdate {
        AppliedUpdate::SwitchUpserted(SwitchNode::new(
            SwitchId::from_u64(1),
            SwitchState::Active,
            10,
        ))
    }

    #[tokio::test]
    async fn test_worker_drains_queue_on_shutdown() {
        let metrics = MetricsCollector::new().unwrap();
        let (sender, worker) =
            PersistenceWorker::new(8, Box::new(LogOnlyBackend), metrics.clone());

        sender.send(sample_update()).await.unwrap();
        sender.send(sample_update()).await.unwrap();

        let shutdown = CancellationToken::new();
        shutdown.cancel();
        worker.run(shutdown).await;

        assert_eq!(metrics.persistence_failures_total.get(), 0.0);
    }

    #[tokio::test]
    async fn test_backend_failure_counts_but_does_not_propagate() {
        let metrics = MetricsCollector::new().unwrap();
        let (sender, worker) = PersistenceWorker::new(8, Box::new(FailingBackend), metrics.clone());

        sender.send(sample_update()).await.unwrap();
        drop(sender);

        // Worker finishes normally despite backend failures.
        worker.run(CancellationToken::new()).await;
        assert_eq!(metrics.persistence_failures_total.get(), 1.0);
    }

    #[tokio::test]
    async fn test_worker_stops_when_senders_dropped() {
        let metrics = MetricsCollector::new().unwrap();
        let (sender, worker) = PersistenceWorker::new(8, Box::new(LogOnlyBackend), metrics);
        drop(sender);
        // Must return promptly with no updates and no cancellation.
        worker.run(CancellationToken::new()).await;
    }
}
