//! Event dispatch: routing decoded events to store operations.
//!
//! The dispatcher owns the ordering/idempotence policy (delegated to the
//! store's timestamp checks), the per-outcome accounting, and the best-effort
//! hand-off of applied updates to the persistence queue. Nothing here stops
//! the event stream: every outcome is counted and logged, then the loop asks
//! for the next event.

use crate::error::ValidationError;
use crate::metrics::MetricsCollector;
use crate::persistence::AppliedUpdate;
use crate::store::{StoreRejection, TopologyStore};
use crate::types::{DecodedEvent, IslEvent, SwitchEvent, SwitchEventKind};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// What happened to one dispatched event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Event mutated the store.
    Applied,
    /// Event was older than the entity's recorded state; discarded.
    Stale,
    /// Event targeted a tombstoned entity; discarded.
    TombstoneConflict,
    /// Link mutation failed structural validation; store unchanged.
    Rejected(ValidationError),
}

/// Routes decoded events to the topology store.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<TopologyStore>,
    metrics: MetricsCollector,
    applied_tx: Option<mpsc::Sender<AppliedUpdate>>,
}

impl Dispatcher {
    /// Creates a dispatcher without a persistence queue (tests, tools).
    pub fn new(store: Arc<TopologyStore>, metrics: MetricsCollector) -> Self {
        Dispatcher {
            store,
            metrics,
            applied_tx: None,
        }
    }

    /// Attaches the persistence/derived-event queue.
    pub fn with_applied_queue(mut self, sender: mpsc::Sender<AppliedUpdate>) -> Self {
        self.applied_tx = Some(sender);
        self
    }

    /// Dispatches one decoded event, returning what happened to it.
    ///
    /// Replaying an identical event yields the identical store state; the
    /// outcome classification may differ (e.g. a replayed REMOVE reports a
    /// tombstone conflict) but the snapshot does not.
    pub fn dispatch(&self, event: &DecodedEvent) -> DispatchOutcome {
        let outcome = match event {
            DecodedEvent::Switch(ev) => self.dispatch_switch(ev),
            DecodedEvent::Isl(ev) => self.dispatch_isl(ev),
        };
        self.account(event, &outcome);
        outcome
    }

    fn dispatch_switch(&self, event: &SwitchEvent) -> DispatchOutcome {
        let result = match event.kind {
            SwitchEventKind::Add | SwitchEventKind::Change => self
                .store
                .upsert_switch(event.switch_id, event.kind, event.timestamp)
                .map(AppliedUpdate::SwitchUpserted),
            SwitchEventKind::Remove => self
                .store
                .remove_switch(event.switch_id, event.timestamp)
                .map(|node| AppliedUpdate::SwitchRemoved {
                    switch_id: node.switch_id,
                    timestamp: node.last_seen,
                }),
        };

        match result {
            Ok(update) => {
                info!(
                    switch_id = %event.switch_id,
                    kind = event.kind.as_str(),
                    timestamp = event.timestamp,
                    "applied switch event"
                );
                self.publish(update);
                DispatchOutcome::Applied
            }
            Err(rejection) => rejection.into(),
        }
    }

    fn dispatch_isl(&self, event: &IslEvent) -> DispatchOutcome {
        let result = self.store.upsert_link(
            event.endpoints,
            event.segments.clone(),
            event.latency_ns,
            event.timestamp,
        );

        match result {
            Ok(link) => {
                info!(
                    link = %link.endpoints,
                    latency_ns = ?link.latency_ns,
                    segments = link.segments.len(),
                    timestamp = event.timestamp,
                    "applied ISL event"
                );
                self.publish(AppliedUpdate::LinkUpserted(link));
                DispatchOutcome::Applied
            }
            Err(rejection) => rejection.into(),
        }
    }

    /// Best-effort hand-off to the persistence/derived-event queue. A full
    /// queue drops the update (counted); the in-memory commit stands.
    fn publish(&self, update: AppliedUpdate) {
        let Some(sender) = &self.applied_tx else {
            return;
        };
        if let Err(e) = sender.try_send(update) {
            self.metrics.persistence_dropped_total.inc();
            warn!(error = %e, "persistence queue full, dropping applied update");
        }
    }

    fn account(&self, event: &DecodedEvent, outcome: &DispatchOutcome) {
        match outcome {
            DispatchOutcome::Applied => match event {
                DecodedEvent::Switch(_) => self.metrics.switch_events_applied_total.inc(),
                DecodedEvent::Isl(_) => self.metrics.isl_events_applied_total.inc(),
            },
            DispatchOutcome::Stale => {
                self.metrics.stale_events_total.inc();
                debug!(timestamp = event.timestamp(), "discarded stale event");
            }
            DispatchOutcome::TombstoneConflict => {
                self.metrics.tombstone_conflicts_total.inc();
                debug!(
                    timestamp = event.timestamp(),
                    "discarded event for removed entity"
                );
            }
            DispatchOutcome::Rejected(e) => {
                self.metrics.validation_errors_total.inc();
                warn!(error = %e, "rejected invalid link mutation");
            }
        }

        let (active, links) = self.store.counts();
        self.metrics.set_topology_counts(active, links);
    }
}

impl From<StoreRejection> for DispatchOutcome {
    fn from(rejection: StoreRejection) -> Self {
        match rejection {
            StoreRejection::Stale { .. } => DispatchOutcome::Stale,
            StoreRejection::TombstoneConflict { .. } => DispatchOutcome::TombstoneConflict,
            StoreRejection::Validation(e) => DispatchOutcome::Rejected(e),
        }
    }
}
