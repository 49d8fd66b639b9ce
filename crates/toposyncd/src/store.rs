//! In-memory topology store.
//!
//! Single source of truth for the topology graph. All mutations go through
//! the write side of one `parking_lot::RwLock`, which serializes writers;
//! [`TopologyStore::snapshot`] takes the read side and deep-copies, so
//! readers never observe a half-applied mutation and never block writers for
//! longer than the copy.
//!
//! Rejections are data, not errors: a stale or tombstone-conflicting event
//! leaves the store untouched and tells the caller why, and the caller
//! (the dispatcher) counts and logs it without stopping the stream.

use crate::error::ValidationError;
use crate::types::{
    IslLink, LinkEndpoints, PathSegment, SwitchEventKind, SwitchNode, SwitchState,
    TopologySnapshot,
};
use crate::validator;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use topo_types::SwitchId;
use tracing::{debug, warn};

/// Why a mutation was not applied.
///
/// None of these indicate store corruption; the state before the call is the
/// state after the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreRejection {
    /// Event timestamp is strictly older than the entity's last accepted one.
    Stale {
        /// Entity the event targeted.
        switch_id: SwitchId,
        /// Timestamp carried by the rejected event.
        event_timestamp: i64,
        /// Timestamp currently recorded on the entity.
        last_seen: i64,
    },
    /// Event targets a tombstoned switch; `Removed` is terminal.
    TombstoneConflict {
        /// The tombstoned switch.
        switch_id: SwitchId,
    },
    /// Link mutation failed structural validation.
    Validation(ValidationError),
}

/// Graph state guarded by the store lock.
#[derive(Debug, Default)]
struct TopologyState {
    switches: BTreeMap<SwitchId, SwitchNode>,
    links: BTreeMap<LinkEndpoints, IslLink>,
}

impl TopologyState {
    /// Ensures a switch exists, creating a provisional `Inactive` node when
    /// it is only known indirectly. Existing nodes are left untouched: an
    /// indirect reference is not evidence about the switch's own lifecycle.
    fn ensure_switch(&mut self, id: SwitchId, timestamp: i64) -> &mut SwitchNode {
        self.switches
            .entry(id)
            .or_insert_with(|| SwitchNode::new(id, SwitchState::Inactive, timestamp))
    }
}

/// The in-memory topology graph.
///
/// Cheap to share: wrap in an `Arc` and clone handles across tasks.
#[derive(Debug, Default)]
pub struct TopologyStore {
    inner: RwLock<TopologyState>,
}

impl TopologyStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        TopologyStore {
            inner: RwLock::new(TopologyState::default()),
        }
    }

    /// Applies an ADD or CHANGE switch event.
    ///
    /// Creates the switch on first sight. On an existing switch the update
    /// applies only when the event timestamp is not older than `last_seen`
    /// (ties go to the arriving event: last-write-wins in arrival order).
    /// A tombstoned switch rejects everything; it is never resurrected.
    ///
    /// CHANGE does not alter lifecycle state: a provisional `Inactive` node
    /// stays provisional until its own ADD arrives.
    pub fn upsert_switch(
        &self,
        id: SwitchId,
        kind: SwitchEventKind,
        timestamp: i64,
    ) -> Result<SwitchNode, StoreRejection> {
        debug_assert!(!matches!(kind, SwitchEventKind::Remove), "use remove_switch");

        let mut state = self.inner.write();
        match state.switches.get_mut(&id) {
            None => {
                let initial = match kind {
                    SwitchEventKind::Add => SwitchState::Active,
                    // CHANGE for a switch we have never seen: provision it,
                    // pending its own ADD.
                    SwitchEventKind::Change => SwitchState::Inactive,
                    SwitchEventKind::Remove => unreachable!("handled by remove_switch"),
                };
                let node = SwitchNode::new(id, initial, timestamp);
                state.switches.insert(id, node.clone());
                debug!(switch_id = %id, kind = kind.as_str(), "created switch");
                Ok(node)
            }
            Some(node) if node.state.is_removed() => {
                Err(StoreRejection::TombstoneConflict { switch_id: id })
            }
            Some(node) if timestamp < node.last_seen => Err(StoreRejection::Stale {
                switch_id: id,
                event_timestamp: timestamp,
                last_seen: node.last_seen,
            }),
            Some(node) => {
                if matches!(kind, SwitchEventKind::Add) {
                    node.state = SwitchState::Active;
                }
                node.last_seen = timestamp;
                Ok(node.clone())
            }
        }
    }

    /// Tombstones a switch.
    ///
    /// Incident links are *not* cascade-deleted; they stay in the graph,
    /// flagged in snapshots, for audit. A REMOVE for a switch never seen
    /// creates the tombstone directly so a late ADD cannot resurrect it.
    /// Removing an already-removed switch is a tombstone conflict (the
    /// no-op replay case).
    pub fn remove_switch(&self, id: SwitchId, timestamp: i64) -> Result<SwitchNode, StoreRejection> {
        let mut state = self.inner.write();
        match state.switches.get_mut(&id) {
            None => {
                let node = SwitchNode::new(id, SwitchState::Removed, timestamp);
                state.switches.insert(id, node.clone());
                debug!(switch_id = %id, "tombstoned unseen switch");
                Ok(node)
            }
            Some(node) if node.state.is_removed() => {
                Err(StoreRejection::TombstoneConflict { switch_id: id })
            }
            Some(node) if timestamp < node.last_seen => Err(StoreRejection::Stale {
                switch_id: id,
                event_timestamp: timestamp,
                last_seen: node.last_seen,
            }),
            Some(node) => {
                node.state = SwitchState::Removed;
                node.last_seen = timestamp;
                Ok(node.clone())
            }
        }
    }

    /// Creates or updates an inter-switch link.
    ///
    /// The consistency validator runs before any mutation; on failure the
    /// store is untouched. Switches referenced by the path that were never
    /// seen are provisioned as `Inactive`, and every hop registers its port
    /// on the owning switch. Links touching tombstoned switches are applied
    /// but flagged (returned switches are logged; snapshots carry the flag).
    pub fn upsert_link(
        &self,
        endpoints: LinkEndpoints,
        segments: Vec<PathSegment>,
        latency_ns: Option<i64>,
        timestamp: i64,
    ) -> Result<IslLink, StoreRejection> {
        validator::validate_link(&endpoints, &segments, latency_ns)
            .map_err(StoreRejection::Validation)?;

        let mut state = self.inner.write();

        if let Some(existing) = state.links.get(&endpoints) {
            if timestamp < existing.last_seen {
                return Err(StoreRejection::Stale {
                    switch_id: endpoints.source.switch_id,
                    event_timestamp: timestamp,
                    last_seen: existing.last_seen,
                });
            }
        }

        // Provision path switches and register learned ports. Validation is
        // done, so from here the whole mutation commits.
        for segment in &segments {
            let node = state.ensure_switch(segment.switch_id, timestamp);
            node.ports.insert(segment.port_no);
        }

        let tombstoned = validator::tombstone_references(&segments, &state.switches);
        if !tombstoned.is_empty() {
            warn!(
                link = %endpoints,
                tombstoned = ?tombstoned.iter().map(|id| id.to_string()).collect::<Vec<_>>(),
                "link references tombstoned switch(es), applying flagged"
            );
        }

        let link = IslLink {
            endpoints,
            segments,
            latency_ns,
            last_seen: timestamp,
        };
        state.links.insert(endpoints, link.clone());
        Ok(link)
    }

    /// Returns a consistent point-in-time snapshot.
    ///
    /// Taken under the read lock; concurrent snapshots proceed in parallel
    /// and writers wait only for the copy.
    pub fn snapshot(&self) -> TopologySnapshot {
        let state = self.inner.read();

        let flagged_links: Vec<LinkEndpoints> = state
            .links
            .values()
            .filter(|link| !validator::tombstone_references(&link.segments, &state.switches).is_empty())
            .map(|link| link.endpoints)
            .collect();

        let active_switches = state
            .switches
            .values()
            .filter(|node| !node.state.is_removed())
            .count();

        TopologySnapshot {
            switches: state.switches.values().cloned().collect(),
            links: state.links.values().cloned().collect(),
            flagged_links,
            active_switches,
            total_links: state.links.len(),
        }
    }

    /// Current (active switch count, link count) for gauge updates.
    pub fn counts(&self) -> (usize, usize) {
        let state = self.inner.read();
        let active = state
            .switches
            .values()
            .filter(|node| !node.state.is_removed())
            .count();
        (active, state.links.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(sw: u64, port: u32, seq: u32) -> PathSegment {
        PathSegment {
            switch_id: SwitchId::from_u64(sw),
            port_no: port,
            seq_id: seq,
            segment_latency: None,
        }
    }

    fn link_endpoints(segments: &[PathSegment]) -> LinkEndpoints {
        LinkEndpoints::new(
            segments[0].endpoint(),
            segments[segments.len() - 1].endpoint(),
        )
    }

    #[test]
    fn test_upsert_switch_creates_active() {
        let store = TopologyStore::new();
        let node = store
            .upsert_switch(SwitchId::from_u64(1), SwitchEventKind::Add, 10)
            .unwrap();
        assert_eq!(node.state, SwitchState::Active);
        assert_eq!(node.last_seen, 10);
    }

    #[test]
    fn test_upsert_switch_add_is_idempotent() {
        let store = TopologyStore::new();
        let first = store
            .upsert_switch(SwitchId::from_u64(1), SwitchEventKind::Add, 10)
            .unwrap();
        let second = store
            .upsert_switch(SwitchId::from_u64(1), SwitchEventKind::Add, 10)
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(store.snapshot().active_switches, 1);
    }

    #[test]
    fn test_upsert_switch_stale_rejected() {
        let store = TopologyStore::new();
        store
            .upsert_switch(SwitchId::from_u64(1), SwitchEventKind::Add, 10)
            .unwrap();
        let rejection = store
            .upsert_switch(SwitchId::from_u64(1), SwitchEventKind::Change, 5)
            .unwrap_err();
        assert_eq!(
            rejection,
            StoreRejection::Stale {
                switch_id: SwitchId::from_u64(1),
                event_timestamp: 5,
                last_seen: 10,
            }
        );
        // State unchanged.
        let snapshot = store.snapshot();
        assert_eq!(snapshot.switch(SwitchId::from_u64(1)).unwrap().last_seen, 10);
    }

    #[test]
    fn test_change_keeps_provisional_state() {
        let store = TopologyStore::new();
        let node = store
            .upsert_switch(SwitchId::from_u64(1), SwitchEventKind::Change, 10)
            .unwrap();
        assert_eq!(node.state, SwitchState::Inactive);

        // CHANGE on an existing provisional node advances last_seen only.
        let node = store
            .upsert_switch(SwitchId::from_u64(1), SwitchEventKind::Change, 12)
            .unwrap();
        assert_eq!(node.state, SwitchState::Inactive);
        assert_eq!(node.last_seen, 12);

        // Its own ADD activates it.
        let node = store
            .upsert_switch(SwitchId::from_u64(1), SwitchEventKind::Add, 13)
            .unwrap();
        assert_eq!(node.state, SwitchState::Active);
    }

    #[test]
    fn test_remove_switch_tombstones() {
        let store = TopologyStore::new();
        store
            .upsert_switch(SwitchId::from_u64(1), SwitchEventKind::Add, 1)
            .unwrap();
        let node = store.remove_switch(SwitchId::from_u64(1), 5).unwrap();
        assert_eq!(node.state, SwitchState::Removed);

        // Still present in the snapshot, as a tombstone.
        let snapshot = store.snapshot();
        assert_eq!(snapshot.active_switches, 0);
        assert_eq!(
            snapshot.switch(SwitchId::from_u64(1)).unwrap().state,
            SwitchState::Removed
        );
    }

    #[test]
    fn test_tombstone_is_terminal() {
        let store = TopologyStore::new();
        store
            .upsert_switch(SwitchId::from_u64(1), SwitchEventKind::Add, 1)
            .unwrap();
        store.remove_switch(SwitchId::from_u64(1), 5).unwrap();

        // Neither a replayed REMOVE nor a newer ADD touches the tombstone.
        assert_eq!(
            store.remove_switch(SwitchId::from_u64(1), 5).unwrap_err(),
            StoreRejection::TombstoneConflict {
                switch_id: SwitchId::from_u64(1)
            }
        );
        assert_eq!(
            store
                .upsert_switch(SwitchId::from_u64(1), SwitchEventKind::Add, 9)
                .unwrap_err(),
            StoreRejection::TombstoneConflict {
                switch_id: SwitchId::from_u64(1)
            }
        );
        assert_eq!(
            store.snapshot().switch(SwitchId::from_u64(1)).unwrap().last_seen,
            5
        );
    }

    #[test]
    fn test_remove_unseen_switch_creates_tombstone() {
        let store = TopologyStore::new();
        let node = store.remove_switch(SwitchId::from_u64(7), 3).unwrap();
        assert_eq!(node.state, SwitchState::Removed);
        assert_eq!(store.snapshot().active_switches, 0);
    }

    #[test]
    fn test_upsert_link_provisions_switches_and_ports() {
        let store = TopologyStore::new();
        let segments = vec![segment(1, 20, 0), segment(2, 1, 1)];
        store
            .upsert_link(link_endpoints(&segments), segments, Some(1123), 3)
            .unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.total_links, 1);
        assert_eq!(snapshot.active_switches, 2);

        let sw1 = snapshot.switch(SwitchId::from_u64(1)).unwrap();
        assert_eq!(sw1.state, SwitchState::Inactive);
        assert!(sw1.ports.contains(&20));
        let sw2 = snapshot.switch(SwitchId::from_u64(2)).unwrap();
        assert!(sw2.ports.contains(&1));
    }

    #[test]
    fn test_upsert_link_validation_failure_mutates_nothing() {
        let store = TopologyStore::new();
        let segments = vec![segment(1, 20, 0), segment(2, 1, 2)]; // gap in seq
        let rejection = store
            .upsert_link(link_endpoints(&segments), segments, None, 3)
            .unwrap_err();
        assert!(matches!(rejection, StoreRejection::Validation(_)));

        // No provisional switches were created either.
        let snapshot = store.snapshot();
        assert_eq!(snapshot.total_links, 0);
        assert!(snapshot.switches.is_empty());
    }

    #[test]
    fn test_upsert_link_stale_rejected() {
        let store = TopologyStore::new();
        let segments = vec![segment(1, 20, 0), segment(2, 1, 1)];
        let endpoints = link_endpoints(&segments);
        store
            .upsert_link(endpoints, segments.clone(), Some(100), 10)
            .unwrap();
        let rejection = store
            .upsert_link(endpoints, segments, Some(50), 9)
            .unwrap_err();
        assert!(matches!(rejection, StoreRejection::Stale { .. }));
        assert_eq!(
            store.snapshot().link(&endpoints).unwrap().latency_ns,
            Some(100)
        );
    }

    #[test]
    fn test_upsert_link_equal_timestamp_wins() {
        let store = TopologyStore::new();
        let segments = vec![segment(1, 20, 0), segment(2, 1, 1)];
        let endpoints = link_endpoints(&segments);
        store
            .upsert_link(endpoints, segments.clone(), Some(100), 10)
            .unwrap();
        // Same timestamp: arrival order wins.
        store
            .upsert_link(endpoints, segments, Some(200), 10)
            .unwrap();
        assert_eq!(
            store.snapshot().link(&endpoints).unwrap().latency_ns,
            Some(200)
        );
    }

    #[test]
    fn test_remove_does_not_cascade_but_flags_links() {
        let store = TopologyStore::new();
        store
            .upsert_switch(SwitchId::from_u64(1), SwitchEventKind::Add, 1)
            .unwrap();
        store
            .upsert_switch(SwitchId::from_u64(2), SwitchEventKind::Add, 2)
            .unwrap();
        let segments = vec![segment(1, 20, 0), segment(2, 1, 1)];
        let endpoints = link_endpoints(&segments);
        store.upsert_link(endpoints, segments, None, 3).unwrap();

        store.remove_switch(SwitchId::from_u64(1), 5).unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.total_links, 1, "link survives for audit");
        assert_eq!(snapshot.flagged_links, vec![endpoints]);
    }

    #[test]
    fn test_link_to_tombstone_applies_flagged() {
        let store = TopologyStore::new();
        store.remove_switch(SwitchId::from_u64(2), 1).unwrap();

        let segments = vec![segment(1, 20, 0), segment(2, 1, 1)];
        let endpoints = link_endpoints(&segments);
        store.upsert_link(endpoints, segments, None, 2).unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.total_links, 1);
        assert_eq!(snapshot.flagged_links, vec![endpoints]);
        // The tombstone was not resurrected by the port registration.
        assert_eq!(
            snapshot.switch(SwitchId::from_u64(2)).unwrap().state,
            SwitchState::Removed
        );
    }

    #[test]
    fn test_counts() {
        let store = TopologyStore::new();
        store
            .upsert_switch(SwitchId::from_u64(1), SwitchEventKind::Add, 1)
            .unwrap();
        store.remove_switch(SwitchId::from_u64(2), 1).unwrap();
        assert_eq!(store.counts(), (1, 0));
    }

    #[test]
    fn test_snapshot_is_detached_copy() {
        let store = TopologyStore::new();
        store
            .upsert_switch(SwitchId::from_u64(1), SwitchEventKind::Add, 1)
            .unwrap();
        let snapshot = store.snapshot();
        store.remove_switch(SwitchId::from_u64(1), 2).unwrap();
        // The earlier snapshot still shows the switch active.
        assert_eq!(
            snapshot.switch(SwitchId::from_u64(1)).unwrap().state,
            SwitchState::Active
        );
    }
}
