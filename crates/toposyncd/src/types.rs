//! Core domain types for topology tracking.
//!
//! Entities live in the [`crate::store::TopologyStore`]; the event types here
//! are what the decoder produces and the dispatcher consumes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use topo_types::{Endpoint, PortNumber, SwitchId};

/// Lifecycle state of a switch.
///
/// Switches are never physically deleted. A `REMOVE` event tombstones the
/// entity so edge references and audit history stay resolvable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwitchState {
    /// Switch has announced itself (ADD seen).
    Active,
    /// Switch is known only indirectly, e.g. referenced by an ISL path,
    /// and has not yet sent its own ADD.
    Inactive,
    /// Tombstone: switch was removed. Terminal state.
    Removed,
}

impl SwitchState {
    /// Returns true for the terminal tombstone state.
    #[inline]
    pub fn is_removed(&self) -> bool {
        matches!(self, SwitchState::Removed)
    }
}

/// A switch node in the topology graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchNode {
    /// Switch datapath id.
    pub switch_id: SwitchId,
    /// Lifecycle state.
    pub state: SwitchState,
    /// Timestamp of the last accepted event for this switch.
    pub last_seen: i64,
    /// Ports learned from ISL paths touching this switch.
    pub ports: BTreeSet<PortNumber>,
}

impl SwitchNode {
    /// Creates a node in the given state with no learned ports.
    pub fn new(switch_id: SwitchId, state: SwitchState, last_seen: i64) -> Self {
        SwitchNode {
            switch_id,
            state,
            last_seen,
            ports: BTreeSet::new(),
        }
    }
}

/// One hop of an ISL path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSegment {
    /// Switch this segment traverses.
    pub switch_id: SwitchId,
    /// Port on that switch.
    pub port_no: PortNumber,
    /// Position in the path, contiguous from 0.
    pub seq_id: u32,
    /// Per-segment latency in nanoseconds, when the switch reported one.
    /// Absent means unknown, not zero.
    pub segment_latency: Option<i64>,
}

impl PathSegment {
    /// The endpoint this segment attaches to.
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.switch_id, self.port_no)
    }
}

/// Ordered endpoint pair identifying an inter-switch link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkEndpoints {
    /// Source attachment point (first path segment).
    pub source: Endpoint,
    /// Destination attachment point (last path segment).
    pub destination: Endpoint,
}

impl LinkEndpoints {
    /// Creates an endpoint pair.
    pub const fn new(source: Endpoint, destination: Endpoint) -> Self {
        LinkEndpoints {
            source,
            destination,
        }
    }
}

impl std::fmt::Display for LinkEndpoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.source, self.destination)
    }
}

/// An inter-switch link (edge of the topology graph).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IslLink {
    /// Ordered endpoint pair identifying this link.
    pub endpoints: LinkEndpoints,
    /// Full path, contiguous `seq_id` from 0; first/last match `endpoints`.
    pub segments: Vec<PathSegment>,
    /// End-to-end latency in nanoseconds. Absent means unknown.
    pub latency_ns: Option<i64>,
    /// Timestamp of the last accepted event for this link.
    pub last_seen: i64,
}

/// Consistent point-in-time view of the topology.
///
/// Tombstoned switches are included (callers can filter on
/// [`SwitchState::Removed`]); links referencing tombstones are listed in
/// [`TopologySnapshot::flagged_links`] rather than dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologySnapshot {
    /// All switches, tombstones included, ordered by switch id.
    pub switches: Vec<SwitchNode>,
    /// All links, ordered by endpoint pair.
    pub links: Vec<IslLink>,
    /// Links with at least one endpoint or path hop on a tombstoned switch.
    pub flagged_links: Vec<LinkEndpoints>,
    /// Count of non-removed switches.
    pub active_switches: usize,
    /// Count of links.
    pub total_links: usize,
}

impl TopologySnapshot {
    /// Looks up a switch by id.
    pub fn switch(&self, id: SwitchId) -> Option<&SwitchNode> {
        self.switches.iter().find(|s| s.switch_id == id)
    }

    /// Looks up a link by endpoint pair.
    pub fn link(&self, endpoints: &LinkEndpoints) -> Option<&IslLink> {
        self.links.iter().find(|l| l.endpoints == *endpoints)
    }
}

/// Lifecycle transition carried by a switch event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwitchEventKind {
    /// Switch announced itself.
    Add,
    /// Switch left the topology (tombstone it).
    Remove,
    /// Switch attributes changed; lifecycle state is untouched.
    Change,
}

impl SwitchEventKind {
    /// Wire name of this event kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            SwitchEventKind::Add => "ADD",
            SwitchEventKind::Remove => "REMOVE",
            SwitchEventKind::Change => "CHANGE",
        }
    }
}

/// A decoded switch lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchEvent {
    /// Switch this event concerns.
    pub switch_id: SwitchId,
    /// Lifecycle transition.
    pub kind: SwitchEventKind,
    /// Envelope timestamp.
    pub timestamp: i64,
}

/// A decoded ISL discovery/update event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IslEvent {
    /// Endpoint pair derived from the first and last path segments.
    pub endpoints: LinkEndpoints,
    /// Full path.
    pub segments: Vec<PathSegment>,
    /// End-to-end latency; when the wire omits `latency_ns` this is the sum
    /// of the reported per-segment latencies, or `None` when none were
    /// reported.
    pub latency_ns: Option<i64>,
    /// Envelope timestamp.
    pub timestamp: i64,
}

/// Tagged union of everything the decoder can produce from an `INFO` message.
///
/// Downstream code is exhaustive over this; adding a variant forces every
/// handler to be revisited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedEvent {
    /// Switch lifecycle event.
    Switch(SwitchEvent),
    /// ISL discovery/update event.
    Isl(IslEvent),
}

impl DecodedEvent {
    /// Envelope timestamp of the event.
    pub fn timestamp(&self) -> i64 {
        match self {
            DecodedEvent::Switch(ev) => ev.timestamp,
            DecodedEvent::Isl(ev) => ev.timestamp,
        }
    }
}

/// Decoder output: either an event we own, or an envelope we merely forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// An `INFO` event this core applies to the topology.
    Event(DecodedEvent),
    /// A non-`INFO` envelope (e.g. `COMMAND`); counted and passed through
    /// untouched.
    Passthrough {
        /// Envelope `type` field.
        envelope_type: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(sw: u64, port: PortNumber, seq: u32) -> PathSegment {
        PathSegment {
            switch_id: SwitchId::from_u64(sw),
            port_no: port,
            seq_id: seq,
            segment_latency: None,
        }
    }

    #[test]
    fn test_switch_state_removed_is_terminal_flag() {
        assert!(SwitchState::Removed.is_removed());
        assert!(!SwitchState::Active.is_removed());
        assert!(!SwitchState::Inactive.is_removed());
    }

    #[test]
    fn test_segment_endpoint() {
        let seg = segment(1, 20, 0);
        assert_eq!(seg.endpoint(), Endpoint::new(SwitchId::from_u64(1), 20));
    }

    #[test]
    fn test_link_endpoints_display() {
        let eps = LinkEndpoints::new(
            Endpoint::new(SwitchId::from_u64(1), 20),
            Endpoint::new(SwitchId::from_u64(2), 1),
        );
        assert_eq!(
            eps.to_string(),
            "00:00:00:00:00:00:00:01_20 -> 00:00:00:00:00:00:00:02_1"
        );
    }

    #[test]
    fn test_snapshot_lookup() {
        let snapshot = TopologySnapshot {
            switches: vec![SwitchNode::new(SwitchId::from_u64(1), SwitchState::Active, 5)],
            links: vec![],
            flagged_links: vec![],
            active_switches: 1,
            total_links: 0,
        };
        assert!(snapshot.switch(SwitchId::from_u64(1)).is_some());
        assert!(snapshot.switch(SwitchId::from_u64(2)).is_none());
    }

    #[test]
    fn test_event_kind_wire_names() {
        assert_eq!(SwitchEventKind::Add.as_str(), "ADD");
        assert_eq!(SwitchEventKind::Remove.as_str(), "REMOVE");
        assert_eq!(SwitchEventKind::Change.as_str(), "CHANGE");
    }
}
