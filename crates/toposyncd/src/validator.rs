//! Cross-cutting consistency checks for link mutations.
//!
//! The store calls [`validate_link`] before committing an upsert; a failure
//! means no mutation happens at all. Tombstone references are a softer
//! condition: they are *flagged* (see [`tombstone_references`]) but do not
//! reject the write, so late-arriving ISL updates survive a switch removal
//! and stay queryable for audit.

use crate::error::ValidationError;
use crate::types::{LinkEndpoints, PathSegment, SwitchNode};
use std::collections::BTreeMap;
use topo_types::SwitchId;

/// Validates a link upsert against the structural invariants.
///
/// Checks, in order:
/// - at least 2 segments;
/// - `seq_id` contiguous from 0;
/// - declared endpoints equal to the first/last segment attachment points;
/// - endpoints on distinct switches (no self-loop);
/// - non-negative latency values.
pub fn validate_link(
    endpoints: &LinkEndpoints,
    segments: &[PathSegment],
    latency_ns: Option<i64>,
) -> Result<(), ValidationError> {
    if segments.len() < 2 {
        return Err(ValidationError::TooFewSegments(segments.len()));
    }

    for (index, segment) in segments.iter().enumerate() {
        let expected = index as u32;
        if segment.seq_id != expected {
            return Err(ValidationError::NonContiguousSegments {
                expected,
                found: segment.seq_id,
            });
        }
        if let Some(latency) = segment.segment_latency {
            if latency < 0 {
                return Err(ValidationError::NegativeLatency(latency));
            }
        }
    }

    let first = segments[0].endpoint();
    if endpoints.source != first {
        return Err(ValidationError::EndpointMismatch {
            declared: endpoints.source,
            segment: first,
        });
    }
    let last = segments[segments.len() - 1].endpoint();
    if endpoints.destination != last {
        return Err(ValidationError::EndpointMismatch {
            declared: endpoints.destination,
            segment: last,
        });
    }

    if endpoints.source.switch_id == endpoints.destination.switch_id {
        return Err(ValidationError::SelfLoop(endpoints.source.switch_id));
    }

    if let Some(latency) = latency_ns {
        if latency < 0 {
            return Err(ValidationError::NegativeLatency(latency));
        }
    }

    Ok(())
}

/// Returns the tombstoned switches a link path references.
///
/// Unknown switches are not reported here; the store provisions them before
/// this check runs.
pub fn tombstone_references(
    segments: &[PathSegment],
    switches: &BTreeMap<SwitchId, SwitchNode>,
) -> Vec<SwitchId> {
    let mut referenced: Vec<SwitchId> = segments
        .iter()
        .filter(|seg| {
            switches
                .get(&seg.switch_id)
                .is_some_and(|node| node.state.is_removed())
        })
        .map(|seg| seg.switch_id)
        .collect();
    referenced.sort_unstable();
    referenced.dedup();
    referenced
}
