//! Wire decoding of raw broker payloads into typed events.
//!
//! The wire format is a JSON envelope with a `type` discriminator and a
//! `data` object carrying a `message_type`:
//!
//! ```json
//! { "type": "INFO", "timestamp": 23478952134,
//!   "data": { "message_type": "switch",
//!             "switch_id": "00:00:00:00:00:00:00:01", "state": "ADD" } }
//! ```
//!
//! Decoding is a pure parse: no topology state is consulted or mutated here.
//! Structural topology checks (segment contiguity etc.) belong to
//! [`crate::validator`].

use crate::error::DecodeError;
use crate::types::{
    Decoded, DecodedEvent, IslEvent, LinkEndpoints, PathSegment, SwitchEvent, SwitchEventKind,
};
use serde::Deserialize;
use topo_types::{PortNumber, SwitchId};

/// Envelope `type` value for events this core owns.
const ENVELOPE_TYPE_INFO: &str = "INFO";

/// Raw JSON envelope, before any per-message-type interpretation.
#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    envelope_type: String,
    timestamp: i64,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

/// Raw `message_type = switch` payload.
#[derive(Debug, Deserialize)]
struct RawSwitchData {
    switch_id: String,
    state: String,
}

/// Raw `message_type = isl` path segment. `seq_id` arrives as an
/// int-as-string, a quirk of the producers we cannot change.
#[derive(Debug, Deserialize)]
struct RawSegment {
    switch_id: String,
    port_no: PortNumber,
    seq_id: String,
    #[serde(default)]
    segment_latency: Option<i64>,
}

/// Raw `message_type = isl` payload.
#[derive(Debug, Deserialize)]
struct RawIslData {
    #[serde(default)]
    latency_ns: Option<i64>,
    path: Vec<RawSegment>,
}

/// Decodes one raw payload into a typed event.
///
/// Non-`INFO` envelopes are not decoded beyond the envelope itself; they are
/// returned as [`Decoded::Passthrough`] for the caller to forward or skip.
pub fn decode(raw: &[u8]) -> Result<Decoded, DecodeError> {
    let envelope: RawEnvelope = serde_json::from_slice(raw)?;

    if envelope.envelope_type != ENVELOPE_TYPE_INFO {
        return Ok(Decoded::Passthrough {
            envelope_type: envelope.envelope_type,
        });
    }

    let data = envelope
        .data
        .ok_or_else(|| DecodeError::MalformedEnvelope("INFO message without data".to_string()))?;

    let message_type = data
        .get("message_type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            DecodeError::MalformedEnvelope("data object without message_type".to_string())
        })?
        .to_string();

    match message_type.as_str() {
        "switch" => decode_switch(data, envelope.timestamp),
        "isl" => decode_isl(data, envelope.timestamp),
        other => Err(DecodeError::UnknownMessageType(other.to_string())),
    }
}

fn decode_switch(data: serde_json::Value, timestamp: i64) -> Result<Decoded, DecodeError> {
    let raw: RawSwitchData = serde_json::from_value(data)
        .map_err(|e| DecodeError::MalformedSwitchEvent(e.to_string()))?;

    let switch_id: SwitchId = raw
        .switch_id
        .parse()
        .map_err(|e: topo_types::ParseError| DecodeError::MalformedSwitchEvent(e.to_string()))?;

    let kind = match raw.state.as_str() {
        "ADD" => SwitchEventKind::Add,
        "REMOVE" => SwitchEventKind::Remove,
        "CHANGE" => SwitchEventKind::Change,
        other => {
            return Err(DecodeError::MalformedSwitchEvent(format!(
                "unknown switch state: {other}"
            )));
        }
    };

    Ok(Decoded::Event(DecodedEvent::Switch(SwitchEvent {
        switch_id,
        kind,
        timestamp,
    })))
}

fn decode_isl(data: serde_json::Value, timestamp: i64) -> Result<Decoded, DecodeError> {
    let raw: RawIslData =
        serde_json::from_value(data).map_err(|e| DecodeError::MalformedIslEvent(e.to_string()))?;

    if raw.path.len() < 2 {
        return Err(DecodeError::MalformedIslEvent(format!(
            "path has {} segment(s), need at least 2",
            raw.path.len()
        )));
    }

    let mut segments = Vec::with_capacity(raw.path.len());
    for raw_segment in raw.path {
        let switch_id: SwitchId = raw_segment
            .switch_id
            .parse()
            .map_err(|e: topo_types::ParseError| DecodeError::MalformedIslEvent(e.to_string()))?;
        let seq_id: u32 = raw_segment.seq_id.parse().map_err(|_| {
            DecodeError::MalformedIslEvent(format!("bad seq_id: {:?}", raw_segment.seq_id))
        })?;
        segments.push(PathSegment {
            switch_id,
            port_no: raw_segment.port_no,
            seq_id,
            segment_latency: raw_segment.segment_latency,
        });
    }

    // latency_ns, when absent, defaults to the sum of reported per-segment
    // latencies; if no segment reported one it stays unknown.
    let latency_ns = raw.latency_ns.or_else(|| {
        let reported: Vec<i64> = segments.iter().filter_map(|s| s.segment_latency).collect();
        if reported.is_empty() {
            None
        } else {
            Some(reported.iter().sum())
        }
    });

    // Safe: length checked above.
    let endpoints = LinkEndpoints::new(
        segments[0].endpoint(),
        segments[segments.len() - 1].endpoint(),
    );

    Ok(Decoded::Event(DecodedEvent::Isl(IslEvent {
        endpoints,
        segments,
        latency_ns,
        timestamp,
    })))
}
