//! Error types for toposyncd.
//!
//! The taxonomy deliberately separates *fatal* daemon errors
//! ([`ToposyncError`]) from the per-event conditions that are counted and
//! skipped without stopping the consumer loop ([`DecodeError`],
//! [`ValidationError`] and the rejection kinds in
//! [`crate::store::StoreRejection`]).

use thiserror::Error;
use topo_types::Endpoint;

/// Errors raised while decoding a raw payload into a typed event.
///
/// Decode errors are dropped, logged and counted by the consumer loop; they
/// are never fatal.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Payload is not valid JSON at all.
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload is JSON but does not carry the expected envelope fields.
    #[error("malformed message envelope: {0}")]
    MalformedEnvelope(String),

    /// `message_type = switch` payload with missing or malformed fields.
    #[error("malformed switch event: {0}")]
    MalformedSwitchEvent(String),

    /// `message_type = isl` payload with missing or malformed fields.
    #[error("malformed ISL event: {0}")]
    MalformedIslEvent(String),

    /// `data.message_type` is not one we know how to decode.
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),
}

/// Structural violations detected before a link mutation is committed.
///
/// A validation failure leaves the store untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A link needs at least a source and a destination segment.
    #[error("link path has {0} segment(s), need at least 2")]
    TooFewSegments(usize),

    /// Segment sequence ids must be contiguous starting at 0.
    #[error("non-contiguous segment sequence: expected seq_id {expected}, found {found}")]
    NonContiguousSegments { expected: u32, found: u32 },

    /// First/last path segments must match the declared link endpoints.
    #[error("link endpoint {declared} does not match path segment {segment}")]
    EndpointMismatch {
        declared: Endpoint,
        segment: Endpoint,
    },

    /// Both link endpoints sit on the same switch.
    #[error("self-loop link on switch {0}")]
    SelfLoop(topo_types::SwitchId),

    /// Latency values are nanosecond counts and may not be negative.
    #[error("negative latency: {0} ns")]
    NegativeLatency(i64),
}

/// Errors that stop the daemon (as opposed to a single event).
#[derive(Debug, Error)]
pub enum ToposyncError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport could not deliver bytes at all
    #[error("transport error: {0}")]
    Transport(String),

    /// Persistence backend failure (best-effort, logged by the worker)
    #[error("persistence backend error: {0}")]
    Persistence(String),

    /// Metrics registry failure
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for toposyncd operations.
pub type Result<T> = std::result::Result<T, ToposyncError>;
