//! Topology Synchronization Daemon
//!
//! This crate implements the event ingestion core of a network topology
//! tracking service: it consumes switch and inter-switch link (ISL)
//! lifecycle events from a message feed and maintains a consistent
//! in-memory topology graph.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────────────┐     ┌─────────────────┐
//! │  Message feed   │     │        toposyncd         │     │ Durable store   │
//! │                 │     │                          │     │ (best effort)   │
//! │  INFO switch    │────▶│ EventTransport           │     │                 │
//! │  INFO isl       │     │      │                   │     │                 │
//! │  other (fwd)    │     │      ▼                   │     │                 │
//! │                 │     │ decoder ─▶ Dispatcher    │────▶│ Persistence     │
//! └─────────────────┘     │              │           │     │ Backend         │
//!                         │              ▼           │     └─────────────────┘
//!                         │        TopologyStore     │
//!                         │     (validator on write) │──▶ snapshot()
//!                         └──────────────────────────┘
//! ```
//!
//! All writes serialize through the store; snapshots are consistent copies.
//! Per-event failures are counted and skipped, never fatal to the loop.

pub mod config;
pub mod decoder;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod persistence;
pub mod store;
pub mod topo_sync;
pub mod transport;
pub mod types;
pub mod validator;

pub use config::TopoSyncConfig;
pub use decoder::decode;
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use error::{DecodeError, Result, ToposyncError, ValidationError};
pub use metrics::MetricsCollector;
pub use persistence::{AppliedUpdate, LogOnlyBackend, PersistenceBackend, PersistenceWorker};
pub use store::{StoreRejection, TopologyStore};
pub use topo_sync::{RunSummary, TopoSync};
pub use transport::{ChannelTransport, EventTransport, LineTransport};
pub use types::{
    Decoded, DecodedEvent, IslEvent, IslLink, LinkEndpoints, PathSegment, SwitchEvent,
    SwitchEventKind, SwitchNode, SwitchState, TopologySnapshot,
};
