//! Common types for network topology tracking.
//!
//! This crate provides type-safe representations of the identity primitives
//! used throughout the topology control plane:
//!
//! - [`SwitchId`]: 64-bit switch datapath identifiers
//! - [`Endpoint`]: a (switch, port) attachment point for a link

mod endpoint;
mod switch_id;

pub use endpoint::{Endpoint, PortNumber};
pub use switch_id::SwitchId;

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid switch id format: {0}")]
    InvalidSwitchId(String),

    #[error("invalid endpoint format: {0}")]
    InvalidEndpoint(String),

    #[error("invalid port number: {0}")]
    InvalidPortNumber(String),
}
