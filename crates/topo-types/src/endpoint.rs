//! Link endpoint: a (switch, port) attachment point.

use crate::{ParseError, SwitchId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A switch port number.
///
/// Port numbers are assigned by the switch and are only meaningful relative
/// to their owning switch.
pub type PortNumber = u32;

/// One end of an inter-switch link: a port on a specific switch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Endpoint {
    /// Owning switch datapath id.
    pub switch_id: SwitchId,
    /// Port number on the owning switch.
    pub port_no: PortNumber,
}

impl Endpoint {
    /// Creates a new endpoint.
    pub const fn new(switch_id: SwitchId, port_no: PortNumber) -> Self {
        Endpoint { switch_id, port_no }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.switch_id, self.port_no)
    }
}

impl FromStr for Endpoint {
    type Err = ParseError;

    /// Parses the `<switch_id>_<port_no>` form produced by [`Display`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (switch, port) = s
            .rsplit_once('_')
            .ok_or_else(|| ParseError::InvalidEndpoint(s.to_string()))?;
        let switch_id: SwitchId = switch
            .parse()
            .map_err(|_| ParseError::InvalidEndpoint(s.to_string()))?;
        let port_no: PortNumber = port
            .parse()
            .map_err(|_| ParseError::InvalidPortNumber(port.to_string()))?;
        Ok(Endpoint { switch_id, port_no })
    }
}
