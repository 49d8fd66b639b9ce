//! Switch datapath identifier with safe parsing and formatting.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 64-bit switch datapath identifier.
///
/// The canonical text form is eight colon-separated hex octets, as reported
/// by the switches themselves:
///
/// # Examples
///
/// ```
/// use topo_types::SwitchId;
///
/// let id: SwitchId = "00:00:00:00:00:00:00:01".parse().unwrap();
/// assert_eq!(id.to_string(), "00:00:00:00:00:00:00:01");
/// assert_eq!(id.as_u64(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SwitchId([u8; 8]);

impl SwitchId {
    /// Creates a new switch id from raw bytes.
    pub const fn new(bytes: [u8; 8]) -> Self {
        SwitchId(bytes)
    }

    /// Creates a switch id from its numeric datapath value.
    pub const fn from_u64(dpid: u64) -> Self {
        SwitchId(dpid.to_be_bytes())
    }

    /// Returns the raw bytes of the switch id.
    pub const fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// Returns the numeric datapath value.
    pub const fn as_u64(&self) -> u64 {
        u64::from_be_bytes(self.0)
    }
}

impl fmt::Display for SwitchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5], self.0[6], self.0[7]
        )
    }
}

impl FromStr for SwitchId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 8 {
            return Err(ParseError::InvalidSwitchId(s.to_string()));
        }

        let mut bytes = [0u8; 8];
        for (i, part) in parts.iter().enumerate() {
            if part.len() != 2 {
                return Err(ParseError::InvalidSwitchId(s.to_string()));
            }
            bytes[i] = u8::from_str_radix(part, 16)
                .map_err(|_| ParseError::InvalidSwitchId(s.to_string()))?;
        }

        Ok(SwitchId(bytes))
    }
}

impl TryFrom<String> for SwitchId {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SwitchId> for String {
    fn from(id: SwitchId) -> String {
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_switch_id_roundtrip() {
        let id: SwitchId = "00:00:00:00:00:00:00:01".parse().unwrap();
        assert_eq!(id.to_string(), "00:00:00:00:00:00:00:01");
        assert_eq!(id.as_u64(), 1);
    }

    #[test]
    fn test_switch_id_mixed_case() {
        let id: SwitchId = "de:ad:BE:ef:00:00:00:42".parse().unwrap();
        assert_eq!(id.to_string(), "de:ad:be:ef:00:00:00:42");
    }

    #[test]
    fn test_switch_id_from_u64() {
        let id = SwitchId::from_u64(0x0102030405060708);
        assert_eq!(id.to_string(), "01:02:03:04:05:06:07:08");
    }

    #[test]
    fn test_switch_id_rejects_short() {
        assert!("00:00:00:01".parse::<SwitchId>().is_err());
    }

    #[test]
    fn test_switch_id_rejects_bad_octet() {
        assert!("00:00:00:00:00:00:00:zz".parse::<SwitchId>().is_err());
        assert!("00:00:00:00:00:00:00:001".parse::<SwitchId>().is_err());
    }

    #[test]
    fn test_switch_id_ordering() {
        let a = SwitchId::from_u64(1);
        let b = SwitchId::from_u64(2);
        assert!(a < b);
    }

    #[test]
    fn test_switch_id_serde_string_form() {
        let id = SwitchId::from_u64(1);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"00:00:00:00:00:00:00:01\"");
        let back: SwitchId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
