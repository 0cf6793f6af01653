//! MAC address of an attached host.
//!
//! Topology files spell host MACs as six hex octets separated by `:` (as
//! mininet writes them) or `-`. Mixed separators are rejected.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// ```
/// use srcroute_types::MacAddress;
///
/// let mac: MacAddress = "08:00:00:00:01:11".parse().unwrap();
/// assert_eq!(mac.octets()[5], 0x11);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for MacAddress {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidMacAddress(s.to_string());
        let text = s.trim();
        let separator = match (text.contains(':'), text.contains('-')) {
            (true, false) => ':',
            (false, true) => '-',
            _ => return Err(invalid()),
        };

        let mut octets = [0u8; 6];
        let mut groups = text.split(separator);
        for octet in &mut octets {
            let group = groups.next().ok_or_else(invalid)?;
            if !(1..=2).contains(&group.len()) {
                return Err(invalid());
            }
            *octet = u8::from_str_radix(group, 16).map_err(|_| invalid())?;
        }
        if groups.next().is_some() {
            return Err(invalid());
        }

        Ok(Self(octets))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, octet) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{:02x}", octet)?;
        }
        Ok(())
    }
}

impl TryFrom<String> for MacAddress {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> Self {
        mac.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_mininet_style() {
        let mac: MacAddress = "08:00:00:00:02:22".parse().unwrap();
        assert_eq!(mac.octets(), [0x08, 0, 0, 0, 0x02, 0x22]);
        assert_eq!(mac.to_string(), "08:00:00:00:02:22");
    }

    #[test]
    fn test_hyphens_and_short_groups() {
        let mac: MacAddress = "0-0-0-0-0-A".parse().unwrap();
        assert_eq!(mac, MacAddress::new([0, 0, 0, 0, 0, 0x0a]));
        assert_eq!(mac.to_string(), "00:00:00:00:00:0a");
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in [
            "",
            "zz",
            "00:00:00:00:00",
            "00:00:00:00:00:00:00",
            "00:00:00-00:00:00",
            "000:00:00:00:00:01",
            "00::00:00:00:01",
            "0g:00:00:00:00:01",
        ] {
            assert!(bad.parse::<MacAddress>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_serde_as_string() {
        let mac: MacAddress = serde_json::from_str("\"08:00:00:00:01:11\"").unwrap();
        assert_eq!(serde_json::to_string(&mac).unwrap(), "\"08:00:00:00:01:11\"");
        assert!(serde_json::from_str::<MacAddress>("\"nope\"").is_err());
    }
}
