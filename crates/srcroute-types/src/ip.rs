//! IPv4 address and prefix types.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// An IPv4 host address, as used for topology hosts and operator commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ipv4Address(Ipv4Addr);

impl Ipv4Address {
    pub const fn new(a: u8, b: u8, c: u8, d: u8) -> Self {
        Self(Ipv4Addr::new(a, b, c, d))
    }

    pub const fn octets(&self) -> [u8; 4] {
        self.0.octets()
    }

    /// The address as a host-order integer.
    pub fn to_bits(&self) -> u32 {
        u32::from(self.0)
    }

    fn from_bits(bits: u32) -> Self {
        Self(Ipv4Addr::from(bits))
    }
}

impl FromStr for Ipv4Address {
    type Err = ParseError;

    /// Surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<Ipv4Addr>() {
            Ok(addr) => Ok(Self(addr)),
            Err(_) => Err(ParseError::InvalidIpAddress(s.to_string())),
        }
    }
}

impl fmt::Display for Ipv4Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<Ipv4Addr> for Ipv4Address {
    fn from(addr: Ipv4Addr) -> Self {
        Self(addr)
    }
}

/// An IPv4 prefix in CIDR notation, used as an LPM match key.
///
/// The stored address keeps whatever host bits it was created with; use
/// [`Ipv4Prefix::network`] for the masked network address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ipv4Prefix {
    address: Ipv4Address,
    prefix_len: u8,
}

impl Ipv4Prefix {
    /// Creates a new prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if `prefix_len` is greater than 32.
    pub fn new(address: Ipv4Address, prefix_len: u8) -> Result<Self, ParseError> {
        if prefix_len > 32 {
            return Err(ParseError::InvalidIpPrefix(format!(
                "prefix length {} exceeds maximum 32",
                prefix_len
            )));
        }
        Ok(Ipv4Prefix {
            address,
            prefix_len,
        })
    }

    /// Creates the /32 prefix covering exactly `address`.
    pub const fn host(address: Ipv4Address) -> Self {
        Ipv4Prefix {
            address,
            prefix_len: 32,
        }
    }

    /// Parses either a bare address (taken as /32) or an interface address
    /// such as `10.0.0.1/24`.
    pub fn parse_interface(s: &str) -> Result<Self, ParseError> {
        if s.contains('/') {
            s.parse()
        } else {
            s.parse::<Ipv4Address>().map(Ipv4Prefix::host)
        }
    }

    pub const fn address(&self) -> Ipv4Address {
        self.address
    }

    pub const fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    pub const fn is_host_route(&self) -> bool {
        self.prefix_len == 32
    }

    pub fn is_default(&self) -> bool {
        self.prefix_len == 0
    }

    fn mask(&self) -> u32 {
        match self.prefix_len {
            0 => 0,
            len => u32::MAX << (32 - u32::from(len)),
        }
    }

    /// Returns the network address with host bits cleared.
    pub fn network(&self) -> Ipv4Address {
        Ipv4Address::from_bits(self.address.to_bits() & self.mask())
    }

    /// Returns true if `addr` falls inside this prefix.
    pub fn contains(&self, addr: Ipv4Address) -> bool {
        (addr.to_bits() & self.mask()) == (self.address.to_bits() & self.mask())
    }
}

impl fmt::Display for Ipv4Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

impl FromStr for Ipv4Prefix {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr_str, len_str) = s
            .trim()
            .rsplit_once('/')
            .ok_or_else(|| ParseError::InvalidIpPrefix(s.to_string()))?;

        let address: Ipv4Address = addr_str
            .parse()
            .map_err(|_| ParseError::InvalidIpPrefix(s.to_string()))?;
        let prefix_len: u8 = len_str
            .parse()
            .map_err(|_| ParseError::InvalidIpPrefix(s.to_string()))?;

        Ipv4Prefix::new(address, prefix_len)
    }
}

impl TryFrom<String> for Ipv4Prefix {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Ipv4Prefix> for String {
    fn from(prefix: Ipv4Prefix) -> String {
        prefix.to_string()
    }
}
