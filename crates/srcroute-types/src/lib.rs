//! Network primitives shared by the source-routing control plane.
//!
//! - [`Ipv4Address`]: a host address as it appears in topology files and
//!   operator commands
//! - [`Ipv4Prefix`]: the match key of the `ipv4_lpm` forwarding table
//! - [`MacAddress`]: 48-bit Ethernet MAC addresses of attached hosts

mod ip;
mod mac;

pub use ip::{Ipv4Address, Ipv4Prefix};
pub use mac::MacAddress;

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid MAC address format: {0}")]
    InvalidMacAddress(String),

    #[error("invalid IPv4 address format: {0}")]
    InvalidIpAddress(String),

    #[error("invalid IPv4 prefix format: {0}")]
    InvalidIpPrefix(String),
}
