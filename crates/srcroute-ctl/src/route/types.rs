//! Encoded route types.

use srcroute_p4rt::{AppendTags, TableEntry};
use srcroute_types::Ipv4Prefix;
use std::fmt;

/// A hop list packed into 16-bit lanes.
///
/// `data` is the big-endian byte string of `Σ lane_i << (16 * i)`, always
/// exactly two bytes per hop. Lane 0 (the first hop) sits in the last two
/// bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EncodedRoute {
    action: AppendTags,
    data: Vec<u8>,
}

impl EncodedRoute {
    pub(crate) fn new(action: AppendTags, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), action.byte_width());
        Self { action, data }
    }

    /// The `append_N_tags` action this route must be installed with.
    pub fn action(&self) -> AppendTags {
        self.action
    }

    pub fn hop_count(&self) -> usize {
        self.action.hop_count()
    }

    /// Width of the action parameter in bits (`16 * hop_count`).
    pub fn bitwidth(&self) -> u32 {
        self.action.bitwidth()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns the raw 16-bit lane of hop `index`.
    pub fn lane(&self, index: usize) -> Option<u16> {
        if index >= self.hop_count() {
            return None;
        }
        let end = self.data.len() - 2 * index;
        Some(u16::from_be_bytes([self.data[end - 2], self.data[end - 1]]))
    }

    /// The route as an integer, when it fits in 128 bits (up to 8 hops).
    pub fn to_u128(&self) -> Option<u128> {
        if self.data.len() > 16 {
            return None;
        }
        Some(
            self.data
                .iter()
                .fold(0u128, |acc, byte| (acc << 8) | u128::from(*byte)),
        )
    }

    /// Builds the forwarding entry that pushes this route for `destination`.
    pub fn into_entry(self, destination: Ipv4Prefix) -> TableEntry {
        TableEntry::forward(destination, self.action, self.data)
    }
}

impl fmt::Display for EncodedRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("0x")?;
        for byte in &self.data {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// One hop recovered from `route_data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecodedHop {
    pub port: u16,
    /// Bottom-of-stack flag; set on the final hop only.
    pub is_last: bool,
}

impl fmt::Display for DecodedHop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_last {
            write!(f, "{}(bos)", self.port)
        } else {
            write!(f, "{}", self.port)
        }
    }
}
