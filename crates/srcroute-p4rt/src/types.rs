//! Table entries, actions and read queries of the source-routing pipeline.
//!
//! The pipeline has a single forwarding table, `ipv4_lpm`, keyed on the
//! destination address. Its default action is `drop`; every other entry
//! invokes one of eight `append_N_tags` actions that push `N` source-routing
//! tags onto the packet. Each action takes one argument, `route_data`, whose
//! width is fixed by `N`.

use crate::error::{TransportError, TransportResult};
use srcroute_types::Ipv4Prefix;
use std::fmt;
use std::path::PathBuf;

/// Name of the forwarding table.
pub const IPV4_LPM_TABLE: &str = "ipv4_lpm";

/// Name of the direct counter attached to the forwarding table.
pub const IPV4_LPM_COUNTER: &str = "ipv4_lpm_counter";

/// Name of the default action of the forwarding table.
pub const DROP_ACTION: &str = "drop";

/// Fewest hops an `append_N_tags` action can carry.
pub const MIN_HOPS: usize = 2;

/// Most hops an `append_N_tags` action can carry.
pub const MAX_HOPS: usize = 9;

/// Width of one hop lane inside `route_data`.
pub const LANE_BITS: u32 = 16;

/// The closed set of tag-pushing actions, one per hop count.
///
/// Selection is by `hop_count - 2` into [`AppendTags::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AppendTags {
    Append2,
    Append3,
    Append4,
    Append5,
    Append6,
    Append7,
    Append8,
    Append9,
}

impl AppendTags {
    pub const ALL: [AppendTags; 8] = [
        AppendTags::Append2,
        AppendTags::Append3,
        AppendTags::Append4,
        AppendTags::Append5,
        AppendTags::Append6,
        AppendTags::Append7,
        AppendTags::Append8,
        AppendTags::Append9,
    ];

    /// Returns the action for `hops` tags, or `None` outside `2..=9`.
    pub fn for_hop_count(hops: usize) -> Option<Self> {
        hops.checked_sub(MIN_HOPS)
            .and_then(|index| Self::ALL.get(index))
            .copied()
    }

    pub const fn hop_count(self) -> usize {
        match self {
            AppendTags::Append2 => 2,
            AppendTags::Append3 => 3,
            AppendTags::Append4 => 4,
            AppendTags::Append5 => 5,
            AppendTags::Append6 => 6,
            AppendTags::Append7 => 7,
            AppendTags::Append8 => 8,
            AppendTags::Append9 => 9,
        }
    }

    /// Width in bits of the `route_data` argument.
    pub const fn bitwidth(self) -> u32 {
        LANE_BITS * self.hop_count() as u32
    }

    /// Width in bytes of the `route_data` argument.
    pub const fn byte_width(self) -> usize {
        self.bitwidth() as usize / 8
    }

    /// The action name as it appears in the pipeline description.
    pub const fn name(self) -> &'static str {
        match self {
            AppendTags::Append2 => "append_2_tags",
            AppendTags::Append3 => "append_3_tags",
            AppendTags::Append4 => "append_4_tags",
            AppendTags::Append5 => "append_5_tags",
            AppendTags::Append6 => "append_6_tags",
            AppendTags::Append7 => "append_7_tags",
            AppendTags::Append8 => "append_8_tags",
            AppendTags::Append9 => "append_9_tags",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.name() == name)
    }
}

impl fmt::Display for AppendTags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Action bound to a forwarding-table entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TableAction {
    /// Discard the packet.
    Drop,
    /// Push the tag stack described by `route_data`.
    ///
    /// `route_data` is the big-endian byte string of the encoded route and is
    /// exactly [`AppendTags::byte_width`] bytes long.
    AppendTags {
        action: AppendTags,
        route_data: Vec<u8>,
    },
}

impl TableAction {
    pub fn name(&self) -> &'static str {
        match self {
            TableAction::Drop => DROP_ACTION,
            TableAction::AppendTags { action, .. } => action.name(),
        }
    }
}

impl fmt::Display for TableAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableAction::Drop => f.write_str(DROP_ACTION),
            TableAction::AppendTags { action, route_data } => {
                write!(f, "{}(route_data=0x", action)?;
                for byte in route_data {
                    write!(f, "{:02x}", byte)?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Identity of an entry inside a table: the table name plus its match key.
///
/// The default entry of a table has no match key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryKey {
    pub table: String,
    pub match_key: Option<Ipv4Prefix>,
}

/// A match-action record of the forwarding table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableEntry {
    pub table: String,
    /// LPM match on the destination address; `None` for the default entry.
    pub match_key: Option<Ipv4Prefix>,
    pub action: TableAction,
    pub is_default: bool,
}

impl TableEntry {
    /// The catch-all entry that drops unmatched traffic.
    pub fn default_drop() -> Self {
        Self {
            table: IPV4_LPM_TABLE.to_string(),
            match_key: None,
            action: TableAction::Drop,
            is_default: true,
        }
    }

    /// A forwarding entry pushing `route_data` for packets towards `destination`.
    pub fn forward(destination: Ipv4Prefix, action: AppendTags, route_data: Vec<u8>) -> Self {
        Self {
            table: IPV4_LPM_TABLE.to_string(),
            match_key: Some(destination),
            action: TableAction::AppendTags { action, route_data },
            is_default: false,
        }
    }

    pub fn key(&self) -> EntryKey {
        EntryKey {
            table: self.table.clone(),
            match_key: self.match_key,
        }
    }

    /// Checks the structural rules a switch would enforce.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidEntry`] when a default entry carries
    /// a match key, a non-default entry lacks one, or `route_data` does not
    /// have the width its action expects.
    pub fn validate(&self) -> TransportResult<()> {
        match (self.is_default, self.match_key) {
            (true, Some(key)) => {
                return Err(TransportError::invalid_entry(format!(
                    "default entry of {} must not match on {}",
                    self.table, key
                )))
            }
            (false, None) => {
                return Err(TransportError::invalid_entry(format!(
                    "entry of {} is missing its match key",
                    self.table
                )))
            }
            _ => {}
        }

        if let TableAction::AppendTags { action, route_data } = &self.action {
            if route_data.len() != action.byte_width() {
                return Err(TransportError::invalid_entry(format!(
                    "{} expects {} bits of route_data, got {}",
                    action,
                    action.bitwidth(),
                    route_data.len() * 8
                )));
            }
        }

        Ok(())
    }
}

impl fmt::Display for TableEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.match_key {
            Some(key) => write!(f, "{} dstAddr={} -> {}", self.table, key, self.action),
            None => write!(f, "{} <default> -> {}", self.table, self.action),
        }
    }
}

/// Hit counter of one forwarding-table entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterRecord {
    pub counter: String,
    /// Match key of the entry the counter belongs to; `None` for the default entry.
    pub match_key: Option<Ipv4Prefix>,
    pub packet_count: u64,
    pub byte_count: u64,
}

/// A read request scoped to one table or counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReadQuery {
    TableEntries { table: String },
    DirectCounters { counter: String },
}

impl ReadQuery {
    pub fn ipv4_lpm_entries() -> Self {
        ReadQuery::TableEntries {
            table: IPV4_LPM_TABLE.to_string(),
        }
    }

    pub fn ipv4_lpm_counters() -> Self {
        ReadQuery::DirectCounters {
            counter: IPV4_LPM_COUNTER.to_string(),
        }
    }
}

/// One result of a read request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReadItem {
    Entry(TableEntry),
    Counter(CounterRecord),
}

/// Pipeline artefacts and device identity pushed when connecting to a switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Pipeline description (p4info text file).
    pub p4info: Option<PathBuf>,
    /// Target-specific device configuration (compiled pipeline JSON).
    pub p4blob: Option<PathBuf>,
    pub device_id: u64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            p4info: None,
            p4blob: None,
            device_id: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use srcroute_types::Ipv4Address;

    #[test]
    fn test_append_tags_selection_by_hop_count() {
        assert_eq!(AppendTags::for_hop_count(0), None);
        assert_eq!(AppendTags::for_hop_count(1), None);
        assert_eq!(AppendTags::for_hop_count(2), Some(AppendTags::Append2));
        assert_eq!(AppendTags::for_hop_count(9), Some(AppendTags::Append9));
        assert_eq!(AppendTags::for_hop_count(10), None);

        for hops in MIN_HOPS..=MAX_HOPS {
            let action = AppendTags::for_hop_count(hops).unwrap();
            assert_eq!(action.hop_count(), hops);
            assert_eq!(action.bitwidth() as usize, 16 * hops);
            assert_eq!(action.name(), format!("append_{}_tags", hops));
            assert_eq!(AppendTags::from_name(action.name()), Some(action));
        }
    }

    #[test]
    fn test_default_drop_entry() {
        let entry = TableEntry::default_drop();
        assert!(entry.is_default);
        assert_eq!(entry.action.name(), "drop");
        assert!(entry.validate().is_ok());
        assert_eq!(entry.to_string(), "ipv4_lpm <default> -> drop");
    }

    #[test]
    fn test_forward_entry_display() {
        let dst = Ipv4Prefix::host(Ipv4Address::new(10, 0, 0, 2));
        let entry = TableEntry::forward(dst, AppendTags::Append2, vec![0x80, 0x02, 0x00, 0x01]);
        assert!(entry.validate().is_ok());
        assert_eq!(
            entry.to_string(),
            "ipv4_lpm dstAddr=10.0.0.2/32 -> append_2_tags(route_data=0x80020001)"
        );
    }

    #[test]
    fn test_validate_rejects_wrong_width() {
        let dst = Ipv4Prefix::host(Ipv4Address::new(10, 0, 0, 2));
        let entry = TableEntry::forward(dst, AppendTags::Append3, vec![0x80, 0x02, 0x00, 0x01]);
        assert!(matches!(
            entry.validate(),
            Err(TransportError::InvalidEntry { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_default_with_key() {
        let mut entry = TableEntry::default_drop();
        entry.match_key = Some(Ipv4Prefix::host(Ipv4Address::new(10, 0, 0, 2)));
        assert!(entry.validate().is_err());
    }
}
