//! Common orchestration building blocks.
//!
//! - [`SyncMap`]: a keyed store whose lookups never create entries, so a
//!   query for an unknown switch can never conjure an empty slot for it.

mod sync_map;

pub use sync_map::{SyncMap, SyncMapError};
