//! Source-route encoding and table programming.
//!
//! - [`codec`] turns an ordered hop list into the lane-packed `route_data`
//!   parameter of an `append_N_tags` action, and back.
//! - [`PathOrch`] dispatches entries to switches: default entries on
//!   connect, forwarding entries on `add_path`.
//! - [`TableReader`] streams table entries and direct counters back.
//!
//! Nothing in this module ever opens a connection. A switch that is not
//! bound in the [`SwitchRegistry`](crate::switch::SwitchRegistry) is never
//! contacted.

pub mod codec;
mod orch;
mod reader;
mod types;

pub use orch::{Attached, PathOrch, Result, RouteError};
pub use reader::{CounterReading, CounterStream, EntryStream, TableReader};
pub use types::{DecodedHop, EncodedRoute};
