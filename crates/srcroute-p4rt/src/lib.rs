//! Switch-programming layer for the source-routing P4 pipeline.
//!
//! This crate describes what the controller pushes to a switch and how it
//! talks to one, without committing to a particular wire transport.
//!
//! # Architecture
//!
//! - [`types`]: table entries of the `ipv4_lpm` table, the closed set of
//!   `append_N_tags` actions, read queries and counter records
//! - [`error`]: transport status codes and [`TransportError`]
//! - [`api`]: the [`SwitchConnection`] and [`Connector`] traits
//! - [`sim`]: an in-memory fabric implementing those traits
//!
//! # Example
//!
//! ```ignore
//! use srcroute_p4rt::{Connector, PipelineOptions, SimFabric, TableEntry};
//!
//! async fn program(fabric: &SimFabric) -> srcroute_p4rt::TransportResult<()> {
//!     let mut conn = fabric
//!         .connect("s1", "127.0.0.1:50001", &PipelineOptions::default())
//!         .await?;
//!     conn.write(&[TableEntry::default_drop()]).await
//! }
//! ```

pub mod api;
pub mod error;
pub mod sim;
pub mod types;

pub use api::{Connector, ReadStream, SwitchConnection};
pub use error::{P4rtStatus, TransportError, TransportResult};
pub use sim::{SimFabric, SimSwitchSnapshot};
pub use types::{
    AppendTags, CounterRecord, EntryKey, PipelineOptions, ReadItem, ReadQuery, TableAction,
    TableEntry, DROP_ACTION, IPV4_LPM_COUNTER, IPV4_LPM_TABLE, LANE_BITS, MAX_HOPS, MIN_HOPS,
};
