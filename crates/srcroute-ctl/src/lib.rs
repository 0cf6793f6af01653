//! Control plane for a source-routed P4 switch fabric.
//!
//! Packets entering the fabric carry a stack of output-port tags; every
//! switch pops one tag and forwards accordingly. This crate turns an
//! operator-chosen hop sequence into the table entry that pushes that stack
//! at the ingress switch, and keeps track of which switches it can program.
//!
//! # Architecture
//!
//! ```text
//! topo.json ──> [Topology] ──> [SwitchRegistry] (one slot per switch)
//!                   │                 │
//!   operator ──> [PathOrch] ── encode ──> write ──> switch
//!            └─> [TableReader] ── read ──────────> switch
//! ```
//!
//! # Key Components
//!
//! - [`route::codec`]: packs 2..=9 hop ports into fixed 16-bit lanes
//! - [`topology`]: the loaded topology and its graph
//! - [`switch::SwitchRegistry`]: switch name to live connection and default entries
//! - [`route::PathOrch`]: writes entries, installs defaults, adds paths
//! - [`route::TableReader`]: lazy table and counter reads
//! - [`daemon::NetworkController`]: the control session composing the above
//! - [`cli`]: the operator command surface

pub mod cli;
pub mod daemon;
pub mod route;
pub mod switch;
pub mod topology;

pub use daemon::{ControllerConfig, ControllerError, NetworkController};
pub use route::{
    CounterReading, DecodedHop, EncodedRoute, PathOrch, RouteError, TableReader,
};
pub use switch::{SharedConnection, SwitchRegistry, SwitchStatus};
pub use topology::{HostSpec, LinkSpec, SwitchSpec, Topology, TopologyError, TopologyGraph};
