//! Topology loading and the link graph.

mod graph;
mod types;

pub use graph::{build_graph, LinkPorts, NodeKind, TopologyGraph};
pub use types::{HostSpec, LinkSpec, SwitchSpec, Topology, TopologyError};
