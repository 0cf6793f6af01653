//! Undirected link graph of the topology.
//!
//! Nodes are every switch plus every host named by a link; edges carry the
//! port numbers on both ends. Two links between the same pair of nodes
//! collapse into one edge holding the ports of the later link.

use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::HashMap;

use super::types::Topology;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Switch,
    Host,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct GraphNode {
    name: String,
    kind: NodeKind,
}

/// Port annotation of one link, as written in the topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkPorts {
    pub source: String,
    pub target: String,
    pub source_port: u16,
    pub target_port: u16,
}

impl LinkPorts {
    /// Ports as `(port on from, port on to)`.
    fn oriented(&self, from: &str) -> (u16, u16) {
        if self.source == from {
            (self.source_port, self.target_port)
        } else {
            (self.target_port, self.source_port)
        }
    }
}

/// Read-only graph view of a [`Topology`].
#[derive(Debug, Clone)]
pub struct TopologyGraph {
    graph: UnGraph<GraphNode, LinkPorts>,
    nodes: HashMap<String, NodeIndex>,
}

/// Builds the link graph of `topology`.
pub fn build_graph(topology: &Topology) -> TopologyGraph {
    TopologyGraph::build(topology)
}

impl TopologyGraph {
    pub fn build(topology: &Topology) -> Self {
        let mut graph = UnGraph::new_undirected();
        let mut nodes = HashMap::new();

        for switch in &topology.switches {
            let index = graph.add_node(GraphNode {
                name: switch.name.clone(),
                kind: NodeKind::Switch,
            });
            nodes.insert(switch.name.clone(), index);
        }

        for link in &topology.links {
            let mut endpoint = |name: &str| {
                *nodes.entry(name.to_string()).or_insert_with(|| {
                    graph.add_node(GraphNode {
                        name: name.to_string(),
                        kind: NodeKind::Host,
                    })
                })
            };
            let a = endpoint(&link.source);
            let b = endpoint(&link.target);

            graph.update_edge(
                a,
                b,
                LinkPorts {
                    source: link.source.clone(),
                    target: link.target.clone(),
                    source_port: link.source_port,
                    target_port: link.target_port,
                },
            );
        }

        Self { graph, nodes }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn kind(&self, name: &str) -> Option<NodeKind> {
        self.nodes.get(name).map(|i| self.graph[*i].kind)
    }

    /// Names of the nodes adjacent to `name`, sorted.
    pub fn neighbors(&self, name: &str) -> Vec<&str> {
        let Some(index) = self.nodes.get(name) else {
            return Vec::new();
        };
        let mut names: Vec<&str> = self
            .graph
            .neighbors(*index)
            .map(|n| self.graph[n].name.as_str())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Ports of the link between `from` and `to`, as `(port on from, port on to)`.
    pub fn link_ports(&self, from: &str, to: &str) -> Option<(u16, u16)> {
        let a = *self.nodes.get(from)?;
        let b = *self.nodes.get(to)?;
        let edge = self.graph.find_edge(a, b)?;
        Some(self.graph[edge].oriented(from))
    }
}
