//! Topology document types.
//!
//! The document is a JSON object with `switches`, `hosts` and `links`
//! arrays:
//!
//! ```json
//! {
//!   "switches": [{"name": "s1", "address": "127.0.0.1", "port": 50001}],
//!   "hosts": [{"name": "h1", "ip": "10.0.0.1/24", "mac": "00:00:00:00:00:01",
//!              "connected_to": "s1"}],
//!   "links": [{"source": "h1", "target": "s1", "source_port": 0, "target_port": 1}]
//! }
//! ```
//!
//! A switch's `address` may also be spelled `ip`. A host's `ip` may be a
//! bare address or an interface address with a prefix length.

use serde::{Deserialize, Deserializer};
use srcroute_types::{Ipv4Address, Ipv4Prefix, MacAddress};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for topology loading.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("Cannot read topology file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed topology: {0}")]
    Malformed(String),
}

/// A programmable switch and the endpoint of its control agent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SwitchSpec {
    pub name: String,
    #[serde(alias = "ip")]
    pub address: String,
    pub port: u16,
}

impl SwitchSpec {
    /// `address:port` of the control agent.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// An end host attached to one switch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HostSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(deserialize_with = "deserialize_interface")]
    pub ip: Ipv4Prefix,
    pub mac: MacAddress,
    pub connected_to: String,
}

impl HostSpec {
    pub fn address(&self) -> Ipv4Address {
        self.ip.address()
    }

    /// Match key that selects traffic for exactly this host.
    pub fn route_prefix(&self) -> Ipv4Prefix {
        Ipv4Prefix::host(self.ip.address())
    }
}

fn deserialize_interface<'de, D>(deserializer: D) -> Result<Ipv4Prefix, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ipv4Prefix::parse_interface(&raw).map_err(serde::de::Error::custom)
}

/// A bidirectional link between two named nodes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LinkSpec {
    pub source: String,
    pub target: String,
    pub source_port: u16,
    pub target_port: u16,
}

/// The loaded topology. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Topology {
    pub switches: Vec<SwitchSpec>,
    pub hosts: Vec<HostSpec>,
    pub links: Vec<LinkSpec>,
}

impl Topology {
    /// Reads and validates the topology document at `path`.
    ///
    /// # Errors
    ///
    /// [`TopologyError::Io`] if the file cannot be read,
    /// [`TopologyError::Malformed`] if it does not describe a topology.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TopologyError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| TopologyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Parses and validates a topology document.
    pub fn from_json(text: &str) -> Result<Self, TopologyError> {
        let topology: Topology =
            serde_json::from_str(text).map_err(|e| TopologyError::Malformed(e.to_string()))?;
        topology.validate()?;
        Ok(topology)
    }

    fn validate(&self) -> Result<(), TopologyError> {
        let mut switch_names = HashSet::new();
        for switch in &self.switches {
            if switch.name.is_empty() {
                return Err(TopologyError::Malformed("switch with empty name".into()));
            }
            if !switch_names.insert(switch.name.as_str()) {
                return Err(TopologyError::Malformed(format!(
                    "duplicate switch {}",
                    switch.name
                )));
            }
        }

        let mut host_names = HashSet::new();
        for host in &self.hosts {
            if !switch_names.contains(host.connected_to.as_str()) {
                return Err(TopologyError::Malformed(format!(
                    "host {} is connected to unknown switch {}",
                    host.ip, host.connected_to
                )));
            }
            if let Some(name) = &host.name {
                if switch_names.contains(name.as_str()) || !host_names.insert(name.as_str()) {
                    return Err(TopologyError::Malformed(format!(
                        "duplicate node name {}",
                        name
                    )));
                }
            }
        }

        let known = |name: &str| switch_names.contains(name) || host_names.contains(name);
        for link in &self.links {
            for endpoint in [&link.source, &link.target] {
                if !known(endpoint.as_str()) {
                    return Err(TopologyError::Malformed(format!(
                        "link {} - {} references unknown node {}",
                        link.source, link.target, endpoint
                    )));
                }
            }
        }

        Ok(())
    }

    /// The first host whose address is `ip`.
    pub fn find_host(&self, ip: Ipv4Address) -> Option<&HostSpec> {
        self.hosts.iter().find(|h| h.address() == ip)
    }

    pub fn switch(&self, name: &str) -> Option<&SwitchSpec> {
        self.switches.iter().find(|s| s.name == name)
    }

    pub fn switch_names(&self) -> impl Iterator<Item = &str> {
        self.switches.iter().map(|s| s.name.as_str())
    }
}
