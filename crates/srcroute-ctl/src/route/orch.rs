//! PathOrch implementation.
//!
//! PathOrch is the only component that writes to switches. It sends single
//! entries to bound connections, installs each switch's default entries, and
//! turns an operator path request into a forwarding entry on the ingress
//! switch.

use log::{debug, error, info, warn};
use srcroute_p4rt::{SwitchConnection, TableEntry};
use srcroute_types::Ipv4Address;
use std::sync::Arc;

use super::codec;
use crate::switch::{SharedConnection, SwitchRegistry};
use crate::topology::Topology;

/// Error type for route operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("Number of hops must be between 2 and 9, got {0}")]
    InvalidHopCount(usize),

    #[error("Port {port} at hop {index} exceeds 32767")]
    PortOutOfRange { index: usize, port: u32 },

    #[error("Host not found: {0}")]
    HostNotFound(Ipv4Address),

    #[error("Switch {0} not connected")]
    SwitchNotConnected(String),

    #[error("Transport error on {switch}: {message}")]
    Transport { switch: String, message: String },
}

/// Result type for route operations.
pub type Result<T> = std::result::Result<T, RouteError>;

/// Outcome of [`PathOrch::attach`].
pub struct Attached {
    /// Binding that was replaced.
    pub previous: Option<SharedConnection>,
    /// Whether every default entry was written.
    pub defaults_installed: bool,
}

impl std::fmt::Debug for Attached {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attached")
            .field("replaced", &self.previous.is_some())
            .field("defaults_installed", &self.defaults_installed)
            .finish()
    }
}

/// Entry dispatcher for the switch fabric.
#[derive(Debug, Clone)]
pub struct PathOrch {
    topology: Arc<Topology>,
    registry: Arc<SwitchRegistry>,
}

impl PathOrch {
    pub fn new(topology: Arc<Topology>, registry: Arc<SwitchRegistry>) -> Self {
        Self { topology, registry }
    }

    pub fn registry(&self) -> &Arc<SwitchRegistry> {
        &self.registry
    }

    /// Sends `entry` to switch `name`.
    ///
    /// Returns `false` when the switch has no live binding (the transport is
    /// never touched) or when the switch rejects the write. Both cases are
    /// logged with the switch name and reason.
    pub async fn write_entry(&self, name: &str, entry: TableEntry) -> bool {
        self.try_write(name, &entry).await.is_ok()
    }

    async fn try_write(&self, name: &str, entry: &TableEntry) -> Result<()> {
        let Some(connection) = self.registry.connection(name) else {
            let e = RouteError::SwitchNotConnected(name.to_string());
            warn!("{}", e);
            return Err(e);
        };

        let mut connection = connection.lock().await;
        Self::send(name, &mut **connection, entry).await
    }

    async fn send(
        name: &str,
        connection: &mut dyn SwitchConnection,
        entry: &TableEntry,
    ) -> Result<()> {
        match connection.write(std::slice::from_ref(entry)).await {
            Ok(()) => {
                debug!("Wrote to {}: {}", name, entry);
                Ok(())
            }
            Err(e) => {
                let message = if e.is_transient() {
                    format!("{} (transient)", e)
                } else {
                    e.to_string()
                };
                error!("Error writing to {}: {}", name, message);
                Err(RouteError::Transport {
                    switch: name.to_string(),
                    message,
                })
            }
        }
    }

    /// Binds a fresh connection to `name` and installs its default entries.
    ///
    /// The connection is locked before it becomes visible in the registry
    /// and stays locked until the defaults are written, so no forwarding
    /// entry can reach the switch ahead of its drop default. The replaced
    /// binding, if any, is returned for the caller to close.
    pub async fn attach(&self, name: &str, connection: Box<dyn SwitchConnection>) -> Attached {
        let shared: SharedConnection = Arc::new(tokio::sync::Mutex::new(connection));
        let mut guard = Arc::clone(&shared).lock_owned().await;
        let previous = self.registry.register_shared(name, shared);

        let mut defaults_installed = true;
        for entry in self.registry.default_entries(name) {
            defaults_installed &= Self::send(name, &mut **guard, &entry).await.is_ok();
        }
        drop(guard);

        if defaults_installed {
            info!("Installed default entries on {}", name);
        }
        Attached {
            previous,
            defaults_installed,
        }
    }

    /// Writes the default entries of one switch.
    ///
    /// Every default entry is attempted; returns `true` only if all succeed.
    pub async fn install_defaults_for(&self, name: &str) -> bool {
        let entries = self.registry.default_entries(name);
        if entries.is_empty() {
            warn!("No default entries configured for {}", name);
            return false;
        }

        let mut all_ok = true;
        for entry in entries {
            all_ok &= self.write_entry(name, entry).await;
        }
        if all_ok {
            info!("Installed default entries on {}", name);
        }
        all_ok
    }

    /// Writes the default entries of every connected switch.
    ///
    /// Switches are handled independently: a failure on one is logged and
    /// does not stop the others. Returns the number of switches whose
    /// defaults were fully installed. Safe to repeat, since a write to an
    /// existing key replaces it.
    pub async fn install_defaults(&self) -> usize {
        let mut installed = 0;
        for name in self.registry.connected_switches() {
            if self.install_defaults_for(&name).await {
                installed += 1;
            }
        }
        installed
    }

    /// Installs a path from `src` to `dst` through the given output ports.
    ///
    /// The entry is written to the switch the source host is attached to,
    /// matching exactly `dst`. The ports are not checked against the
    /// topology.
    ///
    /// # Errors
    ///
    /// - [`RouteError::HostNotFound`] if either address is unknown
    /// - [`RouteError::InvalidHopCount`] / [`RouteError::PortOutOfRange`]
    ///   if `ports` cannot be encoded
    ///
    /// Nothing is sent to any switch in these cases. A write that does not
    /// go through fails with [`RouteError::SwitchNotConnected`] or
    /// [`RouteError::Transport`].
    pub async fn add_path(&self, src: Ipv4Address, dst: Ipv4Address, ports: &[u32]) -> Result<()> {
        let src_host = self
            .topology
            .find_host(src)
            .ok_or(RouteError::HostNotFound(src))?;
        let dst_host = self
            .topology
            .find_host(dst)
            .ok_or(RouteError::HostNotFound(dst))?;

        let route = codec::encode(ports)?;
        let ingress = src_host.connected_to.as_str();
        debug!(
            "Encoded {:?} as {} ({} bits) for {} -> {}",
            ports,
            route,
            route.bitwidth(),
            src,
            dst
        );

        let entry = route.into_entry(dst_host.route_prefix());
        self.try_write(ingress, &entry).await?;
        info!(
            "Added path {} -> {} via ports {:?} on {}",
            src, dst, ports, ingress
        );
        Ok(())
    }
}
