//! NetworkController implementation.
//!
//! The controller owns one control session: the loaded topology and its
//! graph, the switch registry, and the dispatcher and reader built on top of
//! them. Connections are opened through a [`Connector`] and all closed again
//! by [`NetworkController::shutdown`].

use log::{error, info, warn};
use srcroute_p4rt::{Connector, TableEntry};
use srcroute_types::Ipv4Address;
use std::sync::Arc;
use tokio_stream::StreamExt;

use super::config::ControllerConfig;
use crate::route::{CounterReading, PathOrch, RouteError, TableReader};
use crate::switch::{SharedConnection, SwitchRegistry, SwitchStatus};
use crate::topology::{Topology, TopologyGraph};

/// Error type for session operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControllerError {
    #[error("Unknown switch: {0}")]
    UnknownSwitch(String),

    #[error("Cannot connect to {switch}: {message}")]
    Connect { switch: String, message: String },

    #[error(transparent)]
    Route(#[from] RouteError),
}

/// One control session over a switch fabric.
pub struct NetworkController {
    config: ControllerConfig,
    topology: Arc<Topology>,
    graph: TopologyGraph,
    registry: Arc<SwitchRegistry>,
    orch: PathOrch,
    reader: TableReader,
    connector: Arc<dyn Connector>,
}

impl NetworkController {
    /// Creates a session with one unbound slot per topology switch.
    pub fn new(
        topology: Topology,
        connector: Arc<dyn Connector>,
        config: ControllerConfig,
    ) -> Self {
        let topology = Arc::new(topology);
        let graph = TopologyGraph::build(&topology);
        let registry = Arc::new(SwitchRegistry::from_topology(&topology));
        let orch = PathOrch::new(Arc::clone(&topology), Arc::clone(&registry));
        let reader = TableReader::new(Arc::clone(&registry));

        info!(
            "Loaded topology: {} switches, {} hosts, {} links",
            topology.switches.len(),
            topology.hosts.len(),
            topology.links.len()
        );

        Self {
            config,
            topology,
            graph,
            registry,
            orch,
            reader,
            connector,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn graph(&self) -> &TopologyGraph {
        &self.graph
    }

    pub fn registry(&self) -> &Arc<SwitchRegistry> {
        &self.registry
    }

    pub fn path_orch(&self) -> &PathOrch {
        &self.orch
    }

    /// Starts the session, connecting every switch if configured to.
    pub async fn start(&self) -> usize {
        if self.config.connect_on_start {
            self.connect_all().await
        } else {
            0
        }
    }

    /// Connects every topology switch in turn.
    ///
    /// A switch that cannot be reached is logged and left unbound; the rest
    /// are still attempted. Returns how many switches are now connected.
    pub async fn connect_all(&self) -> usize {
        let names: Vec<String> = self.topology.switch_names().map(str::to_string).collect();
        for name in &names {
            if let Err(e) = self.connect_switch(name).await {
                error!("{}", e);
            }
        }
        let connected = self.registry.connected_switches().len();
        info!("{} of {} switches connected", connected, names.len());
        connected
    }

    /// Connects switch `name` and installs its default entries.
    ///
    /// An existing binding is replaced and closed once any operation still
    /// running on it has finished.
    ///
    /// # Errors
    ///
    /// [`ControllerError::UnknownSwitch`] if the topology has no such switch,
    /// [`ControllerError::Connect`] if the handshake fails. The previous
    /// binding, if any, is kept in that case.
    pub async fn connect_switch(&self, name: &str) -> Result<(), ControllerError> {
        let spec = self
            .topology
            .switch(name)
            .ok_or_else(|| ControllerError::UnknownSwitch(name.to_string()))?;
        let endpoint = spec.endpoint();

        let connection = self
            .connector
            .connect(name, &endpoint, &self.config.pipeline)
            .await
            .map_err(|e| ControllerError::Connect {
                switch: name.to_string(),
                message: e.to_string(),
            })?;
        info!("Connected to {} at {}", name, endpoint);

        let attached = self.orch.attach(name, connection).await;
        if let Some(previous) = attached.previous {
            Self::close(name, previous).await;
        }
        if !attached.defaults_installed {
            warn!("{} is connected without its default entries", name);
        }
        Ok(())
    }

    /// Drops the binding of switch `name` and closes its connection.
    ///
    /// # Errors
    ///
    /// [`ControllerError::UnknownSwitch`] for a name outside the topology,
    /// [`RouteError::SwitchNotConnected`] if it has no binding.
    pub async fn disconnect_switch(&self, name: &str) -> Result<(), ControllerError> {
        if self.topology.switch(name).is_none() {
            return Err(ControllerError::UnknownSwitch(name.to_string()));
        }
        let connection = self
            .registry
            .unregister(name)
            .ok_or_else(|| RouteError::SwitchNotConnected(name.to_string()))?;
        Self::close(name, connection).await;
        info!("Disconnected {}", name);
        Ok(())
    }

    async fn close(name: &str, connection: SharedConnection) {
        let mut connection = connection.lock().await;
        if let Err(e) = connection.close().await {
            warn!("Error closing connection to {}: {}", name, e);
        }
    }

    /// Re-installs the default entries on every connected switch.
    pub async fn initialize_switches(&self) -> usize {
        self.orch.install_defaults().await
    }

    /// Installs a path from `src` to `dst` through `ports`.
    ///
    /// A failure is logged once and handed back so the caller can report
    /// its cause.
    pub async fn add_communication_path(
        &self,
        src: Ipv4Address,
        dst: Ipv4Address,
        ports: &[u32],
    ) -> Result<(), RouteError> {
        self.orch
            .add_path(src, dst, ports)
            .await
            .map_err(|e| {
                error!("Cannot add path {} -> {}: {}", src, dst, e);
                e
            })
    }

    /// Reads back every `ipv4_lpm` entry of switch `name`.
    ///
    /// # Errors
    ///
    /// Fails without a partial result if the switch is not connected or the
    /// read breaks off.
    pub async fn query_table_entries(
        &self,
        name: &str,
    ) -> Result<Vec<TableEntry>, ControllerError> {
        let stream = self.reader.list_entries(name).await?;
        let entries = stream.collect::<Result<Vec<_>, RouteError>>().await?;
        Ok(entries)
    }

    /// Reads the hit counter of every `ipv4_lpm` entry of switch `name`.
    pub async fn check_table_matches(
        &self,
        name: &str,
    ) -> Result<Vec<CounterReading>, ControllerError> {
        let stream = self.reader.read_counters(name).await?;
        let readings = stream.collect::<Result<Vec<_>, RouteError>>().await?;
        Ok(readings)
    }

    pub fn switches(&self) -> Vec<SwitchStatus> {
        self.registry.status()
    }

    /// Closes every connection. Slots stay, unbound.
    pub async fn shutdown(&self) {
        let connections = self.registry.take_all();
        for (name, connection) in connections {
            Self::close(&name, connection).await;
        }
        info!("Controller shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use srcroute_p4rt::SimFabric;

    const TOPO: &str = r#"{
        "switches": [
            {"name": "s1", "address": "127.0.0.1", "port": 50001},
            {"name": "s2", "address": "127.0.0.1", "port": 50002}
        ],
        "hosts": [
            {"name": "h1", "ip": "10.0.0.1", "mac": "00:00:00:00:00:01", "connected_to": "s1"},
            {"name": "h2", "ip": "10.0.0.2", "mac": "00:00:00:00:00:02", "connected_to": "s2"}
        ],
        "links": [
            {"source": "s1", "target": "s2", "source_port": 2, "target_port": 2}
        ]
    }"#;

    fn controller() -> (SimFabric, NetworkController) {
        let topology = Topology::from_json(TOPO).unwrap();
        let fabric = SimFabric::new();
        for switch in &topology.switches {
            fabric.add_switch(&switch.name, switch.endpoint());
        }
        let controller =
            NetworkController::new(topology, Arc::new(fabric.clone()), ControllerConfig::default());
        (fabric, controller)
    }

    #[tokio::test]
    async fn test_start_connects_and_installs_defaults() {
        let (fabric, controller) = controller();

        assert_eq!(controller.start().await, 2);
        for name in ["s1", "s2"] {
            let snapshot = fabric.snapshot(name).unwrap();
            assert!(snapshot.connected);
            assert_eq!(snapshot.entries, vec![TableEntry::default_drop()]);
        }
    }

    #[tokio::test]
    async fn test_unreachable_switch_stays_unbound() {
        let (fabric, controller) = controller();
        fabric.set_reachable("s2", false);

        assert_eq!(controller.connect_all().await, 1);
        assert!(controller.registry().is_connected("s1"));
        assert!(!controller.registry().is_connected("s2"));

        let err = controller.connect_switch("s2").await.unwrap_err();
        assert!(matches!(err, ControllerError::Connect { ref switch, .. } if switch == "s2"));
    }

    #[tokio::test]
    async fn test_connect_unknown_switch() {
        let (_fabric, controller) = controller();
        assert_eq!(
            controller.connect_switch("s9").await,
            Err(ControllerError::UnknownSwitch("s9".to_string()))
        );
    }

    #[tokio::test]
    async fn test_reconnect_replaces_binding() {
        let (fabric, controller) = controller();
        controller.connect_switch("s1").await.unwrap();
        let first = controller.registry().connection("s1").unwrap();

        controller.connect_switch("s1").await.unwrap();
        let second = controller.registry().connection("s1").unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        let snapshot = fabric.snapshot("s1").unwrap();
        assert_eq!(snapshot.connects, 2);
        assert!(snapshot.connected);
        assert_eq!(snapshot.default_entries().count(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_then_operations_fail() {
        let (fabric, controller) = controller();
        controller.start().await;

        controller.disconnect_switch("s1").await.unwrap();
        assert!(!fabric.snapshot("s1").unwrap().connected);

        let ip = |s: &str| s.parse::<Ipv4Address>().unwrap();
        assert_eq!(
            controller
                .add_communication_path(ip("10.0.0.1"), ip("10.0.0.2"), &[1, 2])
                .await,
            Err(RouteError::SwitchNotConnected("s1".to_string()))
        );
        assert_eq!(
            controller.query_table_entries("s1").await,
            Err(ControllerError::Route(RouteError::SwitchNotConnected(
                "s1".to_string()
            )))
        );
        assert_eq!(
            controller.disconnect_switch("s1").await,
            Err(ControllerError::Route(RouteError::SwitchNotConnected(
                "s1".to_string()
            )))
        );
    }

    #[tokio::test]
    async fn test_switches_listing() {
        let (_fabric, controller) = controller();
        controller.connect_switch("s2").await.unwrap();

        let listing: Vec<(String, bool)> = controller
            .switches()
            .into_iter()
            .map(|s| (s.name, s.connected))
            .collect();
        assert_eq!(
            listing,
            vec![("s1".to_string(), false), ("s2".to_string(), true)]
        );
    }

    #[tokio::test]
    async fn test_shutdown_closes_everything() {
        let (fabric, controller) = controller();
        controller.start().await;
        controller.shutdown().await;

        assert!(controller.registry().connected_switches().is_empty());
        assert!(!fabric.snapshot("s1").unwrap().connected);
        assert!(!fabric.snapshot("s2").unwrap().connected);
    }

    #[test]
    fn test_graph_is_built() {
        let (_fabric, controller) = controller();
        assert_eq!(controller.graph().edge_count(), 1);
        assert_eq!(controller.graph().link_ports("s1", "s2"), Some((2, 2)));
    }
}
