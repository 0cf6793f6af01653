//! Registry of switch slots.
//!
//! Every switch named by the topology gets one slot holding its address, its
//! default entries, and (once connected) the live connection. The connection
//! sits behind an async mutex so at most one write or read is in flight per
//! switch; the slot table itself is a plain `RwLock` that is never held
//! across an await point.

use log::{debug, info, warn};
use srcroute_orch_common::SyncMap;
use srcroute_p4rt::{SwitchConnection, TableEntry};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::topology::Topology;

/// A connection shared between the dispatcher and any open read stream.
pub type SharedConnection = Arc<tokio::sync::Mutex<Box<dyn SwitchConnection>>>;

struct SwitchSlot {
    address: String,
    connection: Option<SharedConnection>,
    default_entries: Vec<TableEntry>,
}

impl SwitchSlot {
    fn new(address: String) -> Self {
        Self {
            address,
            connection: None,
            default_entries: vec![TableEntry::default_drop()],
        }
    }
}

/// Listing row for one switch slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchStatus {
    pub name: String,
    pub address: String,
    pub connected: bool,
}

/// Switch name to slot mapping.
#[derive(Default)]
pub struct SwitchRegistry {
    slots: RwLock<SyncMap<String, SwitchSlot>>,
}

impl SwitchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates one unbound slot per topology switch, each with the drop
    /// default entry for `ipv4_lpm`. A repeated switch name keeps its first
    /// address.
    pub fn from_topology(topology: &Topology) -> Self {
        let mut slots = SyncMap::new();
        for switch in &topology.switches {
            let slot = SwitchSlot::new(switch.endpoint());
            if let Err(e) = slots.insert_new(switch.name.clone(), slot) {
                warn!("Ignoring repeated switch {}: {}", switch.endpoint(), e);
            }
        }
        Self {
            slots: RwLock::new(slots),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SyncMap<String, SwitchSlot>> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SyncMap<String, SwitchSlot>> {
        self.slots.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Binds `connection` to `name`, returning the binding it replaced.
    ///
    /// A switch the registry has never seen gets a fresh slot with the drop
    /// default entry and an empty address.
    pub fn register(
        &self,
        name: &str,
        connection: Box<dyn SwitchConnection>,
    ) -> Option<SharedConnection> {
        self.register_shared(name, Arc::new(tokio::sync::Mutex::new(connection)))
    }

    /// Same as [`SwitchRegistry::register`] for an already shared connection.
    pub fn register_shared(
        &self,
        name: &str,
        shared: SharedConnection,
    ) -> Option<SharedConnection> {
        let mut slots = self.write();
        let key = name.to_string();

        let previous = match slots.require_mut(&key) {
            Ok(slot) => slot.connection.replace(shared),
            Err(_) => {
                info!("Registering switch {} outside the topology", name);
                let mut slot = SwitchSlot::new(String::new());
                slot.connection = Some(shared);
                slots.insert(key, slot);
                None
            }
        };
        debug!(
            "Bound connection for {}{}",
            name,
            if previous.is_some() { " (replaced)" } else { "" }
        );
        previous
    }

    /// Removes the binding for `name`, keeping its slot.
    pub fn unregister(&self, name: &str) -> Option<SharedConnection> {
        match self.write().require_mut(&name.to_string()) {
            Ok(slot) => slot.connection.take(),
            Err(e) => {
                debug!("Nothing to unregister: {}", e);
                None
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(&name.to_string())
    }

    pub fn is_connected(&self, name: &str) -> bool {
        self.read()
            .get(&name.to_string())
            .is_some_and(|slot| slot.connection.is_some())
    }

    pub fn connection(&self, name: &str) -> Option<SharedConnection> {
        self.read()
            .get(&name.to_string())
            .and_then(|slot| slot.connection.clone())
    }

    pub fn address(&self, name: &str) -> Option<String> {
        self.read()
            .get(&name.to_string())
            .map(|slot| slot.address.clone())
    }

    /// Default entries configured for `name`; empty for unknown switches.
    pub fn default_entries(&self, name: &str) -> Vec<TableEntry> {
        match self.read().require(&name.to_string()) {
            Ok(slot) => slot.default_entries.clone(),
            Err(e) => {
                debug!("No default entries: {}", e);
                Vec::new()
            }
        }
    }

    /// Names of all switches with a live binding, in name order.
    pub fn connected_switches(&self) -> Vec<String> {
        self.read()
            .iter()
            .filter(|(_, slot)| slot.connection.is_some())
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn status(&self) -> Vec<SwitchStatus> {
        self.read()
            .iter()
            .map(|(name, slot)| SwitchStatus {
                name: name.clone(),
                address: slot.address.clone(),
                connected: slot.connection.is_some(),
            })
            .collect()
    }

    /// Unbinds every connection, returning them for teardown.
    pub fn take_all(&self) -> Vec<(String, SharedConnection)> {
        self.write()
            .iter_mut()
            .filter_map(|(name, slot)| slot.connection.take().map(|c| (name.clone(), c)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

impl std::fmt::Debug for SwitchRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwitchRegistry")
            .field("switches", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use srcroute_p4rt::{ReadItem, ReadQuery, ReadStream, TransportResult};

    struct NullConnection(&'static str);

    #[async_trait]
    impl SwitchConnection for NullConnection {
        fn name(&self) -> &str {
            self.0
        }

        async fn write(&mut self, _entries: &[TableEntry]) -> TransportResult<()> {
            Ok(())
        }

        async fn read(&mut self, _query: &ReadQuery) -> TransportResult<ReadStream> {
            Ok(Box::pin(tokio_stream::empty::<TransportResult<ReadItem>>()))
        }

        async fn close(&mut self) -> TransportResult<()> {
            Ok(())
        }
    }

    fn two_switches() -> Topology {
        Topology::from_json(
            r#"{
                "switches": [
                    {"name": "s2", "address": "127.0.0.1", "port": 50002},
                    {"name": "s1", "address": "127.0.0.1", "port": 50001}
                ],
                "hosts": [],
                "links": []
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_from_topology_starts_unbound() {
        let registry = SwitchRegistry::from_topology(&two_switches());

        assert_eq!(registry.len(), 2);
        assert!(!registry.is_connected("s1"));
        assert!(registry.connection("s1").is_none());
        assert_eq!(registry.address("s1").as_deref(), Some("127.0.0.1:50001"));
        assert_eq!(registry.default_entries("s1"), vec![TableEntry::default_drop()]);
        assert!(registry.connected_switches().is_empty());
    }

    #[test]
    fn test_repeated_switch_keeps_first_address() {
        let mut topology = two_switches();
        let mut repeat = topology.switches[1].clone();
        repeat.port = 60001;
        topology.switches.push(repeat);

        let registry = SwitchRegistry::from_topology(&topology);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.address("s1").as_deref(), Some("127.0.0.1:50001"));
    }

    #[test]
    fn test_lookups_do_not_create_slots() {
        let registry = SwitchRegistry::from_topology(&two_switches());

        assert!(!registry.is_connected("s9"));
        assert!(registry.connection("s9").is_none());
        assert!(registry.default_entries("s9").is_empty());
        assert!(registry.unregister("s9").is_none());
        assert!(!registry.contains("s9"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_register_replaces_previous_binding() {
        let registry = SwitchRegistry::from_topology(&two_switches());

        assert!(registry.register("s1", Box::new(NullConnection("s1"))).is_none());
        assert!(registry.register("s1", Box::new(NullConnection("s1"))).is_some());
        assert_eq!(registry.connected_switches(), vec!["s1".to_string()]);

        assert!(registry.unregister("s1").is_some());
        assert!(!registry.is_connected("s1"));
        assert!(registry.contains("s1"));
    }

    #[test]
    fn test_register_unknown_switch_creates_slot() {
        let registry = SwitchRegistry::new();
        registry.register("s5", Box::new(NullConnection("s5")));

        assert!(registry.is_connected("s5"));
        assert_eq!(registry.default_entries("s5"), vec![TableEntry::default_drop()]);
        assert_eq!(registry.address("s5").as_deref(), Some(""));
    }

    #[test]
    fn test_status_and_take_all() {
        let registry = SwitchRegistry::from_topology(&two_switches());
        registry.register("s2", Box::new(NullConnection("s2")));

        let status = registry.status();
        assert_eq!(
            status,
            vec![
                SwitchStatus {
                    name: "s1".to_string(),
                    address: "127.0.0.1:50001".to_string(),
                    connected: false,
                },
                SwitchStatus {
                    name: "s2".to_string(),
                    address: "127.0.0.1:50002".to_string(),
                    connected: true,
                },
            ]
        );

        let taken = registry.take_all();
        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].0, "s2");
        assert!(registry.connected_switches().is_empty());
    }
}
