//! In-memory switch fabric.
//!
//! [`SimFabric`] stands in for a set of switch agents. Each simulated switch
//! keeps an `ipv4_lpm` table with upsert semantics and a direct counter per
//! entry. Tests and the controller's simulation mode use it to observe what
//! was written, inject traffic, and force transport failures.

use crate::api::{Connector, ReadStream, SwitchConnection};
use crate::error::{P4rtStatus, TransportError, TransportResult};
use crate::types::{
    CounterRecord, EntryKey, PipelineOptions, ReadItem, ReadQuery, TableAction, TableEntry,
    IPV4_LPM_COUNTER, IPV4_LPM_TABLE,
};
use async_trait::async_trait;
use log::{debug, info};
use srcroute_types::Ipv4Address;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct HitCount {
    packets: u64,
    bytes: u64,
}

#[derive(Debug)]
struct SimSwitch {
    address: String,
    reachable: bool,
    fail_writes: Option<P4rtStatus>,
    fail_reads: Option<P4rtStatus>,
    entries: BTreeMap<EntryKey, TableEntry>,
    counters: HashMap<EntryKey, HitCount>,
    /// Generation of the connection currently holding mastership.
    generation: u64,
    connected: bool,
    connects: usize,
    write_calls: usize,
    read_calls: usize,
    pipeline: Option<PipelineOptions>,
}

impl SimSwitch {
    fn new(address: String) -> Self {
        Self {
            address,
            reachable: true,
            fail_writes: None,
            fail_reads: None,
            entries: BTreeMap::new(),
            counters: HashMap::new(),
            generation: 0,
            connected: false,
            connects: 0,
            write_calls: 0,
            read_calls: 0,
            pipeline: None,
        }
    }

    fn counter_record(&self, key: &EntryKey) -> CounterRecord {
        let hits = self.counters.get(key).copied().unwrap_or_default();
        CounterRecord {
            counter: IPV4_LPM_COUNTER.to_string(),
            match_key: key.match_key,
            packet_count: hits.packets,
            byte_count: hits.bytes,
        }
    }
}

/// Point-in-time view of one simulated switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimSwitchSnapshot {
    pub address: String,
    pub connected: bool,
    /// Entries ordered by table then match key; default entries first.
    pub entries: Vec<TableEntry>,
    pub counters: Vec<CounterRecord>,
    pub connects: usize,
    pub write_calls: usize,
    pub read_calls: usize,
    pub pipeline: Option<PipelineOptions>,
}

impl SimSwitchSnapshot {
    pub fn default_entries(&self) -> impl Iterator<Item = &TableEntry> {
        self.entries.iter().filter(|e| e.is_default)
    }

    pub fn forward_entries(&self) -> impl Iterator<Item = &TableEntry> {
        self.entries.iter().filter(|e| !e.is_default)
    }
}

/// A shared set of simulated switches. Clones observe the same switches.
#[derive(Debug, Clone, Default)]
pub struct SimFabric {
    switches: Arc<Mutex<HashMap<String, SimSwitch>>>,
}

impl SimFabric {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SimSwitch>> {
        self.switches.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a switch agent listening on `address`. Re-adding resets it.
    pub fn add_switch(&self, name: impl Into<String>, address: impl Into<String>) {
        let name = name.into();
        let address = address.into();
        debug!("SimFabric: adding switch {} at {}", name, address);
        self.lock().insert(name, SimSwitch::new(address));
    }

    /// Makes later connection attempts to `name` succeed or be refused.
    pub fn set_reachable(&self, name: &str, reachable: bool) {
        if let Some(switch) = self.lock().get_mut(name) {
            switch.reachable = reachable;
        }
    }

    /// Makes writes to `name` fail with `status`, or succeed again with `None`.
    pub fn fail_writes(&self, name: &str, status: Option<P4rtStatus>) {
        if let Some(switch) = self.lock().get_mut(name) {
            switch.fail_writes = status;
        }
    }

    /// Makes reads from `name` fail with `status`, or succeed again with `None`.
    pub fn fail_reads(&self, name: &str, status: Option<P4rtStatus>) {
        if let Some(switch) = self.lock().get_mut(name) {
            switch.fail_reads = status;
        }
    }

    pub fn snapshot(&self, name: &str) -> Option<SimSwitchSnapshot> {
        let switches = self.lock();
        let switch = switches.get(name)?;
        Some(SimSwitchSnapshot {
            address: switch.address.clone(),
            connected: switch.connected,
            entries: switch.entries.values().cloned().collect(),
            counters: switch
                .entries
                .keys()
                .map(|key| switch.counter_record(key))
                .collect(),
            connects: switch.connects,
            write_calls: switch.write_calls,
            read_calls: switch.read_calls,
            pipeline: switch.pipeline.clone(),
        })
    }

    /// Sends one packet of `bytes` towards `destination` through switch `name`.
    ///
    /// The longest matching forwarding entry wins, falling back to the
    /// default entry. Its counter is bumped and its action returned; `None`
    /// means no entry matched (or the switch does not exist).
    pub fn inject_packet(
        &self,
        name: &str,
        destination: Ipv4Address,
        bytes: u64,
    ) -> Option<TableAction> {
        let mut switches = self.lock();
        let switch = switches.get_mut(name)?;

        let key = switch
            .entries
            .values()
            .filter(|e| e.table == IPV4_LPM_TABLE && !e.is_default)
            .filter(|e| e.match_key.is_some_and(|p| p.contains(destination)))
            .max_by_key(|e| e.match_key.map(|p| p.prefix_len()))
            .or_else(|| {
                switch
                    .entries
                    .values()
                    .find(|e| e.table == IPV4_LPM_TABLE && e.is_default)
            })
            .map(TableEntry::key)?;

        let action = switch.entries.get(&key).map(|e| e.action.clone());
        let hits = switch.counters.entry(key).or_default();
        hits.packets += 1;
        hits.bytes += bytes;
        action
    }
}

#[async_trait]
impl Connector for SimFabric {
    async fn connect(
        &self,
        name: &str,
        address: &str,
        options: &PipelineOptions,
    ) -> TransportResult<Box<dyn SwitchConnection>> {
        let mut switches = self.lock();
        let switch = switches
            .get_mut(name)
            .ok_or_else(|| TransportError::connect(address, format!("no agent for {}", name)))?;

        if !switch.reachable || switch.address != address {
            return Err(TransportError::connect(address, "connection refused"));
        }

        switch.generation += 1;
        switch.connects += 1;
        switch.connected = true;
        switch.pipeline = Some(options.clone());
        info!(
            "SimFabric: {} connected at {} (generation {})",
            name, address, switch.generation
        );

        Ok(Box::new(SimConnection {
            name: name.to_string(),
            fabric: self.clone(),
            generation: switch.generation,
            closed: false,
        }))
    }
}

/// Connection to one simulated switch.
struct SimConnection {
    name: String,
    fabric: SimFabric,
    generation: u64,
    closed: bool,
}

impl SimConnection {
    fn check_open(&self) -> TransportResult<()> {
        if self.closed {
            Err(TransportError::closed(&self.name))
        } else {
            Ok(())
        }
    }

    fn check_master(&self, switch: &SimSwitch) -> TransportResult<()> {
        if switch.generation != self.generation {
            return Err(TransportError::status(
                P4rtStatus::PermissionDenied,
                format!("{} is controlled by a newer connection", self.name),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl SwitchConnection for SimConnection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&mut self, entries: &[TableEntry]) -> TransportResult<()> {
        self.check_open()?;
        let mut switches = self.fabric.lock();
        let switch = switches
            .get_mut(&self.name)
            .ok_or_else(|| TransportError::closed(&self.name))?;

        switch.write_calls += 1;
        self.check_master(switch)?;
        if let Some(status) = switch.fail_writes.filter(|s| !s.is_ok()) {
            return Err(TransportError::status(status, "write rejected by switch"));
        }

        for entry in entries {
            entry.validate()?;
        }

        for entry in entries {
            let key = entry.key();
            debug!("SimFabric: {} <- {}", self.name, entry);
            switch.counters.entry(key.clone()).or_default();
            switch.entries.insert(key, entry.clone());
        }

        Ok(())
    }

    async fn read(&mut self, query: &ReadQuery) -> TransportResult<ReadStream> {
        self.check_open()?;
        let mut switches = self.fabric.lock();
        let switch = switches
            .get_mut(&self.name)
            .ok_or_else(|| TransportError::closed(&self.name))?;

        switch.read_calls += 1;
        if let Some(status) = switch.fail_reads.filter(|s| !s.is_ok()) {
            return Err(TransportError::status(status, "read rejected by switch"));
        }

        let items: Vec<TransportResult<ReadItem>> = match query {
            ReadQuery::TableEntries { table } if table == IPV4_LPM_TABLE => switch
                .entries
                .values()
                .filter(|e| &e.table == table)
                .cloned()
                .map(|e| Ok(ReadItem::Entry(e)))
                .collect(),
            ReadQuery::DirectCounters { counter } if counter == IPV4_LPM_COUNTER => switch
                .entries
                .keys()
                .filter(|key| key.table == IPV4_LPM_TABLE)
                .map(|key| Ok(ReadItem::Counter(switch.counter_record(key))))
                .collect(),
            ReadQuery::TableEntries { table: name }
            | ReadQuery::DirectCounters { counter: name } => {
                return Err(TransportError::status(
                    P4rtStatus::NotFound,
                    format!("unknown table or counter {}", name),
                ))
            }
        };

        Ok(Box::pin(tokio_stream::iter(items)))
    }

    async fn close(&mut self) -> TransportResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if let Some(switch) = self.fabric.lock().get_mut(&self.name) {
            if switch.generation == self.generation {
                switch.connected = false;
            }
        }
        info!("SimFabric: {} disconnected", self.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AppendTags;
    use pretty_assertions::assert_eq;
    use srcroute_types::Ipv4Prefix;
    use tokio_stream::StreamExt;

    const ADDR: &str = "127.0.0.1:50001";

    fn fabric() -> SimFabric {
        let fabric = SimFabric::new();
        fabric.add_switch("s1", ADDR);
        fabric
    }

    fn forward(last_octet: u8) -> TableEntry {
        TableEntry::forward(
            Ipv4Prefix::host(Ipv4Address::new(10, 0, 0, last_octet)),
            AppendTags::Append2,
            vec![0x80, 0x02, 0x00, 0x01],
        )
    }

    #[tokio::test]
    async fn test_connect_unknown_or_unreachable() {
        let fabric = fabric();
        let opts = PipelineOptions::default();

        assert!(matches!(
            fabric.connect("s9", ADDR, &opts).await,
            Err(TransportError::Connect { .. })
        ));

        fabric.set_reachable("s1", false);
        assert!(fabric.connect("s1", ADDR, &opts).await.is_err());

        fabric.set_reachable("s1", true);
        assert!(fabric.connect("s1", ADDR, &opts).await.is_ok());
        assert_eq!(fabric.snapshot("s1").unwrap().connects, 1);
    }

    #[tokio::test]
    async fn test_write_is_upsert() {
        let fabric = fabric();
        let mut conn = fabric
            .connect("s1", ADDR, &PipelineOptions::default())
            .await
            .unwrap();

        conn.write(&[TableEntry::default_drop()]).await.unwrap();
        conn.write(&[TableEntry::default_drop()]).await.unwrap();
        conn.write(&[forward(2)]).await.unwrap();
        conn.write(&[forward(2)]).await.unwrap();

        let snap = fabric.snapshot("s1").unwrap();
        assert_eq!(snap.entries.len(), 2);
        assert_eq!(snap.default_entries().count(), 1);
        assert_eq!(snap.write_calls, 4);
    }

    #[tokio::test]
    async fn test_write_failure_injection() {
        let fabric = fabric();
        let mut conn = fabric
            .connect("s1", ADDR, &PipelineOptions::default())
            .await
            .unwrap();

        fabric.fail_writes("s1", Some(P4rtStatus::Unavailable));
        let err = conn.write(&[forward(2)]).await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::Status {
                status: P4rtStatus::Unavailable,
                ..
            }
        ));
        assert!(fabric.snapshot("s1").unwrap().entries.is_empty());

        // An OK status is not a failure.
        fabric.fail_writes("s1", Some(P4rtStatus::Ok));
        conn.write(&[forward(2)]).await.unwrap();
        assert_eq!(fabric.snapshot("s1").unwrap().entries.len(), 1);
    }

    #[tokio::test]
    async fn test_stale_connection_loses_mastership() {
        let fabric = fabric();
        let opts = PipelineOptions::default();
        let mut old = fabric.connect("s1", ADDR, &opts).await.unwrap();
        let mut new = fabric.connect("s1", ADDR, &opts).await.unwrap();

        let err = old.write(&[forward(2)]).await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::Status {
                status: P4rtStatus::PermissionDenied,
                ..
            }
        ));
        assert!(new.write(&[forward(2)]).await.is_ok());

        old.close().await.unwrap();
        assert!(fabric.snapshot("s1").unwrap().connected);
    }

    #[tokio::test]
    async fn test_read_entries_and_counters() {
        let fabric = fabric();
        let mut conn = fabric
            .connect("s1", ADDR, &PipelineOptions::default())
            .await
            .unwrap();
        conn.write(&[TableEntry::default_drop(), forward(2)])
            .await
            .unwrap();

        let action = fabric.inject_packet("s1", Ipv4Address::new(10, 0, 0, 2), 100);
        assert_eq!(action.map(|a| a.name()), Some("append_2_tags"));
        let action = fabric.inject_packet("s1", Ipv4Address::new(10, 0, 0, 7), 60);
        assert_eq!(action, Some(TableAction::Drop));

        let entries: Vec<_> = conn
            .read(&ReadQuery::ipv4_lpm_entries())
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(entries.len(), 2);

        let counters: Vec<CounterRecord> = conn
            .read(&ReadQuery::ipv4_lpm_counters())
            .await
            .unwrap()
            .filter_map(|item| match item {
                Ok(ReadItem::Counter(c)) => Some(c),
                _ => None,
            })
            .collect()
            .await;
        assert_eq!(counters.len(), 2);
        assert!(counters.iter().all(|c| c.packet_count == 1));
    }

    #[tokio::test]
    async fn test_closed_connection_rejects_requests() {
        let fabric = fabric();
        let mut conn = fabric
            .connect("s1", ADDR, &PipelineOptions::default())
            .await
            .unwrap();
        conn.close().await.unwrap();

        assert!(matches!(
            conn.write(&[forward(2)]).await,
            Err(TransportError::Closed { .. })
        ));
        assert!(conn.read(&ReadQuery::ipv4_lpm_entries()).await.is_err());
        assert!(!fabric.snapshot("s1").unwrap().connected);
    }
}
