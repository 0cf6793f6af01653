//! Table and counter reads.
//!
//! A read takes the switch's connection lock for as long as its stream is
//! alive, so a caller draining a stream never interleaves with a write to
//! the same switch. Drop the stream to release the switch.

use log::debug;
use srcroute_p4rt::{ReadItem, ReadQuery, ReadStream, TableEntry};
use srcroute_types::Ipv4Prefix;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tokio_stream::{Stream, StreamExt};

use super::orch::{Result, RouteError};
use crate::switch::SwitchRegistry;

/// Lazy sequence of table entries.
pub type EntryStream = Pin<Box<dyn Stream<Item = Result<TableEntry>> + Send>>;

/// Lazy sequence of counter readings.
pub type CounterStream = Pin<Box<dyn Stream<Item = Result<CounterReading>> + Send>>;

/// Hit count of one `ipv4_lpm` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CounterReading {
    /// `None` for the default entry.
    pub match_key: Option<Ipv4Prefix>,
    pub packet_count: u64,
    pub byte_count: u64,
}

/// Issues reads against bound switches.
#[derive(Debug, Clone)]
pub struct TableReader {
    registry: Arc<SwitchRegistry>,
}

impl TableReader {
    pub fn new(registry: Arc<SwitchRegistry>) -> Self {
        Self { registry }
    }

    /// Streams every `ipv4_lpm` entry on `name`, default entry included.
    ///
    /// # Errors
    ///
    /// Fails with [`RouteError::SwitchNotConnected`] before contacting
    /// anything if `name` has no live binding, or with
    /// [`RouteError::Transport`] if the switch rejects the read.
    pub async fn list_entries(&self, name: &str) -> Result<EntryStream> {
        let (guard, stream) = self.issue(name, ReadQuery::ipv4_lpm_entries()).await?;
        let switch = name.to_string();

        let entries = stream.filter_map(move |item| {
            let _held = &guard;
            match item {
                Ok(ReadItem::Entry(entry)) => Some(Ok(entry)),
                Ok(ReadItem::Counter(_)) => None,
                Err(e) => Some(Err(RouteError::Transport {
                    switch: switch.clone(),
                    message: e.to_string(),
                })),
            }
        });
        Ok(Box::pin(entries))
    }

    /// Streams the direct counter of every `ipv4_lpm` entry on `name`.
    ///
    /// # Errors
    ///
    /// Same as [`TableReader::list_entries`].
    pub async fn read_counters(&self, name: &str) -> Result<CounterStream> {
        let (guard, stream) = self
            .issue(name, ReadQuery::ipv4_lpm_counters())
            .await?;
        let switch = name.to_string();

        let counters = stream.filter_map(move |item| {
            let _held = &guard;
            match item {
                Ok(ReadItem::Counter(record)) => Some(Ok(CounterReading {
                    match_key: record.match_key,
                    packet_count: record.packet_count,
                    byte_count: record.byte_count,
                })),
                Ok(ReadItem::Entry(_)) => None,
                Err(e) => Some(Err(RouteError::Transport {
                    switch: switch.clone(),
                    message: e.to_string(),
                })),
            }
        });
        Ok(Box::pin(counters))
    }

    async fn issue(
        &self,
        name: &str,
        query: ReadQuery,
    ) -> Result<(OwnedMutexGuard<Box<dyn srcroute_p4rt::SwitchConnection>>, ReadStream)> {
        let connection = self
            .registry
            .connection(name)
            .ok_or_else(|| RouteError::SwitchNotConnected(name.to_string()))?;

        let mut guard = connection.lock_owned().await;
        debug!("Reading {:?} from {}", query, name);
        let stream = guard
            .read(&query)
            .await
            .map_err(|e| RouteError::Transport {
                switch: name.to_string(),
                message: e.to_string(),
            })?;
        Ok((guard, stream))
    }
}
