//! Connection traits implemented by switch transports.

use crate::error::TransportResult;
use crate::types::{PipelineOptions, ReadItem, ReadQuery, TableEntry};
use async_trait::async_trait;
use std::pin::Pin;
use tokio_stream::Stream;

/// Lazy, finite sequence of read results.
///
/// A stream is not restartable; issuing the query again yields a fresh one.
pub type ReadStream = Pin<Box<dyn Stream<Item = TransportResult<ReadItem>> + Send>>;

/// A live request/response channel to one switch.
#[async_trait]
pub trait SwitchConnection: Send + Sync {
    /// Name of the switch at the other end.
    fn name(&self) -> &str;

    /// Writes `entries` in order. An entry whose key already exists replaces it.
    async fn write(&mut self, entries: &[TableEntry]) -> TransportResult<()>;

    /// Issues `query` and returns the results as they arrive.
    async fn read(&mut self, query: &ReadQuery) -> TransportResult<ReadStream>;

    /// Closes the channel. Later requests fail with `TransportError::Closed`.
    async fn close(&mut self) -> TransportResult<()>;
}

/// Establishes connections to switches.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connects to the agent of switch `name` listening on `address`
    /// (`host:port`) and installs the pipeline described by `options`.
    async fn connect(
        &self,
        name: &str,
        address: &str,
        options: &PipelineOptions,
    ) -> TransportResult<Box<dyn SwitchConnection>>;
}
