//! Switch connection API.
//!
//! A [`Connector`] performs the handshake with a switch agent and hands back
//! a [`SwitchConnection`], the request/response channel used to write and
//! read table entries. Implementations must not assume callers interleave
//! requests on one connection; the controller serializes them per switch.

mod connection;

pub use connection::{Connector, ReadStream, SwitchConnection};
