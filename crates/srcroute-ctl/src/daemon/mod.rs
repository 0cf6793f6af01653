//! The control session.

mod config;
mod controller;

pub use config::ControllerConfig;
pub use controller::{ControllerError, NetworkController};
