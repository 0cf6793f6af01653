//! Switch name to connection bindings.

mod registry;

pub use registry::{SharedConnection, SwitchRegistry, SwitchStatus};
