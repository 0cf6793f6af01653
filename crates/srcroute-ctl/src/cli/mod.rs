//! Operator command surface.

mod command;
mod shell;

pub use command::{Command, CommandError, HELP};
pub use shell::{execute, run, Outcome};
