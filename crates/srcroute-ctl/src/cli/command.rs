//! Operator command parsing.
//!
//! One command per line:
//!
//! ```text
//! add <src_ip> <dst_ip> <port1,port2,...>
//! query <switch>
//! counter <switch>
//! connect <switch>
//! disconnect <switch>
//! switches
//! help
//! exit
//! ```

use srcroute_types::Ipv4Address;
use std::str::FromStr;
use thiserror::Error;

pub const HELP: &str = "\
Commands:
  add <src_ip> <dst_ip> <p1,p2,...>  install a source route (2 to 9 ports)
  query <switch>                     list the ipv4_lpm entries of a switch
  counter <switch>                   show per-entry hit counters of a switch
  connect <switch>                   (re)connect a switch and install its defaults
  disconnect <switch>                close the connection to a switch
  switches                           list switches and their connection state
  help                               show this text
  exit                               end the session";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add {
        src: Ipv4Address,
        dst: Ipv4Address,
        ports: Vec<u32>,
    },
    Query(String),
    Counter(String),
    Connect(String),
    Disconnect(String),
    Switches,
    Help,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Unknown command: {0} (add/query/counter/connect/disconnect/switches/help/exit)")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Invalid IP address: {0}")]
    InvalidAddress(String),

    #[error("Invalid port numbers - must be integers")]
    InvalidPorts,
}

impl Command {
    /// Parses one input line. Blank lines yield `None`.
    pub fn parse_line(line: &str) -> Option<Result<Self, CommandError>> {
        if line.trim().is_empty() {
            None
        } else {
            Some(line.parse())
        }
    }
}

fn parse_ip(s: &str) -> Result<Ipv4Address, CommandError> {
    s.parse()
        .map_err(|_| CommandError::InvalidAddress(s.to_string()))
}

/// Parses a comma separated port list. Whitespace is allowed around commas
/// but not inside a port, so `1,2 3` is rejected rather than read as `1,23`.
fn parse_ports(s: &str) -> Result<Vec<u32>, CommandError> {
    s.split(',')
        .map(|p| p.trim().parse::<u32>().map_err(|_| CommandError::InvalidPorts))
        .collect()
}

fn single_switch(
    args: &[&str],
    usage: &'static str,
    build: fn(String) -> Command,
) -> Result<Command, CommandError> {
    match args {
        [name] => Ok(build((*name).to_string())),
        _ => Err(CommandError::Usage(usage)),
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err(CommandError::Unknown(String::new()));
        };
        let args: Vec<&str> = words.collect();

        match verb.to_ascii_lowercase().as_str() {
            "add" => {
                const USAGE: &str = "add <src_ip> <dst_ip> <p1,p2,...>";
                if args.len() < 3 {
                    return Err(CommandError::Usage(USAGE));
                }
                let src = parse_ip(args[0])?;
                let dst = parse_ip(args[1])?;
                let ports = parse_ports(&args[2..].join(" "))?;
                Ok(Command::Add { src, dst, ports })
            }
            "query" => single_switch(&args, "query <switch>", Command::Query),
            "counter" => single_switch(&args, "counter <switch>", Command::Counter),
            "connect" => single_switch(&args, "connect <switch>", Command::Connect),
            "disconnect" => single_switch(&args, "disconnect <switch>", Command::Disconnect),
            "switches" => Ok(Command::Switches),
            "help" | "?" => Ok(Command::Help),
            "exit" | "quit" => Ok(Command::Exit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}
