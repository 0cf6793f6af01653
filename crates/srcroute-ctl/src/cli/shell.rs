//! Command loop.
//!
//! Reads commands line by line, runs each one to completion, and writes a
//! short outcome. A failed command never ends the loop; `exit`, end of input
//! or the shutdown signal do, but only between commands.

use std::future::Future;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use super::command::{Command, HELP};
use crate::daemon::NetworkController;
use crate::route::codec;

const PROMPT: &str = "\nCommand (add/query/counter/connect/disconnect/switches/help/exit): ";

/// Result of running one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub lines: Vec<String>,
    pub exit: bool,
}

impl Outcome {
    fn lines(lines: Vec<String>) -> Self {
        Self { lines, exit: false }
    }

    fn line(line: impl Into<String>) -> Self {
        Self::lines(vec![line.into()])
    }
}

/// Runs `command` against `controller`.
pub async fn execute(controller: &NetworkController, command: Command) -> Outcome {
    match command {
        Command::Add { src, dst, ports } => {
            match controller.add_communication_path(src, dst, &ports).await {
                Ok(()) => {
                    Outcome::line(format!("Path added: {} -> {} via {:?}", src, dst, ports))
                }
                Err(e) => {
                    Outcome::line(format!("Failed to add path {} -> {}: {}", src, dst, e))
                }
            }
        }
        Command::Query(name) => match controller.query_table_entries(&name).await {
            Ok(entries) => {
                let mut lines = vec![format!("Table entries for {}:", name)];
                for entry in entries {
                    let line = match codec::decode_entry(&entry) {
                        Some(hops) => {
                            let ports: Vec<u16> = hops.iter().map(|h| h.port).collect();
                            format!("  {} ports={:?}", entry, ports)
                        }
                        None => format!("  {}", entry),
                    };
                    lines.push(line);
                }
                Outcome::lines(lines)
            }
            Err(e) => Outcome::line(format!("Query error: {}", e)),
        },
        Command::Counter(name) => match controller.check_table_matches(&name).await {
            Ok(readings) => {
                let mut lines = vec![format!("Counter values for {}:", name)];
                for reading in readings {
                    let key = reading
                        .match_key
                        .map_or_else(|| "<default>".to_string(), |k| k.to_string());
                    lines.push(format!(
                        "  {}: {} packets, {} bytes",
                        key, reading.packet_count, reading.byte_count
                    ));
                }
                Outcome::lines(lines)
            }
            Err(e) => Outcome::line(format!("Counter read error: {}", e)),
        },
        Command::Connect(name) => match controller.connect_switch(&name).await {
            Ok(()) => Outcome::line(format!("Connected {}", name)),
            Err(e) => Outcome::line(format!("Connect error: {}", e)),
        },
        Command::Disconnect(name) => match controller.disconnect_switch(&name).await {
            Ok(()) => Outcome::line(format!("Disconnected {}", name)),
            Err(e) => Outcome::line(format!("Disconnect error: {}", e)),
        },
        Command::Switches => Outcome::lines(
            controller
                .switches()
                .into_iter()
                .map(|s| {
                    let state = if s.connected { "connected" } else { "disconnected" };
                    format!("  {} {} {}", s.name, s.address, state)
                })
                .collect(),
        ),
        Command::Help => Outcome::line(HELP),
        Command::Exit => Outcome {
            lines: vec!["Exiting...".to_string()],
            exit: true,
        },
    }
}

/// Runs the command loop until `exit`, end of input, or `shutdown` fires.
///
/// With `prompt` set, a prompt is written before each command.
pub async fn run<R, W, F>(
    controller: &NetworkController,
    input: R,
    mut output: W,
    prompt: bool,
    shutdown: F,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    F: Future<Output = ()>,
{
    let mut lines = input.lines();
    tokio::pin!(shutdown);

    loop {
        if prompt {
            output.write_all(PROMPT.as_bytes()).await?;
            output.flush().await?;
        }

        let line = tokio::select! {
            _ = &mut shutdown => {
                output.write_all(b"\nInterrupted\n").await?;
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            break;
        };

        let outcome = match Command::parse_line(&line) {
            None => continue,
            Some(Ok(command)) => execute(controller, command).await,
            Some(Err(e)) => Outcome::line(e.to_string()),
        };

        for text in &outcome.lines {
            output.write_all(text.as_bytes()).await?;
            output.write_all(b"\n").await?;
        }
        output.flush().await?;

        if outcome.exit {
            break;
        }
    }

    Ok(())
}
