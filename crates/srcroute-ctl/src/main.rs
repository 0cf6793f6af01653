//! Source-routing controller entry point.
//!
//! Loads the topology, connects every switch, installs the drop defaults and
//! then reads operator commands from stdin (or a command file) until `exit`,
//! end of input, or Ctrl-C.

use clap::Parser;
use log::{error, info};
use srcroute_ctl::cli;
use srcroute_ctl::daemon::{ControllerConfig, NetworkController};
use srcroute_ctl::topology::Topology;
use srcroute_p4rt::{PipelineOptions, SimFabric};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::BufReader;

/// Source-routing P4 controller
#[derive(Parser, Debug)]
#[command(name = "srcroute-ctl")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Topology description (JSON)
    #[arg(short = 't', long, default_value = "topo.json")]
    topology: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,

    /// P4Info file describing the pipeline
    #[arg(long)]
    p4info: Option<PathBuf>,

    /// Compiled pipeline config pushed to each switch
    #[arg(long)]
    p4blob: Option<PathBuf>,

    /// Device id used on every switch
    #[arg(long, default_value = "1")]
    device_id: u64,

    /// Read commands from this file instead of stdin
    #[arg(short = 'c', long)]
    commands: Option<PathBuf>,
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .init();

    info!("Starting srcroute-ctl");
    info!("Topology: {}", args.topology.display());

    let topology = match Topology::load(&args.topology) {
        Ok(topology) => topology,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    // Simulation mode: one in-memory agent per topology switch.
    let fabric = SimFabric::new();
    for switch in &topology.switches {
        fabric.add_switch(&switch.name, switch.endpoint());
    }
    info!("Running against the simulated fabric");

    let config = ControllerConfig {
        topology_path: args.topology.clone(),
        ..ControllerConfig::default()
    }
    .with_pipeline(PipelineOptions {
        p4info: args.p4info.clone(),
        p4blob: args.p4blob.clone(),
        device_id: args.device_id,
    });

    let controller = NetworkController::new(topology, Arc::new(fabric), config);
    controller.start().await;

    let result = match &args.commands {
        Some(path) => match tokio::fs::File::open(path).await {
            Ok(file) => {
                cli::run(
                    &controller,
                    BufReader::new(file),
                    tokio::io::stdout(),
                    false,
                    ctrl_c(),
                )
                .await
            }
            Err(e) => {
                error!("Cannot open command file {}: {}", path.display(), e);
                controller.shutdown().await;
                return ExitCode::FAILURE;
            }
        },
        None => {
            cli::run(
                &controller,
                BufReader::new(tokio::io::stdin()),
                tokio::io::stdout(),
                true,
                ctrl_c(),
            )
            .await
        }
    };

    controller.shutdown().await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Command loop failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
