//! nomad-stress - multi thread migration test
//!
//! Spawns N workers that bounce between the source and sink nodes until
//! interrupted (Ctrl-C) or the configured number of rounds is done.

use std::process;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};

use nomad::cli::CommonArgs;
use nomad::{args, backend, logging, stop_pair, Harness};

const LABEL: &str = "Multi thread migration test";

/// Multi thread migration test
#[derive(Parser, Debug)]
#[command(name = "nomad-stress", version, about)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Stop each worker after this many rounds
    #[arg(short, long)]
    rounds: Option<u64>,

    /// Rest between rounds (milliseconds)
    #[arg(long)]
    rest_ms: Option<u64>,

    /// <source_nid> <sink_nid> <thread_count>
    #[arg(allow_negative_numbers = true)]
    nodes: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = cli.common.load_config()?;
    if cli.rounds.is_some() {
        config.harness.max_rounds = cli.rounds;
    }
    if let Some(rest_ms) = cli.rest_ms {
        config.harness.rest_ms = rest_ms;
    }
    logging::init(cli.common.debug, &config.logging);

    info!("Nomad v{} starting", env!("CARGO_PKG_VERSION"));

    let args = match args::parse_stress(&cli.nodes, config.harness.max_threads) {
        Ok(args) => args,
        Err(e) => {
            error!(check = "arguments", "{}", e);
            process::exit(nomad::error::FAILURE);
        }
    };

    let facility = backend::build_facility(&config)?;
    let harness = Harness::new(facility, config.harness.clone());
    let (stop, token) = stop_pair();

    // Workers block in the facility, so the run lives on the blocking pool
    let mut run = tokio::task::spawn_blocking(move || harness.run_stress(args, token));

    let result = tokio::select! {
        result = &mut run => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping workers");
            stop.stop();
            run.await
        }
    };

    let report = match result? {
        Ok(report) => report,
        Err(e) => {
            error!(check = e.check(), "{}", e);
            process::exit(e.code());
        }
    };

    info!(
        "{} workers completed {} rounds",
        report.outcomes.len(),
        report.total_rounds()
    );
    report.print(LABEL, config.harness.exit_policy);
    process::exit(report.exit_code(config.harness.exit_policy));
}
