//! nomad-roundtrip - single thread migration test
//!
//! Migrates one thread from the source node to the sink node and back,
//! checking node placement and thread identity at every stop.

use std::process;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use nomad::cli::CommonArgs;
use nomad::{args, backend, logging, Harness};

const LABEL: &str = "Single thread migration test";

/// Single thread migration test
#[derive(Parser, Debug)]
#[command(name = "nomad-roundtrip", version, about)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// <source_nid> <sink_nid>
    #[arg(allow_negative_numbers = true)]
    nodes: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.common.load_config()?;
    logging::init(cli.common.debug, &config.logging);

    info!("Nomad v{} starting", env!("CARGO_PKG_VERSION"));

    let args = match args::parse_roundtrip(&cli.nodes) {
        Ok(args) => args,
        Err(e) => {
            error!(check = "arguments", "{}", e);
            process::exit(nomad::error::FAILURE);
        }
    };

    let facility = backend::build_facility(&config)?;
    let harness = Harness::new(facility, config.harness.clone());

    let report = match harness.run_roundtrip(args) {
        Ok(report) => report,
        Err(e) => {
            error!(check = e.check(), "{}", e);
            process::exit(e.code());
        }
    };

    report.print(LABEL, config.harness.exit_policy);
    process::exit(report.exit_code(config.harness.exit_policy));
}
