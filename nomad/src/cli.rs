//! Command-line options shared by the test binaries

use std::path::PathBuf;

use clap::Args;

use crate::config::{Backend, NomadConfig};

/// Options common to every test binary
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "/etc/nomad/nomad.toml", env = "NOMAD_CONFIG")]
    pub config: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// Facility backend (overrides the config file)
    #[arg(short, long)]
    pub backend: Option<Backend>,
}

impl CommonArgs {
    /// Load the config file and apply command-line overrides
    pub fn load_config(&self) -> anyhow::Result<NomadConfig> {
        let mut config = NomadConfig::load(&self.config)?;
        if let Some(backend) = self.backend {
            config.harness.backend = backend;
        }
        Ok(config)
    }
}
