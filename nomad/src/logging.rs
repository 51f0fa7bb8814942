//! Logging setup shared by the test binaries

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install the fmt subscriber. `--debug` wins over `RUST_LOG`, which wins
/// over the configured level.
pub fn init(debug: bool, config: &LoggingConfig) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .init();
}
