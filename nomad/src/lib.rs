//! Nomad - cross-architecture thread migration test harness
//!
//! Drives a migration facility through two tests:
//! - a single worker migrating source -> sink -> source once
//!   (`nomad-roundtrip <source_nid> <sink_nid>`)
//! - N workers looping between the two nodes until stopped
//!   (`nomad-stress <source_nid> <sink_nid> <thread_count>`)
//!
//! Every worker checks where it runs before and after each hop and that its
//! thread id survives the trip. Results come back as one line per worker and
//! an exit code.
//!
//! ```no_run
//! use std::sync::Arc;
//! use nomad::{args, Harness, HarnessConfig};
//! use libpopcorn::SimulatedFacility;
//!
//! let args = args::parse_roundtrip(&["0".to_string(), "1".to_string()])?;
//! let harness = Harness::new(Arc::new(SimulatedFacility::default()), HarnessConfig::default());
//! let report = harness.run_roundtrip(args)?;
//! assert!(report.passed());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod args;
pub mod backend;
pub mod check;
pub mod cli;
pub mod collector;
pub mod config;
pub mod error;
pub mod harness;
pub mod logging;
pub mod pool;
pub mod record;
pub mod shutdown;
pub mod worker;

pub use args::{RoundTripArgs, StressArgs};
pub use collector::{RunReport, WorkerOutcome};
pub use config::{Backend, ExitPolicy, HarnessConfig, NomadConfig};
pub use error::{ArgError, HarnessError, Result};
pub use harness::Harness;
pub use record::{Phase, ThreadRecord};
pub use shutdown::{stop_pair, StopHandle, StopToken};
