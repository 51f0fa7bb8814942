//! Nomad configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use libpopcorn::{Arch, NodeId, SimNode, SimulationFaults};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NomadConfig {
    /// Harness behaviour
    #[serde(default)]
    pub harness: HarnessConfig,

    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Simulated cluster (used by the `simulated` backend)
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Which migration facility to drive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// In-process cluster model
    #[default]
    Simulated,
    /// Running Popcorn kernel
    Kernel,
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simulated" => Ok(Self::Simulated),
            "kernel" => Ok(Self::Kernel),
            other => Err(format!("unknown backend: {}", other)),
        }
    }
}

/// How worker codes combine into the process exit code
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExitPolicy {
    /// Code of the last worker joined
    #[default]
    Last,
    /// Code of the first failing worker in spawn order
    FirstFailure,
}

/// Harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Facility backend
    #[serde(default)]
    pub backend: Backend,

    /// Rest between migration rounds in the stress test (milliseconds)
    #[serde(default = "default_rest_ms")]
    pub rest_ms: u64,

    /// Stop each stress worker after this many rounds (unset = until stopped)
    #[serde(default)]
    pub max_rounds: Option<u64>,

    /// Upper bound on the stress test's thread count
    #[serde(default = "default_max_threads")]
    pub max_threads: usize,

    /// Exit code policy
    #[serde(default)]
    pub exit_policy: ExitPolicy,

    /// Also run the node check on the sink side
    #[serde(default)]
    pub remote_checks: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            rest_ms: default_rest_ms(),
            max_rounds: None,
            max_threads: default_max_threads(),
            exit_policy: ExitPolicy::default(),
            remote_checks: false,
        }
    }
}

impl HarnessConfig {
    pub fn rest(&self) -> Duration {
        Duration::from_millis(self.rest_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (tracing env-filter syntax)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// One simulated node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimNodeConfig {
    pub nid: i64,

    /// Architecture label ("x86-64", "arm64", "ppc64le")
    #[serde(default = "default_arch")]
    pub arch: String,

    #[serde(default = "default_true")]
    pub online: bool,
}

/// Simulated cluster configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Node every thread starts on
    #[serde(default)]
    pub origin: i64,

    /// Time each migration takes (milliseconds)
    #[serde(default)]
    pub latency_ms: u64,

    /// Threads come back from migration with a new id
    #[serde(default)]
    pub identity_drift: bool,

    /// Force migrations to return this status
    #[serde(default)]
    pub migrate_status: Option<i32>,

    /// Fail thread id queries with this status
    #[serde(default)]
    pub gettid_status: Option<i32>,

    /// Let each thread migrate this many times before `migrate_status` and
    /// `gettid_status` apply (1 = fail on the way back)
    #[serde(default)]
    pub fail_after_migrations: Option<u64>,

    /// Fail node queries with this status
    #[serde(default)]
    pub node_info_status: Option<i32>,

    /// Fail thread status queries with this status
    #[serde(default)]
    pub thread_status_status: Option<i32>,

    /// Cluster members
    #[serde(default = "default_sim_nodes")]
    pub nodes: Vec<SimNodeConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            origin: 0,
            latency_ms: 0,
            identity_drift: false,
            migrate_status: None,
            gettid_status: None,
            fail_after_migrations: None,
            node_info_status: None,
            thread_status_status: None,
            nodes: default_sim_nodes(),
        }
    }
}

impl SimulationConfig {
    pub fn origin(&self) -> anyhow::Result<NodeId> {
        Ok(NodeId::new(self.origin)?)
    }

    /// Resolve node entries into cluster members
    pub fn sim_nodes(&self) -> anyhow::Result<Vec<SimNode>> {
        self.nodes
            .iter()
            .map(|node| {
                let arch: Arch = node.arch.parse().map_err(anyhow::Error::msg)?;
                Ok(SimNode {
                    nid: NodeId::new(node.nid)?,
                    arch,
                    online: node.online,
                })
            })
            .collect()
    }

    /// Resolve the fault settings; query statuses must be nonzero errnos
    pub fn faults(&self) -> anyhow::Result<SimulationFaults> {
        Ok(SimulationFaults {
            migrate_status: self.migrate_status,
            gettid_error: query_fault("gettid_status", self.gettid_status)?,
            fail_after_migrations: self.fail_after_migrations,
            identity_drift: self.identity_drift,
            latency: Duration::from_millis(self.latency_ms),
            node_info_error: query_fault("node_info_status", self.node_info_status)?,
            thread_status_error: query_fault("thread_status_status", self.thread_status_status)?,
        })
    }
}

/// Statuses may be written as errno or negated errno
fn query_fault(field: &str, status: Option<i32>) -> anyhow::Result<Option<libpopcorn::Error>> {
    let Some(status) = status else {
        return Ok(None);
    };

    match i32::try_from(status.unsigned_abs()) {
        Ok(errno) if errno != 0 => Ok(Some(libpopcorn::Error::from_errno(errno))),
        _ => anyhow::bail!("simulation.{} must be a nonzero errno, got {}", field, status),
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_rest_ms() -> u64 {
    1000
}

fn default_max_threads() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_arch() -> String {
    "unknown".to_string()
}

fn default_sim_nodes() -> Vec<SimNodeConfig> {
    vec![
        SimNodeConfig {
            nid: 0,
            arch: "x86-64".to_string(),
            online: true,
        },
        SimNodeConfig {
            nid: 1,
            arch: "arm64".to_string(),
            online: true,
        },
    ]
}

impl NomadConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = NomadConfig::load(Path::new("/nonexistent/nomad.toml")).unwrap();
        assert_eq!(config.harness.backend, Backend::Simulated);
        assert_eq!(config.harness.rest_ms, 1000);
        assert_eq!(config.harness.exit_policy, ExitPolicy::Last);
        assert_eq!(config.simulation.nodes.len(), 2);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[harness]
rest_ms = 10
max_rounds = 3
exit_policy = "first-failure"

[simulation]
identity_drift = true

[[simulation.nodes]]
nid = 0
arch = "x86-64"

[[simulation.nodes]]
nid = 5
arch = "arm64"
online = false
"#
        )
        .unwrap();

        let config = NomadConfig::load(file.path()).unwrap();
        assert_eq!(config.harness.max_rounds, Some(3));
        assert_eq!(config.harness.exit_policy, ExitPolicy::FirstFailure);
        assert!(config.simulation.faults().unwrap().identity_drift);

        let nodes = config.simulation.sim_nodes().unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].arch, Arch::Arm64);
        assert!(!nodes[1].online);
    }

    #[test]
    fn test_bad_node_entries_are_rejected() {
        let mut config = SimulationConfig::default();
        config.nodes[0].nid = 40;
        assert!(config.sim_nodes().is_err());

        let mut config = SimulationConfig::default();
        config.nodes[0].arch = "mips".to_string();
        assert!(config.sim_nodes().is_err());
    }

    #[test]
    fn test_query_faults_map_to_errors() {
        let config = SimulationConfig {
            node_info_status: Some(-14),
            ..Default::default()
        };
        assert_eq!(
            config.faults().unwrap().node_info_error,
            Some(libpopcorn::Error::BadAddress)
        );

        let config = SimulationConfig {
            gettid_status: Some(3),
            fail_after_migrations: Some(1),
            ..Default::default()
        };
        let faults = config.faults().unwrap();
        assert_eq!(faults.gettid_error, Some(libpopcorn::Error::NoSuchProcess));
        assert_eq!(faults.fail_after_migrations, Some(1));
    }

    #[test]
    fn test_out_of_range_query_status_is_rejected() {
        for status in [0, i32::MIN] {
            let config = SimulationConfig {
                node_info_status: Some(status),
                ..Default::default()
            };
            assert!(config.faults().is_err(), "status {} accepted", status);
        }

        let config = SimulationConfig {
            gettid_status: Some(i32::MIN),
            ..Default::default()
        };
        let err = config.faults().unwrap_err();
        assert!(err.to_string().contains("gettid_status"));
    }
}
