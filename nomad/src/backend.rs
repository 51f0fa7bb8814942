//! Facility selection

use std::sync::Arc;

use tracing::info;

use libpopcorn::{Arch, Facility, SimulatedFacility};

use crate::config::{Backend, NomadConfig};
use crate::error::HarnessError;

/// Build the facility the configuration asks for
pub fn build_facility(config: &NomadConfig) -> anyhow::Result<Arc<dyn Facility>> {
    match config.harness.backend {
        Backend::Simulated => {
            let sim = &config.simulation;
            let facility =
                SimulatedFacility::new(sim.origin()?, sim.sim_nodes()?).with_faults(sim.faults()?);
            info!(
                "Using simulated cluster of {} nodes, origin {}",
                sim.nodes.len(),
                facility.origin()
            );
            Ok(Arc::new(facility))
        }
        Backend::Kernel => kernel_facility(),
    }
}

#[cfg(all(
    feature = "popcorn",
    target_os = "linux",
    any(target_arch = "x86_64", target_arch = "aarch64")
))]
fn kernel_facility() -> anyhow::Result<Arc<dyn Facility>> {
    // Tests are always launched from the x86-64 node
    if Arch::host() != Arch::X86_64 {
        return Err(HarnessError::Backend(format!(
            "tests must be launched from an x86-64 node, this host is {}",
            Arch::host()
        ))
        .into());
    }

    info!("Using Popcorn kernel facility");
    Ok(Arc::new(libpopcorn::KernelFacility::new()))
}

#[cfg(not(all(
    feature = "popcorn",
    target_os = "linux",
    any(target_arch = "x86_64", target_arch = "aarch64")
)))]
fn kernel_facility() -> anyhow::Result<Arc<dyn Facility>> {
    Err(HarnessError::Backend(format!(
        "kernel backend not built in (host {}, enable the `popcorn` feature)",
        Arch::host()
    ))
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimNodeConfig;

    #[test]
    fn test_simulated_backend_from_config() {
        let mut config = NomadConfig::default();
        config.simulation.nodes.push(SimNodeConfig {
            nid: 5,
            arch: "arm64".to_string(),
            online: false,
        });

        let facility = build_facility(&config).unwrap();
        let snapshot = facility.node_info().unwrap();
        assert!(snapshot.is_online(libpopcorn::NodeId::new(1).unwrap()));
        assert!(!snapshot.is_online(libpopcorn::NodeId::new(5).unwrap()));
    }

    #[test]
    fn test_bad_node_table_is_rejected() {
        let mut config = NomadConfig::default();
        config.simulation.nodes[0].arch = "sparc".to_string();
        assert!(build_facility(&config).is_err());

        let mut config = NomadConfig::default();
        config.simulation.nodes[0].nid = 40;
        assert!(build_facility(&config).is_err());
    }

    #[cfg(not(feature = "popcorn"))]
    #[test]
    fn test_kernel_backend_unavailable() {
        let mut config = NomadConfig::default();
        config.harness.backend = Backend::Kernel;
        let err = build_facility(&config).err().unwrap();
        assert!(err.to_string().starts_with("Backend unavailable"));
    }
}
