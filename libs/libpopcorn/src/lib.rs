//! # libpopcorn - Popcorn Migration Facility Userspace Library
//!
//! This crate provides the userspace interface to the Popcorn
//! heterogeneous-ISA migration facility.
//!
//! ## Features
//!
//! - **Nodes** - Cluster membership, online status and architecture per node
//! - **Threads** - Thread identity and current placement
//! - **Migration** - Move the calling thread to another node
//! - **Memory** - Page-aligned allocation for state that travels with a thread
//!
//! ## Quick Start
//!
//! ```no_run
//! use libpopcorn::{Facility, NodeId, SimulatedFacility};
//!
//! let facility = SimulatedFacility::default();
//! let tid = facility.gettid()?;
//!
//! // Hop to node 1 and back
//! facility.migrate(NodeId::new(1)?)?;
//! facility.migrate(NodeId::new(0)?)?;
//!
//! assert_eq!(facility.gettid()?, tid);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Error Handling
//!
//! Queries return `Result<T, syscall::Error>`; migration returns
//! `Result<(), MigrateError>` so callers can tell the rejection reasons apart:
//!
//! ```no_run
//! use libpopcorn::{Facility, MigrateError, NodeId, SimulatedFacility};
//!
//! let facility = SimulatedFacility::default();
//! match facility.migrate(NodeId::new(5)?) {
//!     Ok(()) => println!("arrived"),
//!     Err(MigrateError::DestinationOffline) => println!("node 5 is offline"),
//!     Err(e) => println!("Error: {}", e),
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod facility;
#[cfg(all(
    feature = "popcorn",
    target_os = "linux",
    any(target_arch = "x86_64", target_arch = "aarch64")
))]
pub mod kernel;
pub mod memory;
pub mod node;
pub mod sim;
pub mod syscall;
pub mod thread;

// Re-export commonly used types at the crate root
pub use facility::{Facility, MigrateError};
#[cfg(all(
    feature = "popcorn",
    target_os = "linux",
    any(target_arch = "x86_64", target_arch = "aarch64")
))]
pub use kernel::KernelFacility;
pub use memory::{AllocError, PageBox, PAGE_SIZE};
pub use node::{Arch, ClusterSnapshot, NodeId, NodeInfo, NodeRangeError, MAX_NODES};
pub use sim::{SimNode, SimulatedFacility, SimulationFaults};
pub use syscall::Error;
pub use thread::{ThreadStatus, Tid};
