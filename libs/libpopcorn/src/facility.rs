//! The migration facility contract
//!
//! Every backend answers the same four calls. Migration is synchronous: when
//! [`Facility::migrate`] returns `Ok`, the calling thread is executing on the
//! target node.

use crate::node::{ClusterSnapshot, NodeId};
use crate::syscall::Error;
use crate::thread::{ThreadStatus, Tid};

/// Why a migration request was refused
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MigrateError {
    /// Destination is not a valid node (`-EINVAL`)
    #[error("invalid migration destination")]
    InvalidDestination,
    /// Thread is already running at the destination (`-EBUSY`)
    #[error("already running at destination")]
    AlreadyAtDestination,
    /// Destination is offline (`-EAGAIN`)
    #[error("destination node is offline")]
    DestinationOffline,
    /// Any other status from the facility
    #[error("migration failed with status {0}")]
    Unspecified(i32),
}

impl MigrateError {
    /// Classify a raw migration status. Zero is success.
    pub fn from_status(status: i32) -> Result<(), Self> {
        match status {
            0 => Ok(()),
            s if s == -libc::EINVAL => Err(Self::InvalidDestination),
            s if s == -libc::EBUSY => Err(Self::AlreadyAtDestination),
            s if s == -libc::EAGAIN => Err(Self::DestinationOffline),
            s => Err(Self::Unspecified(s)),
        }
    }

    /// Raw status as the facility reported it
    pub const fn code(&self) -> i32 {
        match self {
            Self::InvalidDestination => -libc::EINVAL,
            Self::AlreadyAtDestination => -libc::EBUSY,
            Self::DestinationOffline => -libc::EAGAIN,
            Self::Unspecified(code) => *code,
        }
    }
}

/// A heterogeneous-ISA migration facility
pub trait Facility: Send + Sync {
    /// Move the calling thread to `nid`. Blocks until the thread resumes there.
    fn migrate(&self, nid: NodeId) -> Result<(), MigrateError>;

    /// Snapshot of every node as seen from the calling thread's node
    fn node_info(&self) -> Result<ClusterSnapshot, Error>;

    /// Placement of the calling thread
    fn thread_status(&self) -> Result<ThreadStatus, Error>;

    /// Identity of the calling thread
    fn gettid(&self) -> Result<Tid, Error>;
}

impl<F: Facility + ?Sized> Facility for std::sync::Arc<F> {
    fn migrate(&self, nid: NodeId) -> Result<(), MigrateError> {
        (**self).migrate(nid)
    }

    fn node_info(&self) -> Result<ClusterSnapshot, Error> {
        (**self).node_info()
    }

    fn thread_status(&self) -> Result<ThreadStatus, Error> {
        (**self).thread_status()
    }

    fn gettid(&self) -> Result<Tid, Error> {
        (**self).gettid()
    }
}
