//! Thread identity and placement
//!
//! A migrated thread must keep its identity on every node it visits; the
//! harness compares [`Tid`]s taken before and after each hop.

use core::fmt;

use crate::node::NodeId;
use crate::syscall::Error;

/// Kernel thread ID
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Tid(pub i32);

impl Tid {
    /// Create from raw value
    pub const fn from_raw(id: i32) -> Self {
        Self(id)
    }

    /// Get raw value
    pub const fn as_raw(&self) -> i32 {
        self.0
    }

    /// Thread ids are strictly positive
    pub const fn is_valid(&self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Placement of the calling thread
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThreadStatus {
    /// Node the thread is executing on
    pub current_nid: NodeId,
    /// Destination proposed for the thread, if any
    pub proposed_nid: Option<NodeId>,
    /// Node holding the thread's peer context, if any
    pub peer_nid: Option<NodeId>,
    /// Thread id of the peer context, if any
    pub peer_pid: Option<Tid>,
}

impl ThreadStatus {
    /// Status of a thread that has never left `nid`
    pub const fn resident(nid: NodeId) -> Self {
        Self {
            current_nid: nid,
            proposed_nid: None,
            peer_nid: None,
            peer_pid: None,
        }
    }
}

/// Get the calling thread's kernel thread id
///
/// Wraps `gettid(2)`; never fails on Linux, but a non-positive id is reported
/// as an error so callers can treat identity loss uniformly.
pub fn gettid() -> Result<Tid, Error> {
    // SAFETY: gettid takes no arguments and cannot fault
    let tid = unsafe { libc::syscall(libc::SYS_gettid) } as i64;
    if tid <= 0 {
        return Err(Error::NoSuchProcess);
    }
    Ok(Tid(tid as i32))
}
