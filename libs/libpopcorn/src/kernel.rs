//! Popcorn kernel backend
//!
//! Node and thread queries go straight to the Popcorn syscalls. Migration
//! goes through the Popcorn runtime's `migrate()`, which captures the
//! register state the kernel needs to resume the thread on another ISA.

use core::ffi::{c_int, c_void};

use tracing::trace;

use crate::facility::{Facility, MigrateError};
use crate::node::{Arch, ClusterSnapshot, NodeId, NodeInfo, MAX_NODES};
use crate::syscall::{self, nr, Error};
use crate::thread::{self, ThreadStatus, Tid};

/// Node status as the kernel lays it out
#[repr(C)]
#[derive(Clone, Copy, Default)]
struct RawNodeInfo {
    status: u32,
    arch: c_int,
    distance: c_int,
}

/// Thread status as the kernel lays it out
#[repr(C)]
#[derive(Clone, Copy, Default)]
struct RawThreadStatus {
    current_nid: c_int,
    proposed_nid: c_int,
    peer_nid: c_int,
    peer_pid: libc::pid_t,
}

const NODE_OFFLINE: u32 = 0;

extern "C" {
    /// Migrate the calling thread to `nid`; -1 picks the proposed destination
    fn migrate(
        nid: c_int,
        callback: Option<unsafe extern "C" fn(*mut c_void)>,
        callback_param: *mut c_void,
    ) -> c_int;
}

/// Kernel id to optional node (-1 means "none")
fn optional_node(raw: c_int) -> Option<NodeId> {
    NodeId::new(raw as i64).ok()
}

/// Facility backed by a running Popcorn kernel
#[derive(Clone, Copy, Debug, Default)]
pub struct KernelFacility;

impl KernelFacility {
    pub const fn new() -> Self {
        Self
    }
}

impl Facility for KernelFacility {
    fn migrate(&self, nid: NodeId) -> Result<(), MigrateError> {
        trace!("popcorn migrate -> {}", nid);
        // SAFETY: no callback is registered, so the parameter is never read
        let status = unsafe { migrate(nid.as_raw(), None, core::ptr::null_mut()) };
        MigrateError::from_status(status)
    }

    fn node_info(&self) -> Result<ClusterSnapshot, Error> {
        let mut current: c_int = -1;
        let mut raw = [RawNodeInfo::default(); MAX_NODES];

        // SAFETY: both pointers reference live buffers sized for the kernel's tables
        let result = unsafe {
            syscall::syscall2(
                nr::POPCORN_GET_NODE_INFO,
                &mut current as *mut c_int as u64,
                raw.as_mut_ptr() as u64,
            )
        };
        Error::from_raw(result)?;

        let current = NodeId::new(current as i64).map_err(|_| Error::InvalidArgument)?;
        let mut nodes = [NodeInfo::default(); MAX_NODES];
        for (node, raw) in nodes.iter_mut().zip(raw.iter()) {
            *node = NodeInfo {
                online: raw.status != NODE_OFFLINE,
                arch: Arch::from_raw(raw.arch),
                distance: raw.distance,
            };
        }

        Ok(ClusterSnapshot { current, nodes })
    }

    fn thread_status(&self) -> Result<ThreadStatus, Error> {
        let mut raw = RawThreadStatus::default();

        // SAFETY: raw is a live, correctly laid out status buffer
        let result = unsafe {
            syscall::syscall1(
                nr::POPCORN_GET_THREAD_STATUS,
                &mut raw as *mut RawThreadStatus as u64,
            )
        };
        Error::from_raw(result)?;

        Ok(ThreadStatus {
            current_nid: NodeId::new(raw.current_nid as i64)
                .map_err(|_| Error::InvalidArgument)?,
            proposed_nid: optional_node(raw.proposed_nid),
            peer_nid: optional_node(raw.peer_nid),
            peer_pid: (raw.peer_pid > 0).then_some(Tid(raw.peer_pid)),
        })
    }

    fn gettid(&self) -> Result<Tid, Error> {
        thread::gettid()
    }
}
