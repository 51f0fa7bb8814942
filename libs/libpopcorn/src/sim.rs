//! Simulated migration facility
//!
//! An in-process model of a Popcorn cluster. Each OS thread that touches the
//! facility is tracked with its current node and identity; migration moves
//! the bookkeeping, not the thread. Used when no Popcorn kernel is present
//! and by the test suites.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::thread::ThreadId;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::facility::{Facility, MigrateError};
use crate::node::{Arch, ClusterSnapshot, NodeId, NodeInfo, MAX_NODES};
use crate::syscall::Error;
use crate::thread::{self, ThreadStatus, Tid};

/// First id handed out when identity drift is injected (above the default pid_max)
const DRIFT_TID_BASE: i32 = 1 << 22;

/// A node taking part in the simulated cluster
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimNode {
    pub nid: NodeId,
    pub arch: Arch,
    pub online: bool,
}

/// Faults to inject into the simulation
///
/// `migrate_status` and `gettid_error` are armed per thread: they only fire
/// once the calling thread has completed `fail_after_migrations` migrations
/// (from the start when unset). Query faults always fire.
#[derive(Clone, Debug, Default)]
pub struct SimulationFaults {
    /// Status returned by migrations instead of the modelled result
    pub migrate_status: Option<i32>,
    /// Thread identity queries fail with this error
    pub gettid_error: Option<Error>,
    /// Successful migrations a thread makes before its faults are armed
    pub fail_after_migrations: Option<u64>,
    /// Threads come back from a migration with a different id
    pub identity_drift: bool,
    /// Time each migration takes
    pub latency: Duration,
    /// Node queries fail with this error
    pub node_info_error: Option<Error>,
    /// Thread status queries fail with this error
    pub thread_status_error: Option<Error>,
}

#[derive(Clone, Copy, Debug)]
struct SimThread {
    tid: Tid,
    node: NodeId,
    migrations: u64,
}

/// In-process cluster model
pub struct SimulatedFacility {
    origin: NodeId,
    nodes: [Option<NodeInfo>; MAX_NODES],
    faults: SimulationFaults,
    threads: Mutex<HashMap<ThreadId, SimThread>>,
    next_drift_tid: AtomicI32,
    migrations: AtomicU64,
}

impl SimulatedFacility {
    /// Cluster of `nodes`, with every new thread starting on `origin`
    pub fn new(origin: NodeId, nodes: impl IntoIterator<Item = SimNode>) -> Self {
        let mut table = [None; MAX_NODES];
        for node in nodes {
            table[node.nid.index()] = Some(NodeInfo {
                online: node.online,
                arch: node.arch,
                distance: 0,
            });
        }

        Self {
            origin,
            nodes: table,
            faults: SimulationFaults::default(),
            threads: Mutex::new(HashMap::new()),
            next_drift_tid: AtomicI32::new(DRIFT_TID_BASE),
            migrations: AtomicU64::new(0),
        }
    }

    /// Inject faults
    pub fn with_faults(mut self, faults: SimulationFaults) -> Self {
        self.faults = faults;
        self
    }

    pub fn origin(&self) -> NodeId {
        self.origin
    }

    /// Successful migrations so far, across all threads
    pub fn migrations(&self) -> u64 {
        self.migrations.load(Ordering::Relaxed)
    }

    /// Node the calling thread is on
    pub fn current_node(&self) -> NodeId {
        self.current().node
    }

    fn current(&self) -> SimThread {
        let mut threads = self.threads.lock();
        *threads
            .entry(std::thread::current().id())
            .or_insert_with(|| self.admit())
    }

    /// Start tracking the calling thread on the origin node
    fn admit(&self) -> SimThread {
        let tid = thread::gettid().unwrap_or_else(|_| self.drifted_tid());
        trace!("Admitting thread {} at node {}", tid, self.origin);
        SimThread {
            tid,
            node: self.origin,
            migrations: 0,
        }
    }

    /// Whether per-thread faults fire for `thread`
    fn armed(&self, thread: &SimThread) -> bool {
        self.faults
            .fail_after_migrations
            .map_or(true, |after| thread.migrations >= after)
    }

    fn drifted_tid(&self) -> Tid {
        Tid(self.next_drift_tid.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SimulatedFacility {
    /// Two-node cluster: x86-64 at node 0, arm64 at node 1
    fn default() -> Self {
        let nodes = [(0, Arch::X86_64), (1, Arch::Arm64)].map(|(nid, arch)| SimNode {
            nid: NodeId::from_index(nid),
            arch,
            online: true,
        });
        Self::new(NodeId::from_index(0), nodes)
    }
}

impl Facility for SimulatedFacility {
    fn migrate(&self, nid: NodeId) -> Result<(), MigrateError> {
        if !self.faults.latency.is_zero() {
            std::thread::sleep(self.faults.latency);
        }

        let key = std::thread::current().id();
        let mut threads = self.threads.lock();
        let mut entry = match threads.get(&key) {
            Some(entry) => *entry,
            None => self.admit(),
        };

        if let Some(status) = self.faults.migrate_status {
            if self.armed(&entry) {
                MigrateError::from_status(status)?;
            }
        }

        let Some(dest) = self.nodes[nid.index()] else {
            return Err(MigrateError::InvalidDestination);
        };

        if entry.node == nid {
            return Err(MigrateError::AlreadyAtDestination);
        }
        if !dest.online {
            return Err(MigrateError::DestinationOffline);
        }

        debug!("Thread {} migrating {} -> {}", entry.tid, entry.node, nid);
        entry.node = nid;
        entry.migrations += 1;
        if self.faults.identity_drift {
            entry.tid = self.drifted_tid();
        }
        threads.insert(key, entry);
        self.migrations.fetch_add(1, Ordering::Relaxed);

        Ok(())
    }

    fn node_info(&self) -> Result<ClusterSnapshot, Error> {
        if let Some(err) = self.faults.node_info_error {
            return Err(err);
        }

        let mut nodes = [NodeInfo::default(); MAX_NODES];
        for (slot, node) in nodes.iter_mut().zip(self.nodes.iter()) {
            if let Some(info) = node {
                *slot = *info;
            }
        }

        Ok(ClusterSnapshot {
            current: self.current().node,
            nodes,
        })
    }

    fn thread_status(&self) -> Result<ThreadStatus, Error> {
        if let Some(err) = self.faults.thread_status_error {
            return Err(err);
        }

        let current = self.current();
        let mut status = ThreadStatus::resident(current.node);
        if current.node != self.origin {
            status.peer_nid = Some(self.origin);
            status.peer_pid = Some(current.tid);
        }
        Ok(status)
    }

    fn gettid(&self) -> Result<Tid, Error> {
        let current = self.current();
        match self.faults.gettid_error {
            Some(err) if self.armed(&current) => Err(err),
            _ => Ok(current.tid),
        }
    }
}
