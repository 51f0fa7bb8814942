//! Per-worker state
//!
//! One record per worker thread. Main fills in the node pair before the
//! worker starts; after that only the owning worker writes to it, and main
//! gets it back when the thread is joined.

use std::fmt;

use libpopcorn::{Arch, NodeId, Tid, MAX_NODES};

use crate::error::HarnessError;

/// Where a worker is in its migrate/verify cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    WaitAtBarrier,
    VerifyLocalNode,
    VerifyLocalThread,
    MigrateToSink,
    VerifyAtSink,
    MigrateToSource,
    VerifyBackAtSource,
    Rest,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::WaitAtBarrier => "wait_at_barrier",
            Self::VerifyLocalNode => "verify_local_node",
            Self::VerifyLocalThread => "verify_local_thread",
            Self::MigrateToSink => "migrate_to_sink",
            Self::VerifyAtSink => "verify_at_sink",
            Self::MigrateToSource => "migrate_to_source",
            Self::VerifyBackAtSource => "verify_back_at_source",
            Self::Rest => "rest",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// State of one worker thread
#[derive(Debug)]
pub struct ThreadRecord {
    /// Position in spawn order
    pub index: usize,
    /// Identity observed at the source node
    pub tid: Option<Tid>,
    pub source_nid: NodeId,
    pub sink_nid: NodeId,
    pub done: bool,
    /// Final status (0 = passed)
    pub err: i32,
    /// Phase the worker last entered
    pub phase: Phase,
    /// Architecture last observed per node
    pub arch: [Arch; MAX_NODES],
    /// Identity last observed on the sink side
    pub last_sink_tid: Option<Tid>,
    /// Completed source -> sink -> source rounds
    pub rounds: u64,
}

impl ThreadRecord {
    pub fn new(index: usize, source_nid: NodeId, sink_nid: NodeId) -> Self {
        debug_assert_ne!(source_nid, sink_nid);
        Self {
            index,
            tid: None,
            source_nid,
            sink_nid,
            done: false,
            err: 0,
            phase: Phase::Start,
            arch: [Arch::Unknown; MAX_NODES],
            last_sink_tid: None,
            rounds: 0,
        }
    }

    pub fn enter(&mut self, phase: Phase) {
        tracing::debug!(worker = self.index, from = %self.phase, to = %phase, "phase");
        self.phase = phase;
    }

    /// Mark the worker done with its final verdict. Happens exactly once.
    pub fn finish(&mut self, result: &Result<(), HarnessError>) {
        debug_assert!(!self.done, "worker {} finished twice", self.index);
        self.err = match result {
            Ok(()) => 0,
            Err(e) => e.code(),
        };
        self.done = true;
    }

    pub fn arch_of(&self, nid: NodeId) -> Arch {
        self.arch[nid.index()]
    }
}
