//! Error types for harness runs
//!
//! Every error is terminal to the worker (or run) that hits it. Each variant
//! maps to the raw integer code reported per worker and used as exit status.

use thiserror::Error;

use libpopcorn::{AllocError, MigrateError, NodeId, Tid};

/// Command-line validation failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgError {
    /// Too few positional values
    #[error("This test takes {expected} arguments ({usage}), got {got}")]
    InvalidArgCount {
        expected: usize,
        got: usize,
        usage: &'static str,
    },

    /// Token is not an integer
    #[error("Argument '{0}' is not an integer")]
    NotANumber(String),

    /// Source and sink are the same node
    #[error("Source Node ID must be different to Sink Node ID (both are {0})")]
    EqualNodes(i64),

    /// Node id outside [0, 32)
    #[error("Node ID's must be a positive integer 0-31, got {0}")]
    NodeRange(i64),

    /// Thread count outside [1, max]
    #[error("Thread count must be between 1 and {max}, got {got}")]
    ThreadCount { got: i64, max: usize },
}

/// Which end of a migration pair a node is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Local,
    Remote,
}

impl std::fmt::Display for NodeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "Local"),
            Self::Remote => write!(f, "Remote"),
        }
    }
}

/// Harness error taxonomy
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Arg(#[from] ArgError),

    /// Record or barrier allocation failed
    #[error("Failed to init thread records: {0}")]
    Allocation(#[from] AllocError),

    /// Worker thread could not be started
    #[error("Failed to spawn worker: {0}")]
    Spawn(#[source] std::io::Error),

    /// Backend unavailable in this build or on this host
    #[error("Backend unavailable: {0}")]
    Backend(String),

    /// Node information query failed
    #[error("popcorn_get_node_info, Cannot retrieve the nodes' information at node {nid}. ERROR CODE {}", .source.code())]
    NodeQuery {
        nid: NodeId,
        #[source]
        source: libpopcorn::Error,
    },

    /// Thread status query failed
    #[error("popcorn_get_status, Cannot retrieve the thread's information at node {nid}. ERROR CODE: {}", .source.code())]
    ThreadQuery {
        nid: NodeId,
        #[source]
        source: libpopcorn::Error,
    },

    /// Facility reports a different current node
    #[error("We should be at Node {expected}. Yet we are at node {actual}")]
    WrongLocalNode { expected: NodeId, actual: NodeId },

    /// Thread status reports a different current node
    #[error("popcorn_get_status, Thread {tid} should be at node {expected}. But instead it is at node {actual}")]
    WrongThreadNode {
        tid: Tid,
        expected: NodeId,
        actual: NodeId,
    },

    /// One end of the migration pair is offline
    #[error("{role} Node {nid} is offline.")]
    NodeOffline { nid: NodeId, role: NodeRole },

    /// Migration refused
    #[error("Thread {tid} could not migrate to node {target}: {reason}")]
    MigrationRejected {
        tid: Tid,
        target: NodeId,
        reason: MigrateError,
    },

    /// Thread identity could not be read
    #[error("Thread ID is not a positive integer at node {nid}")]
    IdentityLost { nid: NodeId },

    /// Thread identity changed across a migration
    #[error("Thread ID {actual} does not match original TID {expected}")]
    IdentityMismatch { expected: Tid, actual: Tid },
}

/// Result type for harness operations
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Generic failure code
pub const FAILURE: i32 = -1;

impl HarnessError {
    /// Raw code reported for this failure
    pub fn code(&self) -> i32 {
        match self {
            Self::Allocation(e) => e.code(),
            Self::NodeQuery { source, .. } | Self::ThreadQuery { source, .. } => source.code(),
            Self::MigrationRejected { reason, .. } => reason.code(),
            Self::Arg(_)
            | Self::Spawn(_)
            | Self::Backend(_)
            | Self::WrongLocalNode { .. }
            | Self::WrongThreadNode { .. }
            | Self::NodeOffline { .. }
            | Self::IdentityLost { .. }
            | Self::IdentityMismatch { .. } => FAILURE,
        }
    }

    /// Short name of the check that failed, for log fields
    pub fn check(&self) -> &'static str {
        match self {
            Self::Arg(_) => "arguments",
            Self::Allocation(_) => "allocation",
            Self::Spawn(_) => "spawn",
            Self::Backend(_) => "backend",
            Self::NodeQuery { .. } | Self::WrongLocalNode { .. } | Self::NodeOffline { .. } => {
                "node_sanity"
            }
            Self::ThreadQuery { .. } | Self::WrongThreadNode { .. } => "thread_sanity",
            Self::MigrationRejected { .. } => "migrate",
            Self::IdentityLost { .. } | Self::IdentityMismatch { .. } => "identity",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nid(raw: i64) -> NodeId {
        NodeId::new(raw).unwrap()
    }

    #[test]
    fn test_codes_follow_the_facility() {
        let rejected = HarnessError::MigrationRejected {
            tid: Tid(10),
            target: nid(5),
            reason: MigrateError::DestinationOffline,
        };
        assert_eq!(rejected.code(), -11);

        let query = HarnessError::NodeQuery {
            nid: nid(0),
            source: libpopcorn::Error::BadAddress,
        };
        assert_eq!(query.code(), -14);

        assert_eq!(HarnessError::Allocation(AllocError { size: 4096 }).code(), -12);
        assert_eq!(
            HarnessError::IdentityLost { nid: nid(1) }.code(),
            FAILURE
        );
    }

    #[test]
    fn test_messages_name_offending_values() {
        let err = HarnessError::IdentityMismatch {
            expected: Tid(100),
            actual: Tid(200),
        };
        assert_eq!(err.to_string(), "Thread ID 200 does not match original TID 100");
        assert_eq!(err.check(), "identity");

        let err = HarnessError::NodeOffline {
            nid: nid(5),
            role: NodeRole::Remote,
        };
        assert_eq!(err.to_string(), "Remote Node 5 is offline.");
    }
}
