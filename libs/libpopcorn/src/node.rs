//! Node identifiers and cluster snapshots
//!
//! A node is one machine participating in the migration domain. The facility
//! reports every node's status as seen from the calling node; snapshots are
//! taken fresh on each query.

use core::fmt;
use core::str::FromStr;

/// Maximum number of nodes in a Popcorn cluster
pub const MAX_NODES: usize = 32;

/// Node identifier in `[0, MAX_NODES)`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(i32);

/// Node id outside `[0, MAX_NODES)`
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("node id {0} is outside 0-{max}", max = MAX_NODES - 1)]
pub struct NodeRangeError(pub i64);

impl NodeId {
    /// Validate a raw node id
    pub fn new(raw: i64) -> Result<Self, NodeRangeError> {
        if raw < 0 || raw >= MAX_NODES as i64 {
            return Err(NodeRangeError(raw));
        }
        Ok(Self(raw as i32))
    }

    /// Node id for a slot of a per-node table
    pub(crate) const fn from_index(index: usize) -> Self {
        debug_assert!(index < MAX_NODES);
        Self(index as i32)
    }

    /// Get raw value
    pub const fn as_raw(&self) -> i32 {
        self.0
    }

    /// Index into per-node tables
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Instruction-set architecture of a node
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Arch {
    #[default]
    Unknown,
    Arm64,
    X86_64,
    Ppc64le,
}

impl Arch {
    /// Decode the kernel's architecture encoding
    pub const fn from_raw(raw: i32) -> Self {
        match raw {
            0 => Self::Arm64,
            1 => Self::X86_64,
            2 => Self::Ppc64le,
            _ => Self::Unknown,
        }
    }

    /// Kernel encoding (-1 for unknown)
    pub const fn as_raw(&self) -> i32 {
        match self {
            Self::Unknown => -1,
            Self::Arm64 => 0,
            Self::X86_64 => 1,
            Self::Ppc64le => 2,
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Arm64 => "arm64",
            Self::X86_64 => "x86-64",
            Self::Ppc64le => "ppc64le",
        }
    }

    /// Architecture this binary was compiled for
    pub const fn host() -> Self {
        if cfg!(target_arch = "x86_64") {
            Self::X86_64
        } else if cfg!(target_arch = "aarch64") {
            Self::Arm64
        } else if cfg!(all(target_arch = "powerpc64", target_endian = "little")) {
            Self::Ppc64le
        } else {
            Self::Unknown
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Arch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unknown" => Ok(Self::Unknown),
            "arm64" | "aarch64" => Ok(Self::Arm64),
            "x86-64" | "x86_64" => Ok(Self::X86_64),
            "ppc64le" => Ok(Self::Ppc64le),
            other => Err(format!("unknown architecture: {}", other)),
        }
    }
}

/// Status of a single node
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NodeInfo {
    pub online: bool,
    pub arch: Arch,
    /// Relative distance from the querying node (0 if unreported)
    pub distance: i32,
}

/// Cluster state as observed from the calling node
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterSnapshot {
    /// Node the calling thread is executing on
    pub current: NodeId,
    pub nodes: [NodeInfo; MAX_NODES],
}

impl ClusterSnapshot {
    pub fn node(&self, nid: NodeId) -> &NodeInfo {
        &self.nodes[nid.index()]
    }

    pub fn is_online(&self, nid: NodeId) -> bool {
        self.node(nid).online
    }

    /// Ids of every online node
    pub fn online_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.online)
            .map(|(i, _)| NodeId::from_index(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_range() {
        assert!(NodeId::new(0).is_ok());
        assert!(NodeId::new(31).is_ok());
        assert_eq!(NodeId::new(32), Err(NodeRangeError(32)));
        assert_eq!(NodeId::new(-1), Err(NodeRangeError(-1)));
    }

    #[test]
    fn test_arch_encoding() {
        for arch in [Arch::Unknown, Arch::Arm64, Arch::X86_64, Arch::Ppc64le] {
            assert_eq!(Arch::from_raw(arch.as_raw()), arch);
        }
        assert_eq!(Arch::from_raw(7), Arch::Unknown);
    }

    #[test]
    fn test_arch_labels() {
        assert_eq!(Arch::X86_64.to_string(), "x86-64");
        assert_eq!(Arch::Arm64.to_string(), "arm64");
        assert_eq!("aarch64".parse::<Arch>(), Ok(Arch::Arm64));
        assert!("sparc".parse::<Arch>().is_err());
    }

    #[test]
    fn test_snapshot_online_nodes() {
        let mut nodes = [NodeInfo::default(); MAX_NODES];
        nodes[0].online = true;
        nodes[3].online = true;
        let snapshot = ClusterSnapshot {
            current: NodeId::new(0).unwrap(),
            nodes,
        };

        let online: Vec<i32> = snapshot.online_nodes().map(|n| n.as_raw()).collect();
        assert_eq!(online, vec![0, 3]);
        assert!(!snapshot.is_online(NodeId::new(1).unwrap()));
    }
}
