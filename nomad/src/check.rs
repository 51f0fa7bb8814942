//! Node and thread sanity checks
//!
//! Both checks query the facility fresh every time.

use tracing::info;

use libpopcorn::{Arch, Facility, NodeId, Tid};

use crate::error::{HarnessError, NodeRole, Result};

/// Architectures observed by a successful node check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeArchs {
    pub local: Arch,
    pub remote: Arch,
}

/// Confirm the caller runs on `local` and both ends of the pair are online
pub fn node_sanity_check(
    facility: &dyn Facility,
    local: NodeId,
    remote: NodeId,
) -> Result<NodeArchs> {
    let snapshot = facility
        .node_info()
        .map_err(|source| HarnessError::NodeQuery { nid: local, source })?;

    if snapshot.current != local {
        return Err(HarnessError::WrongLocalNode {
            expected: local,
            actual: snapshot.current,
        });
    }
    if !snapshot.is_online(local) {
        return Err(HarnessError::NodeOffline {
            nid: local,
            role: NodeRole::Local,
        });
    }
    if !snapshot.is_online(remote) {
        return Err(HarnessError::NodeOffline {
            nid: remote,
            role: NodeRole::Remote,
        });
    }

    let archs = NodeArchs {
        local: snapshot.node(local).arch,
        remote: snapshot.node(remote).arch,
    };
    info!("Local Node {} architecture is {}.", local, archs.local);
    info!("Remote Node {} architecture is {}.", remote, archs.remote);

    Ok(archs)
}

/// Confirm the facility places thread `tid` on `nid`
pub fn thread_sanity_check(facility: &dyn Facility, nid: NodeId, tid: Tid) -> Result<()> {
    let status = facility
        .thread_status()
        .map_err(|source| HarnessError::ThreadQuery { nid, source })?;

    if status.current_nid != nid {
        return Err(HarnessError::WrongThreadNode {
            tid,
            expected: nid,
            actual: status.current_nid,
        });
    }

    Ok(())
}
