//! Node status/reason enums and the arena index type shared by both tree kinds.

use std::time::Instant;

/// Index into a tree's node arena. Never reused within a tree's lifetime.
pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Unsolved,
    Solving,
    Simplifying,
    Simplified,
    Sat,
    Unsat,
    Terminated,
    Error,
}

impl NodeStatus {
    pub fn is_ended(self) -> bool {
        self.is_solved() || matches!(self, NodeStatus::Terminated | NodeStatus::Error)
    }

    pub fn is_solved(self) -> bool {
        matches!(self, NodeStatus::Sat | NodeStatus::Unsat)
    }

    pub fn is_unsat(self) -> bool {
        matches!(self, NodeStatus::Unsat)
    }

    pub fn is_sat(self) -> bool {
        matches!(self, NodeStatus::Sat)
    }

    pub fn is_running(self) -> bool {
        matches!(self, NodeStatus::Solving | NodeStatus::Simplifying)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeReason {
    Itself,
    Ancestor,
    Children,
    Partitioner,
    Split,
    Coordinator,
    Original,
}

/// Timestamped record of a status transition, kept for diagnostics and for the
/// terminate-on-demand solving-time computation.
#[derive(Debug, Clone)]
pub struct TimeInfo {
    pub status: NodeStatus,
    pub at: Instant,
}

/// Fields common to both `ParallelNode` and `DistributedNode`.
#[derive(Debug, Clone)]
pub struct NodeCore {
    pub id: NodeId,
    pub parent_id: Option<NodeId>,
    pub children_ids: Vec<NodeId>,
    pub status: NodeStatus,
    pub reason: NodeReason,
    pub time_infos: Vec<TimeInfo>,
}

impl NodeCore {
    pub fn new_root(id: NodeId) -> Self {
        NodeCore {
            id,
            parent_id: None,
            children_ids: Vec::new(),
            status: NodeStatus::Unsolved,
            reason: NodeReason::Itself,
            time_infos: vec![TimeInfo {
                status: NodeStatus::Unsolved,
                at: Instant::now(),
            }],
        }
    }

    pub fn new_child(id: NodeId, parent_id: NodeId) -> Self {
        NodeCore {
            id,
            parent_id: Some(parent_id),
            children_ids: Vec::new(),
            status: NodeStatus::Unsolved,
            reason: NodeReason::Itself,
            time_infos: vec![TimeInfo {
                status: NodeStatus::Unsolved,
                at: Instant::now(),
            }],
        }
    }

    pub fn set_status(&mut self, status: NodeStatus, reason: NodeReason) {
        self.status = status;
        self.reason = reason;
        self.time_infos.push(TimeInfo {
            status,
            at: Instant::now(),
        });
        log::debug!("node-{} is {:?} by {:?}", self.id, status, reason);
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Wall-clock time since this node's last entry into `Solving`, or `None` if it
    /// never started solving.
    pub fn solving_time(&self) -> Option<std::time::Duration> {
        self.time_infos
            .iter()
            .rev()
            .find(|t| t.status == NodeStatus::Solving)
            .map(|t| t.at.elapsed())
    }
}
