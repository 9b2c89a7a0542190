//! The coordinator-local partition tree: split-requirement thresholds,
//! `select_split_node`'s right-child-if-both-satisfy rule, and push-up/push-down
//! unsat propagation between siblings and ancestors.

use super::node::{NodeCore, NodeId, NodeReason, NodeStatus};
use super::TreeResult;
use std::time::Duration;

/// A node in the coordinator-local tree: the unit the partitioner emits and the base
/// solver decides.
#[derive(Debug, Clone)]
pub struct ParallelNode {
    pub core: NodeCore,
    /// The partitioner's internal id for this node; used to address it on stdio.
    pub pid: i64,
    pub unsat_percent: f64,
    /// Set once this subtree has been split off to another coordinator.
    pub assigned_coord: Option<usize>,
}

impl ParallelNode {
    fn new_root(id: NodeId, pid: i64) -> Self {
        ParallelNode {
            core: NodeCore::new_root(id),
            pid,
            unsat_percent: 0.0,
            assigned_coord: None,
        }
    }

    fn new_child(id: NodeId, parent_id: NodeId, pid: i64) -> Self {
        ParallelNode {
            core: NodeCore::new_child(id, parent_id),
            pid,
            unsat_percent: 0.0,
            assigned_coord: None,
        }
    }

    /// A node can be reasoned unsat from its children only once it has both a left
    /// and a right child and both are themselves unsat.
    pub fn can_reason_unsat_from_children(&self, children: &[&ParallelNode]) -> bool {
        children.len() >= 2 && children.iter().all(|c| c.core.status.is_unsat())
    }
}

pub struct ParallelTree {
    pub nodes: Vec<ParallelNode>,
    pub root: NodeId,
    pub result: TreeResult,
    pub total_solve_time: Duration,
    pub solved_count: u64,
    split_thres_min: Duration,
    split_thres_max: Duration,
}

impl ParallelTree {
    pub const SPLIT_THRES_MIN_SECS: f64 = 5.0;
    pub const SPLIT_THRES_MAX_SECS: f64 = 25.0;

    pub fn new() -> Self {
        ParallelTree {
            nodes: Vec::new(),
            root: 0,
            result: TreeResult::Unsolved,
            total_solve_time: Duration::ZERO,
            solved_count: 0,
            split_thres_min: Duration::from_secs_f64(Self::SPLIT_THRES_MIN_SECS),
            split_thres_max: Duration::from_secs_f64(Self::SPLIT_THRES_MAX_SECS),
        }
    }

    pub fn average_solve_time(&self) -> Duration {
        if self.solved_count == 0 {
            Duration::ZERO
        } else {
            self.total_solve_time / self.solved_count as u32
        }
    }

    /// Creates the root node. `ppid == -1` in the source grammar signals a root; here
    /// callers simply call this once per round.
    pub fn make_root(&mut self, pid: i64) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(ParallelNode::new_root(id, pid));
        self.root = id;
        id
    }

    /// Creates a child of `parent_id` as reported by the partitioner.
    pub fn make_node(&mut self, pid: i64, parent_id: NodeId) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(ParallelNode::new_child(id, parent_id, pid));
        self.nodes[parent_id].core.children_ids.push(id);
        id
    }

    pub fn node(&self, id: NodeId) -> &ParallelNode {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut ParallelNode {
        &mut self.nodes[id]
    }

    pub fn find_by_pid(&self, pid: i64) -> Option<NodeId> {
        self.nodes.iter().find(|n| n.pid == pid).map(|n| n.core.id)
    }

    pub fn assign_node(&mut self, id: NodeId) {
        self.nodes[id].core.set_status(NodeStatus::Solving, NodeReason::Itself);
    }

    /// Marks `id` as solved with `status` (`Sat` or `Unsat`) for `reason`, then
    /// propagates per the tree's invariants. Idempotent: calling this again on an
    /// already-ended node is a no-op.
    pub fn node_solved(&mut self, id: NodeId, status: NodeStatus, reason: NodeReason) {
        if self.nodes[id].core.status.is_ended() {
            return;
        }
        self.nodes[id].core.set_status(status, reason);
        match status {
            NodeStatus::Sat => {
                self.result = TreeResult::Sat;
            }
            NodeStatus::Unsat => {
                if reason == NodeReason::Itself {
                    if let Some(d) = self.nodes[id].core.solving_time() {
                        self.total_solve_time += d;
                        self.solved_count += 1;
                    }
                }
                self.push_up(id);
                self.push_down(id);
                self.recompute_unsat_percent_to_root(id);
                if self.nodes[self.root].core.status.is_unsat() {
                    self.result = TreeResult::Unsat;
                }
            }
            _ => {}
        }
    }

    /// Marks `id` (and its subtree) resolved because it was split off to another
    /// coordinator: the local tree treats it as settled so this subtree no longer
    /// competes for cores.
    pub fn set_node_split(&mut self, id: NodeId, coord_rank: usize) {
        self.nodes[id].assigned_coord = Some(coord_rank);
        self.node_solved(id, NodeStatus::Unsat, NodeReason::Split);
    }

    pub fn terminate_node(&mut self, id: NodeId, reason: NodeReason) {
        if self.nodes[id].core.status.is_ended() {
            return;
        }
        self.nodes[id].core.set_status(NodeStatus::Terminated, reason);
    }

    fn push_up(&mut self, id: NodeId) {
        let Some(parent_id) = self.nodes[id].core.parent_id else {
            return;
        };
        let children_ids = self.nodes[parent_id].core.children_ids.clone();
        let children: Vec<&ParallelNode> = children_ids.iter().map(|&c| &self.nodes[c]).collect();
        if self.nodes[parent_id].can_reason_unsat_from_children(&children)
            && !self.nodes[parent_id].core.status.is_ended()
        {
            self.nodes[parent_id]
                .core
                .set_status(NodeStatus::Unsat, NodeReason::Children);
            self.push_up(parent_id);
        }
    }

    fn push_down(&mut self, id: NodeId) {
        let children_ids = self.nodes[id].core.children_ids.clone();
        for child_id in children_ids {
            if !self.nodes[child_id].core.status.is_ended() {
                self.nodes[child_id]
                    .core
                    .set_status(NodeStatus::Unsat, NodeReason::Ancestor);
                self.nodes[child_id].unsat_percent = 1.0;
            }
            self.push_down(child_id);
        }
    }

    fn compute_unsat_percent(&self, id: NodeId) -> f64 {
        if self.nodes[id].core.status.is_unsat() {
            return 1.0;
        }
        let children_ids = &self.nodes[id].core.children_ids;
        if children_ids.is_empty() {
            0.0
        } else {
            children_ids
                .iter()
                .map(|&c| self.compute_unsat_percent(c))
                .sum::<f64>()
                / children_ids.len() as f64
        }
    }

    fn recompute_unsat_percent_to_root(&mut self, from: NodeId) {
        let mut cur = Some(from);
        while let Some(id) = cur {
            let pct = self.compute_unsat_percent(id);
            self.nodes[id].unsat_percent = pct;
            cur = self.nodes[id].core.parent_id;
        }
    }

    /// Whether a node that has been solving for `solving_time` may be split off.
    pub fn satisfy_split_requirement(&self, solving_time: Duration) -> bool {
        if solving_time < self.split_thres_min {
            false
        } else if solving_time > self.split_thres_max {
            true
        } else {
            solving_time > self.average_solve_time()
        }
    }

    /// Descends from the root looking for a node to split off, following
    /// `ParallelTree.select_split_node` in the source: at a binary node with exactly
    /// one unsat child, descend into the other; with both children unsolved, return
    /// the right child only if both satisfy the split requirement.
    pub fn select_split_node(&self) -> Option<NodeId> {
        self.select_split_node_from(self.root)
    }

    fn select_split_node_from(&self, id: NodeId) -> Option<NodeId> {
        let children = &self.nodes[id].core.children_ids;
        if children.len() < 2 {
            return None;
        }
        let (lc, rc) = (children[0], children[1]);
        let left_unsat = self.nodes[lc].core.status.is_unsat();
        let right_unsat = self.nodes[rc].core.status.is_unsat();
        match (left_unsat, right_unsat) {
            (true, true) => None,
            (true, false) => self.select_split_node_from(rc),
            (false, true) => self.select_split_node_from(lc),
            (false, false) => {
                let lc_time = self.nodes[lc].core.solving_time().unwrap_or(Duration::ZERO);
                let rc_time = self.nodes[rc].core.solving_time().unwrap_or(Duration::ZERO);
                if self.satisfy_split_requirement(lc_time) && self.satisfy_split_requirement(rc_time) {
                    Some(rc)
                } else {
                    None
                }
            }
        }
    }
}

impl Default for ParallelTree {
    fn default() -> Self {
        Self::new()
    }
}
