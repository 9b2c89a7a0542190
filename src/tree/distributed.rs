//! The leader-held distributed tree: one node per subproblem delegated to a
//! coordinator, linked by split edges.

use super::node::{NodeCore, NodeId, NodeReason, NodeStatus};
use super::TreeResult;

/// A node in the leader's tree. Unlike `ParallelNode`, a distributed node's own
/// verdict (`partial_status`, reported by the coordinator that owns it) is tracked
/// separately from the node's overall `status`, since a node can be proven unsat by
/// its children even while its own partial solve is still pending.
#[derive(Debug, Clone)]
pub struct DistributedNode {
    pub core: NodeCore,
    pub partial_status: NodeStatus,
    pub assign_to: Option<usize>,
}

impl DistributedNode {
    fn new_root(id: NodeId) -> Self {
        DistributedNode {
            core: NodeCore::new_root(id),
            partial_status: NodeStatus::Unsolved,
            assign_to: None,
        }
    }

    fn new_child(id: NodeId, parent_id: NodeId) -> Self {
        DistributedNode {
            core: NodeCore::new_child(id, parent_id),
            partial_status: NodeStatus::Unsolved,
            assign_to: None,
        }
    }

    /// A distributed node is reasoned unsat only once its own partial solve is unsat
    /// *and* every child (the pieces it delegated away) is also unsat.
    pub fn can_reason_unsat(&self, children: &[&DistributedNode]) -> bool {
        self.partial_status.is_unsat() && children.iter().all(|c| c.core.status.is_unsat())
    }
}

pub struct DistributedTree {
    pub nodes: Vec<DistributedNode>,
    pub root: NodeId,
    pub result: TreeResult,
}

impl DistributedTree {
    pub fn new() -> Self {
        DistributedTree {
            nodes: vec![DistributedNode::new_root(0)],
            root: 0,
            result: TreeResult::Unsolved,
        }
    }

    pub fn node(&self, id: NodeId) -> &DistributedNode {
        &self.nodes[id]
    }

    /// Assigns the root subproblem (the whole input) to `coord_rank`, typically the
    /// isolated coordinator at the start of a run.
    pub fn assign_root_node(&mut self, coord_rank: usize) {
        self.nodes[self.root].assign_to = Some(coord_rank);
        self.nodes[self.root]
            .core
            .set_status(NodeStatus::Solving, NodeReason::Itself);
    }

    /// Creates a new child of `parent_id` owned by `coord_rank`, the result of a
    /// split. Returns the new node's id.
    pub fn split_node(&mut self, parent_id: NodeId, coord_rank: usize) -> NodeId {
        let id = self.nodes.len();
        let mut node = DistributedNode::new_child(id, parent_id);
        node.assign_to = Some(coord_rank);
        node.core.set_status(NodeStatus::Solving, NodeReason::Itself);
        self.nodes.push(node);
        self.nodes[parent_id].core.children_ids.push(id);
        id
    }

    /// Records a coordinator's own verdict for the subproblem it owns, and attempts
    /// push-up toward the root.
    pub fn node_partial_solved(&mut self, id: NodeId, status: NodeStatus) {
        if self.nodes[id].core.status.is_ended() {
            return;
        }
        self.nodes[id].partial_status = status;
        match status {
            NodeStatus::Sat => {
                self.nodes[id].core.set_status(NodeStatus::Sat, NodeReason::Itself);
                self.result = TreeResult::Sat;
            }
            NodeStatus::Unsat => {
                self.try_reason_unsat(id);
            }
            _ => {}
        }
    }

    fn try_reason_unsat(&mut self, id: NodeId) {
        let children_ids = self.nodes[id].core.children_ids.clone();
        let children: Vec<&DistributedNode> = children_ids.iter().map(|&c| &self.nodes[c]).collect();
        if self.nodes[id].can_reason_unsat(&children) && !self.nodes[id].core.status.is_ended() {
            self.nodes[id]
                .core
                .set_status(NodeStatus::Unsat, NodeReason::Children);
            if id == self.root {
                self.result = TreeResult::Unsat;
            }
            if let Some(parent_id) = self.nodes[id].core.parent_id {
                self.try_reason_unsat(parent_id);
            }
        }
    }

    /// Sets the root's verdict directly, for when the monolithic "solve original"
    /// race wins before pre-partitioning completes. See the `solve-original-race`
    /// feature.
    pub fn original_solved(&mut self, status: NodeStatus) {
        if self.nodes[self.root].core.status.is_ended() {
            return;
        }
        self.nodes[self.root]
            .core
            .set_status(status, NodeReason::Original);
        self.result = match status {
            NodeStatus::Sat => TreeResult::Sat,
            NodeStatus::Unsat => TreeResult::Unsat,
            _ => TreeResult::Unsolved,
        };
    }
}

impl Default for DistributedTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_unsat_requires_own_partial_and_children() {
        let mut tree = DistributedTree::new();
        tree.assign_root_node(7);
        let child = tree.split_node(tree.root, 1);
        tree.node_partial_solved(child, NodeStatus::Unsat);
        assert_eq!(tree.result, TreeResult::Unsolved);
        tree.node_partial_solved(tree.root, NodeStatus::Unsat);
        assert_eq!(tree.node(tree.root).core.status, NodeStatus::Unsat);
        assert_eq!(tree.result, TreeResult::Unsat);
    }

    #[test]
    fn sat_short_circuits() {
        let mut tree = DistributedTree::new();
        tree.assign_root_node(0);
        let child = tree.split_node(tree.root, 1);
        tree.node_partial_solved(child, NodeStatus::Sat);
        assert_eq!(tree.result, TreeResult::Sat);
    }

    #[test]
    fn original_solved_sets_root_with_original_reason() {
        let mut tree = DistributedTree::new();
        tree.original_solved(NodeStatus::Unsat);
        assert_eq!(tree.node(tree.root).core.reason, NodeReason::Original);
        assert_eq!(tree.result, TreeResult::Unsat);
    }
}
