//! End-to-end scenarios S1-S6 exercised directly against the tree algebra
//! (`ParallelTree`/`DistributedTree`) rather than real partitioner/solver binaries,
//! which run as separate subprocesses outside this crate's scope.

use ariparti::tree::node::{NodeReason, NodeStatus};
use ariparti::tree::{DistributedTree, ParallelTree, TreeResult};

/// S1: partitioner reports the root itself unsat. No solver ever spawned.
#[test]
fn s1_trivially_unsat_from_partitioner() {
    let mut tree = ParallelTree::new();
    let root = tree.make_root(0);
    tree.node_solved(root, NodeStatus::Unsat, NodeReason::Partitioner);
    assert_eq!(tree.result, TreeResult::Unsat);
    assert_eq!(tree.node(root).core.reason, NodeReason::Partitioner);
}

/// S2: partitioner emits `sat` directly.
#[test]
fn s2_trivially_sat_from_partitioner() {
    let mut tree = ParallelTree::new();
    let root = tree.make_root(0);
    tree.node_solved(root, NodeStatus::Sat, NodeReason::Partitioner);
    assert_eq!(tree.result, TreeResult::Sat);
}

/// S3: two-leaf split, both leaves unsat -> root unsat by children.
#[test]
fn s3_two_leaf_split_both_unsat() {
    let mut tree = ParallelTree::new();
    let root = tree.make_root(0);
    let left = tree.make_node(1, root);
    let right = tree.make_node(2, root);
    tree.node_solved(left, NodeStatus::Unsat, NodeReason::Itself);
    assert_eq!(tree.result, TreeResult::Unsolved);
    tree.node_solved(right, NodeStatus::Unsat, NodeReason::Itself);
    assert_eq!(tree.result, TreeResult::Unsat);
    assert_eq!(tree.node(root).core.reason, NodeReason::Children);
}

/// S4: from S3's state, one leaf is sat instead -> whole tree short-circuits sat.
#[test]
fn s4_one_leaf_sat_short_circuits() {
    let mut tree = ParallelTree::new();
    let root = tree.make_root(0);
    let left = tree.make_node(1, root);
    let right = tree.make_node(2, root);
    tree.node_solved(left, NodeStatus::Unsat, NodeReason::Itself);
    tree.node_solved(right, NodeStatus::Sat, NodeReason::Itself);
    assert_eq!(tree.result, TreeResult::Sat);
}

/// S5: split across coordinators. The leader's DistributedTree gets a root handed to
/// the isolated coordinator, which splits two children off to two distributed
/// coordinators; both report unsat, so the root's own partial plus both children
/// unsat proves the root unsat.
#[test]
fn s5_split_across_coordinators_both_unsat() {
    let mut tree = DistributedTree::new();
    tree.assign_root_node(2); // isolated coordinator seeds the root
    let child_a = tree.split_node(tree.root, 0);
    let child_b = tree.split_node(tree.root, 1);

    tree.node_partial_solved(child_a, NodeStatus::Unsat);
    assert_eq!(tree.result, TreeResult::Unsolved);
    tree.node_partial_solved(child_b, NodeStatus::Unsat);
    // The root's own partial solve hasn't resolved yet (it delegated everything).
    assert_eq!(tree.result, TreeResult::Unsolved);

    tree.node_partial_solved(tree.root, NodeStatus::Unsat);
    assert_eq!(tree.result, TreeResult::Unsat);
    assert_eq!(tree.node(tree.root).core.status, NodeStatus::Unsat);
}

/// S6: a tree that never reaches a terminal result represents the shape a timeout
/// produces; the leader is responsible for converting this into `RunResult::Timeout`
/// once its deadline elapses (see `leader::Leader::run_until_done`), not the tree
/// itself.
#[test]
fn s6_unterminated_tree_stays_unsolved() {
    let mut tree = ParallelTree::new();
    let root = tree.make_root(0);
    let _left = tree.make_node(1, root);
    assert_eq!(tree.result, TreeResult::Unsolved);
}

/// Universal invariant 3: unsat_percent reaches 1 exactly when the tree result
/// becomes unsat.
#[test]
fn unsat_percent_reaches_one_when_tree_result_is_unsat() {
    let mut tree = ParallelTree::new();
    let root = tree.make_root(0);
    let left = tree.make_node(1, root);
    let right = tree.make_node(2, root);
    tree.node_solved(left, NodeStatus::Unsat, NodeReason::Itself);
    tree.node_solved(right, NodeStatus::Unsat, NodeReason::Itself);
    assert_eq!(tree.node(root).unsat_percent, 1.0);
}

/// Boundary: a single distributed coordinator (N=1) still produces a correct
/// verdict.
#[test]
fn single_coordinator_degenerate_case() {
    let mut tree = DistributedTree::new();
    tree.assign_root_node(1); // isolated hands everything straight to coordinator 0
    tree.node_partial_solved(tree.root, NodeStatus::Sat);
    assert_eq!(tree.result, TreeResult::Sat);
}
