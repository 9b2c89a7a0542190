//! The leader: holds the distributed tree, the idle-coordinator queue, and runs the
//! round-robin-with-tabu split scheduler. Always sends `terminate_coordinator` to
//! every rank before exiting, win or lose.

use crate::messages::{C2L, L2C, ResultStatus, RunResult};
use crate::transport::LeaderLink;
use crate::tree::node::{NodeId, NodeStatus};
use crate::tree::{DistributedTree, TreeResult};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Minimum time a coordinator must have been solving since its last split before it
/// becomes eligible to be split again.
const SPLIT_TABU: Duration = Duration::from_secs_f64(3.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CoordStatus {
    Idle,
    Solving,
    Splitting,
}

struct CoordinatorInfo {
    status: CoordStatus,
    assigned_node: Option<NodeId>,
    last_split: Instant,
    split_count: u64,
}

impl CoordinatorInfo {
    fn new(now: Instant) -> Self {
        CoordinatorInfo {
            status: CoordStatus::Idle,
            assigned_node: None,
            last_split: now,
            split_count: 0,
        }
    }
}

/// FIFO of (coordinator rank, stamp-at-enqueue-time) pairs realizing the
/// round-robin-with-tabu fairness rule. A popped entry is only honored if its stamp
/// still matches the coordinator's current `last_split`, rejecting stale entries left
/// behind by a coordinator that has since been split again.
struct SplitCandidateQueue {
    entries: VecDeque<(usize, Instant)>,
}

impl SplitCandidateQueue {
    fn new() -> Self {
        SplitCandidateQueue {
            entries: VecDeque::new(),
        }
    }

    fn push(&mut self, rank: usize, stamp: Instant) {
        self.entries.push_back((rank, stamp));
    }

    /// Pops the first still-fresh entry that has cleared its tabu window. Entries
    /// whose stamp no longer matches the coordinator's current `last_split` are
    /// stale and discarded; entries that still match but haven't cleared `SPLIT_TABU`
    /// yet are rotated to the back for a later attempt. Bounded to one pass over the
    /// snapshot length taken at entry, so a queue of still-tabu'd candidates returns
    /// `None` rather than spinning.
    fn pop_eligible(&mut self, coords: &[CoordinatorInfo], now: Instant) -> Option<usize> {
        let mut remaining = self.entries.len();
        while remaining > 0 {
            remaining -= 1;
            let (rank, stamp) = self.entries.pop_front()?;
            let info = &coords[rank];
            if info.status != CoordStatus::Solving || info.last_split != stamp {
                // stale: coordinator moved on since this entry was queued.
                continue;
            }
            if now.duration_since(stamp) < SPLIT_TABU {
                self.entries.push_back((rank, stamp));
                continue;
            }
            return Some(rank);
        }
        None
    }
}

pub struct Leader {
    link: LeaderLink,
    num_coords: usize,
    isolated_rank: usize,
    time_limit: Option<Duration>,
    tree: DistributedTree,
    coords: Vec<CoordinatorInfo>,
    idle: VecDeque<usize>,
    split_candidates: SplitCandidateQueue,
    /// The model text from whichever coordinator's `sat` result carried one.
    sat_model: Option<String>,
}

impl Leader {
    pub fn new(link: LeaderLink, num_coords: usize, isolated_rank: usize, time_limit: Option<Duration>) -> Self {
        let now = Instant::now();
        Leader {
            link,
            num_coords,
            isolated_rank,
            time_limit,
            tree: DistributedTree::new(),
            coords: (0..=isolated_rank).map(|_| CoordinatorInfo::new(now)).collect(),
            idle: VecDeque::new(),
            split_candidates: SplitCandidateQueue::new(),
            sat_model: None,
        }
    }

    /// Runs the full leader protocol: seed the isolated coordinator, absorb
    /// `pre_partition_done`, then steady-state dispatch until a verdict or timeout.
    /// Always sends `terminate_coordinator` to every rank before returning, even on
    /// error.
    pub fn solve(&mut self) -> RunResult {
        let start = Instant::now();
        log::info!(
            "leader starting with {} distributed coordinator(s), isolated rank {}",
            self.num_coords,
            self.isolated_rank
        );
        self.tree.assign_root_node(self.isolated_rank);
        self.coords[self.isolated_rank].status = CoordStatus::Solving;

        let result = self.run_until_done(start);
        log::info!("leader done after {:.3}s: {}", start.elapsed().as_secs_f64(), result);
        self.terminate_all();
        result
    }

    fn run_until_done(&mut self, start: Instant) -> RunResult {
        loop {
            if let Some(limit) = self.time_limit {
                if start.elapsed() > limit {
                    log::warn!("global time limit of {limit:?} exceeded");
                    return RunResult::Timeout;
                }
            }

            match self.link.try_recv() {
                Some((src, C2L::PrePartitionDone { count })) => {
                    log::debug!("rank {src} pre_partition_done with {count} subnode(s)");
                    self.handle_pre_partition_done(count);
                }
                Some((src, C2L::SplitSucceed { target_rank })) => {
                    log::debug!("rank {src} split_succeed for target {target_rank}");
                    self.handle_split_succeed(src, target_rank);
                }
                Some((src, C2L::SplitFailed { target_rank })) => {
                    log::debug!("rank {src} split_failed for target {target_rank}");
                    self.handle_split_failed(src, target_rank);
                }
                Some((src, C2L::NotifyResult { status, model })) => {
                    log::debug!("rank {src} notify_result {status:?}");
                    if let Some(result) = self.handle_notify_result(src, status, model) {
                        return result;
                    }
                }
                Some((src, C2L::NotifyOriginalResult { status, model })) => {
                    log::debug!("rank {src} notify_original_result {status:?}");
                    if let Some(result) = self.handle_notify_original_result(status, model) {
                        return result;
                    }
                }
                Some((src, C2L::NotifyError)) => {
                    log::error!("rank {src} notify_error");
                    return RunResult::CoordinatorError;
                }
                None => {}
            }

            if self.tree.result.is_terminal() {
                return self.final_result();
            }

            self.try_dispatch_split();
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    fn final_result(&self) -> RunResult {
        match self.tree.result {
            TreeResult::Sat => RunResult::Sat {
                model: self.sat_model.clone(),
            },
            TreeResult::Unsat => RunResult::Unsat,
            TreeResult::Unsolved => RunResult::LeaderError,
        }
    }

    fn handle_pre_partition_done(&mut self, count: usize) {
        // Tell the isolated coordinator to proceed with transferring the subnodes
        // it staged during pre-partitioning.
        let _ = self.link.send_to(
            self.isolated_rank,
            L2C::AssignNode {
                source_rank: self.isolated_rank,
            },
        );

        if count == 0 {
            // No useful split happened; hand the whole root to coordinator 0.
            self.assign_distributed_child(0, self.tree.root);
            return;
        }

        // Subnode 0 occupies the root itself (no split needed); any further subnode
        // becomes a genuine child of the root, matching the isolated coordinator's
        // `0..count` transfer order.
        for target in 0..count.min(self.num_coords) {
            self.assign_distributed_child(target, self.tree.root);
        }
        for rank in count.min(self.num_coords)..self.num_coords {
            self.idle.push_back(rank);
        }
    }

    fn assign_distributed_child(&mut self, target: usize, parent: NodeId) {
        let child = if parent == self.tree.root && self.tree.node(parent).assign_to.is_none() {
            self.tree.assign_root_node(target);
            parent
        } else {
            self.tree.split_node(parent, target)
        };
        self.coords[target].assigned_node = Some(child);
        self.coords[target].status = CoordStatus::Solving;
        self.coords[target].last_split = Instant::now();
        self.enqueue_split_candidate(target);
        let _ = self.link.send_to(
            target,
            L2C::AssignNode {
                source_rank: self.isolated_rank,
            },
        );
    }

    /// Enqueues `rank` as a split candidate using its *current* `last_split` stamp,
    /// so `SplitCandidateQueue::pop_eligible`'s freshness check matches. The isolated
    /// coordinator never implements the split-serving side of the protocol
    /// (`Coordinator::run_isolated` only understands `AssignNode`/`TerminateCoordinator`),
    /// so it must never be enqueued.
    fn enqueue_split_candidate(&mut self, rank: usize) {
        if rank == self.isolated_rank {
            return;
        }
        let stamp = self.coords[rank].last_split;
        self.split_candidates.push(rank, stamp);
    }

    fn handle_notify_result(
        &mut self,
        rank: usize,
        status: ResultStatus,
        model: Option<String>,
    ) -> Option<RunResult> {
        let node_status = match status {
            ResultStatus::Sat => NodeStatus::Sat,
            ResultStatus::Unsat => NodeStatus::Unsat,
            ResultStatus::Unsolved => NodeStatus::Error,
        };
        if status == ResultStatus::Sat && model.is_some() {
            self.sat_model = model;
        }
        if let Some(node_id) = self.coords.get(rank).and_then(|c| c.assigned_node) {
            self.tree.node_partial_solved(node_id, node_status);
        }
        if self.tree.result.is_terminal() {
            return Some(self.final_result());
        }
        if let Some(info) = self.coords.get_mut(rank) {
            info.status = CoordStatus::Idle;
        }
        self.idle.push_back(rank);
        None
    }

    /// Handles the `solve-original-race` win: the isolated coordinator's monolithic
    /// solve finished before pre-partitioning did.
    fn handle_notify_original_result(
        &mut self,
        status: ResultStatus,
        model: Option<String>,
    ) -> Option<RunResult> {
        let node_status = match status {
            ResultStatus::Sat => NodeStatus::Sat,
            ResultStatus::Unsat => NodeStatus::Unsat,
            ResultStatus::Unsolved => NodeStatus::Error,
        };
        if status == ResultStatus::Sat && model.is_some() {
            self.sat_model = model;
        }
        self.tree.original_solved(node_status);
        if self.tree.result.is_terminal() {
            return Some(self.final_result());
        }
        None
    }

    fn handle_split_succeed(&mut self, src: usize, target_rank: usize) {
        let _ = self.link.send_to(
            target_rank,
            L2C::AssignNode { source_rank: src },
        );
        let _ = self.link.send_to(src, L2C::TransferNode { target_rank });

        let parent = self.coords[src].assigned_node.unwrap_or(self.tree.root);
        let child = self.tree.split_node(parent, target_rank);
        let now = Instant::now();
        self.coords[target_rank].assigned_node = Some(child);
        self.coords[target_rank].status = CoordStatus::Solving;
        self.coords[target_rank].last_split = now;

        self.coords[src].status = CoordStatus::Solving;
        self.coords[src].last_split = now;
        self.coords[src].split_count += 1;

        self.enqueue_split_candidate(target_rank);
        self.enqueue_split_candidate(src);
    }

    fn handle_split_failed(&mut self, src: usize, target_rank: usize) {
        self.idle.push_back(target_rank);
        self.coords[src].status = CoordStatus::Solving;
        self.coords[src].last_split = Instant::now();
        self.enqueue_split_candidate(src);
    }

    /// Tries to pair the head of the idle queue with an eligible split candidate.
    /// Candidates are enqueued exactly once, at the point a coordinator's state
    /// actually changes (`assign_distributed_child`, `handle_split_succeed`,
    /// `handle_split_failed`) — this only ever pops from that queue, it never
    /// re-scans or re-pushes on a bare tick.
    fn try_dispatch_split(&mut self) {
        let Some(idle_rank) = self.idle.pop_front() else {
            return;
        };
        match self.split_candidates.pop_eligible(&self.coords, Instant::now()) {
            Some(split_rank) => {
                self.coords[split_rank].status = CoordStatus::Splitting;
                let _ = self.link.send_to(
                    split_rank,
                    L2C::RequestSplit {
                        target_rank: idle_rank,
                    },
                );
            }
            None => {
                self.idle.push_back(idle_rank);
            }
        }
    }

    fn terminate_all(&mut self) {
        for rank in 0..=self.isolated_rank {
            let _ = self.link.send_to(rank, L2C::TerminateCoordinator);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::build_channel_transport;

    #[test]
    fn split_candidate_queue_rejects_stale_entries() {
        let now = Instant::now();
        let coords = vec![CoordinatorInfo::new(now), CoordinatorInfo::new(now)];
        let mut queue = SplitCandidateQueue::new();
        // stamp doesn't match coords[0].last_split (which was set to `now`, not this
        // older instant), so this entry must be rejected as stale.
        queue.push(0, now - Duration::from_secs(100));
        assert_eq!(queue.pop_eligible(&coords, now), None);
    }

    #[test]
    fn split_candidate_queue_accepts_fresh_matching_entry_once_tabu_clears() {
        let long_ago = Instant::now() - Duration::from_secs(10);
        let mut coords = vec![CoordinatorInfo::new(long_ago)];
        coords[0].status = CoordStatus::Solving;
        let mut queue = SplitCandidateQueue::new();
        queue.push(0, coords[0].last_split);
        assert_eq!(queue.pop_eligible(&coords, Instant::now()), Some(0));
    }

    #[test]
    fn split_candidate_queue_rotates_rather_than_returns_while_still_tabu() {
        let now = Instant::now();
        let mut coords = vec![CoordinatorInfo::new(now)];
        coords[0].status = CoordStatus::Solving;
        let mut queue = SplitCandidateQueue::new();
        queue.push(0, coords[0].last_split);
        // last_split is `now`, well inside the tabu window: not yet eligible, but the
        // entry must be rotated back rather than dropped, and the call must not spin.
        assert_eq!(queue.pop_eligible(&coords, now), None);
        assert_eq!(queue.entries.len(), 1);
    }

    #[test]
    fn split_candidate_queue_does_not_grow_across_repeated_empty_dispatch_ticks() {
        let now = Instant::now();
        let mut coords = vec![CoordinatorInfo::new(now)];
        coords[0].status = CoordStatus::Solving;
        let mut queue = SplitCandidateQueue::new();
        queue.push(0, coords[0].last_split);
        for _ in 0..50 {
            assert_eq!(queue.pop_eligible(&coords, now), None);
        }
        assert_eq!(queue.entries.len(), 1);
    }

    #[test]
    fn notify_original_result_sat_wins_and_carries_model() {
        let (_links, leader_link) = build_channel_transport(1);
        let mut leader = Leader::new(leader_link, 1, 1, None);
        leader.tree.assign_root_node(1);
        let result = leader.handle_notify_original_result(
            ResultStatus::Sat,
            Some("(model)".to_string()),
        );
        assert_eq!(result, Some(RunResult::Sat { model: Some("(model)".to_string()) }));
    }

    #[test]
    fn notify_original_result_unsat_is_terminal_with_no_model() {
        let (_links, leader_link) = build_channel_transport(1);
        let mut leader = Leader::new(leader_link, 1, 1, None);
        leader.tree.assign_root_node(1);
        let result = leader.handle_notify_original_result(ResultStatus::Unsat, None);
        assert_eq!(result, Some(RunResult::Unsat));
    }

    #[test]
    fn isolated_coordinator_is_never_enqueued_as_a_split_candidate() {
        let (_links, leader_link) = build_channel_transport(3);
        let mut leader = Leader::new(leader_link, 2, 2, None);
        leader.coords[2].status = CoordStatus::Solving;
        leader.coords[2].last_split = Instant::now() - Duration::from_secs(10);
        leader.enqueue_split_candidate(2);
        assert!(leader.split_candidates.entries.is_empty());
    }

    #[test]
    fn assign_distributed_child_refreshes_last_split_and_enqueues_once() {
        let (_links, leader_link) = build_channel_transport(2);
        let mut leader = Leader::new(leader_link, 1, 1, None);
        let old_stamp = leader.coords[0].last_split;
        let root = leader.tree.root;
        leader.assign_distributed_child(0, root);
        assert!(leader.coords[0].last_split >= old_stamp);
        assert_eq!(leader.split_candidates.entries.len(), 1);
    }

    #[test]
    fn terminate_all_sends_to_every_rank_including_isolated() {
        let (links, leader_link) = build_channel_transport(3);
        let mut leader = Leader::new(leader_link, 2, 2, None);
        leader.terminate_all();
        for link in &links {
            assert!(matches!(
                link.try_recv_from_leader(),
                Some(L2C::TerminateCoordinator)
            ));
        }
    }
}
