//! The per-rank coordinator: supervises one partitioner child and a pool of base
//! solver children for one local solving round, and serves the leader's split
//! protocol. Local base-solver failures are absorbed; partitioner crashes and
//! protocol errors are escalated to the leader via `notify_error`.

use crate::error::AriPartiError;
use crate::messages::{C2L, C2P, L2C, P2C, ResultStatus};
use crate::partitioner::{task_file_path, Partitioner, PartitionerLifecycle};
use crate::solver::{BaseSolver, SolverOutcome};
use crate::transport::RankLink;
use crate::tree::node::{NodeId, NodeReason, NodeStatus};
use crate::tree::{ParallelTree, TreeResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Pruning thresholds (seconds) indexed by `child_progress` (0..=3); the 5th table
/// entry is unreachable since `child_progress` never exceeds 3 for a binary tree.
const TERMINATE_THRESHOLD_SECS: [f64; 5] = [1200.0, 400.0, 300.0, 200.0, 0.0];

/// Partitioner stdout lines drained per main-loop iteration, bounding how much of one
/// round's cooperative loop a single partitioner burst can monopolize.
const PARTITIONER_DRAIN_LIMIT: usize = 16;

/// Wall-clock budget for the isolated coordinator's pre-partitioning BFS.
const PRE_PARTITION_BUDGET: Duration = Duration::from_secs(20);

pub struct CoordinatorParams {
    pub rank: usize,
    pub is_isolated: bool,
    pub num_dist_coords: usize,
    pub available_cores: usize,
    pub temp_dir: PathBuf,
    pub output_dir: PathBuf,
    pub partitioner_binary: PathBuf,
    pub solver_binary: PathBuf,
    pub get_model_flag: bool,
    /// The run's global deadline, mirrored here so the terminate-on-demand heuristic
    /// can compute `remaining_time_budget`; `None` means no limit (`time_limit=0` in
    /// the original launcher).
    pub time_limit: Option<Duration>,
}

pub struct Coordinator {
    params: CoordinatorParams,
    link: RankLink,
    round: u64,
    tree: ParallelTree,
    partitioner: Option<Partitioner>,
    solvers: HashMap<NodeId, BaseSolver>,
    /// The node currently offered to an in-flight split request, if any.
    pending_split: Option<(NodeId, usize)>,
    /// Wall-clock start of this coordinator's whole lifetime, used together with
    /// `params.time_limit` to compute the terminate-on-demand `remaining_time_budget`.
    coordinator_start: Instant,
    /// The model text captured from whichever base solver (or the partitioner itself)
    /// produced the `sat` verdict, when `get_model_flag` is set.
    sat_model: Option<String>,
    /// Set once the partitioner itself reports `sat` with `get_model_flag` on: every
    /// further partitioner stdout line is model text (no more protocol grammar) up to
    /// EOF, per the partitioner stdio grammar in §6.
    capturing_model: bool,
    /// The monolithic "solve the whole input" race, run by the isolated coordinator
    /// alongside pre-partitioning when the `solve-original-race` feature is on.
    #[cfg(feature = "solve-original-race")]
    original_solver: Option<BaseSolver>,
}

pub enum RoundOutcome {
    Result(ResultStatus, Option<String>),
    Terminated,
    Error(AriPartiError),
}

/// Outcome of the isolated coordinator's pre-partitioning pass.
pub enum PrePartitionOutcome {
    Subnodes(Vec<NodeId>),
    /// The `solve-original-race` monolithic solve finished first.
    OriginalRaceWon(ResultStatus),
}

impl Coordinator {
    pub fn new(params: CoordinatorParams, link: RankLink) -> Self {
        Coordinator {
            params,
            link,
            round: 0,
            tree: ParallelTree::new(),
            partitioner: None,
            solvers: HashMap::new(),
            pending_split: None,
            coordinator_start: Instant::now(),
            sat_model: None,
            capturing_model: false,
            #[cfg(feature = "solve-original-race")]
            original_solver: None,
        }
    }

    fn round_dir(&self) -> PathBuf {
        self.params
            .temp_dir
            .join(format!("round-{}", self.round))
    }

    fn parti_seed(&self) -> u32 {
        if self.params.is_isolated {
            1
        } else {
            0
        }
    }

    /// Begins a fresh solving round on the subproblem file at `task_path`.
    fn start_solving(&mut self, task_path: &Path) -> Result<(), AriPartiError> {
        self.round += 1;
        self.tree = ParallelTree::new();
        self.solvers.clear();
        self.pending_split = None;
        self.sat_model = None;
        self.capturing_model = false;
        let dir = self.round_dir();
        std::fs::create_dir_all(&dir).map_err(|source| AriPartiError::Io {
            path: dir.clone(),
            source,
        })?;
        let root = self.tree.make_root(0);
        self.tree.assign_node(root);

        let partitioner = Partitioner::spawn(
            &self.params.partitioner_binary,
            task_path,
            &dir,
            self.params.available_cores.max(self.params.num_dist_coords),
            self.parti_seed(),
            self.params.get_model_flag,
        )?;
        self.partitioner = Some(partitioner);
        Ok(())
    }

    /// Interactive coordinators (`rank < num_dist_coords`) park idle, waiting for
    /// the leader's `assign_node`, run a round to completion, report the result, and
    /// repeat until `terminate_coordinator`.
    pub fn run_interactive(&mut self) -> RoundOutcome {
        loop {
            match self.link.recv_from_leader() {
                Ok(L2C::AssignNode { source_rank }) => {
                    let task_path = match self.receive_task_body(source_rank) {
                        Ok(p) => p,
                        Err(e) => {
                            let _ = self.link.send_to_leader(C2L::NotifyError);
                            return self.wait_for_terminate(e);
                        }
                    };
                    if let Err(e) = self.start_solving(&task_path) {
                        let _ = self.link.send_to_leader(C2L::NotifyError);
                        return self.wait_for_terminate(e);
                    }
                    match self.run_round() {
                        Ok((status, model)) => {
                            let _ = self
                                .link
                                .send_to_leader(C2L::NotifyResult { status, model });
                            self.cleanup_round();
                        }
                        Err(e) => {
                            let _ = self.link.send_to_leader(C2L::NotifyError);
                            return self.wait_for_terminate(e);
                        }
                    }
                }
                Ok(L2C::TerminateCoordinator) => return RoundOutcome::Terminated,
                Ok(_) => continue,
                Err(_) => return RoundOutcome::Terminated,
            }
        }
    }

    /// Waits out the leader's `terminate_coordinator`, for rounds that already ended
    /// successfully and have nothing further to do.
    fn wait_for_terminate_signal(&mut self) -> RoundOutcome {
        loop {
            match self.link.recv_from_leader() {
                Ok(L2C::TerminateCoordinator) | Err(_) => return RoundOutcome::Terminated,
                Ok(_) => continue,
            }
        }
    }

    fn wait_for_terminate(&mut self, err: AriPartiError) -> RoundOutcome {
        self.cleanup_round();
        loop {
            match self.link.recv_from_leader() {
                Ok(L2C::TerminateCoordinator) | Err(_) => return RoundOutcome::Error(err),
                Ok(_) => continue,
            }
        }
    }

    fn receive_task_body(&mut self, _source_rank: usize) -> Result<PathBuf, AriPartiError> {
        let (_from, bytes) = self.link.recv_body().map_err(|_| AriPartiError::Coordinator {
            rank: self.params.rank,
            message: "expected subproblem body after assign_node".to_string(),
        })?;
        let dir = self.params.temp_dir.join(format!("round-{}", self.round + 1));
        std::fs::create_dir_all(&dir).map_err(|source| AriPartiError::Io {
            path: dir.clone(),
            source,
        })?;
        let path = dir.join("task-root.smt2");
        std::fs::write(&path, &bytes).map_err(|source| AriPartiError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Runs the main cooperative loop for the current round until the tree reaches a
    /// terminal result. Returns the final status and optional model text.
    fn run_round(&mut self) -> Result<(ResultStatus, Option<String>), AriPartiError> {
        loop {
            self.process_leader_messages_nonblocking()?;
            self.drain_partitioner()?;
            self.poll_solvers();
            self.apply_terminate_on_demand();
            self.dispatch_waiting_nodes()?;

            if self.tree.result.is_terminal() {
                let status = match self.tree.result {
                    TreeResult::Sat => ResultStatus::Sat,
                    TreeResult::Unsat => ResultStatus::Unsat,
                    TreeResult::Unsolved => unreachable!(),
                };
                // If the partitioner itself declared sat and we're still draining its
                // model-body lines, hold off on returning until it reaches EOF so the
                // model isn't truncated.
                if !(status == ResultStatus::Sat && self.capturing_model && !self.partitioner_is_done()) {
                    let model = if status == ResultStatus::Sat {
                        self.sat_model.take()
                    } else {
                        None
                    };
                    return Ok((status, model));
                }
            }
            if self.solvers.is_empty() && self.partitioner_is_done() && !self.has_waiting_nodes() {
                // Partitioner finished and nothing left running or queued but the
                // tree never reached a terminal status: treat as unknown/error.
                return Ok((ResultStatus::Unsolved, None));
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    fn partitioner_is_done(&self) -> bool {
        matches!(
            self.partitioner.as_ref().map(|p| p.lifecycle()),
            Some(PartitionerLifecycle::ReceiveDone) | Some(PartitionerLifecycle::ProcessDone)
        )
    }

    fn has_waiting_nodes(&self) -> bool {
        self.tree
            .nodes
            .iter()
            .any(|n| n.core.status == NodeStatus::Unsolved && !self.solvers.contains_key(&n.core.id))
    }

    fn process_leader_messages_nonblocking(&mut self) -> Result<(), AriPartiError> {
        while let Some(msg) = self.link.try_recv_from_leader() {
            match msg {
                L2C::RequestSplit { target_rank } => self.handle_request_split(target_rank)?,
                L2C::TransferNode { target_rank } => self.handle_transfer_node(target_rank)?,
                L2C::TerminateCoordinator => {
                    self.cleanup_round();
                    return Err(AriPartiError::Coordinator {
                        rank: self.params.rank,
                        message: "terminated mid-round".to_string(),
                    });
                }
                L2C::AssignNode { .. } => {
                    // Only meaningful while idle; ignore if a round is already
                    // in progress (shouldn't happen given the protocol).
                }
            }
        }
        Ok(())
    }

    fn handle_request_split(&mut self, target_rank: usize) -> Result<(), AriPartiError> {
        match self.tree.select_split_node() {
            Some(node_id) => {
                self.tree.set_node_split(node_id, target_rank);
                self.pending_split = Some((node_id, target_rank));
                self.link
                    .send_to_leader(C2L::SplitSucceed { target_rank })
                    .map_err(|_| AriPartiError::Coordinator {
                        rank: self.params.rank,
                        message: "send split_succeed failed".to_string(),
                    })
            }
            None => self
                .link
                .send_to_leader(C2L::SplitFailed { target_rank })
                .map_err(|_| AriPartiError::Coordinator {
                    rank: self.params.rank,
                    message: "send split_failed failed".to_string(),
                }),
        }
    }

    fn handle_transfer_node(&mut self, target_rank: usize) -> Result<(), AriPartiError> {
        let Some((node_id, expected_target)) = self.pending_split.take() else {
            return Ok(());
        };
        if expected_target != target_rank {
            return Ok(());
        }
        let pid = self.tree.node(node_id).pid;
        let path = task_file_path(&self.round_dir(), pid);
        let bytes = std::fs::read(&path).map_err(|source| AriPartiError::Io {
            path: path.clone(),
            source,
        })?;
        self.link
            .send_body(target_rank, bytes)
            .map_err(|_| AriPartiError::Coordinator {
                rank: self.params.rank,
                message: format!("failed to transfer node {node_id} to rank {target_rank}"),
            })
    }

    fn drain_partitioner(&mut self) -> Result<(), AriPartiError> {
        let Some(partitioner) = self.partitioner.as_mut() else {
            return Ok(());
        };
        if let Some(status) = partitioner.poll_exit().ok().flatten() {
            if !status.success() {
                return Err(AriPartiError::PartitionerCrash {
                    pid: -1,
                    code: status.code(),
                });
            }
        }
        if self.capturing_model {
            for _ in 0..PARTITIONER_DRAIN_LIMIT {
                let Some(line) = partitioner.receive_raw_line() else {
                    break;
                };
                let model = self.sat_model.get_or_insert_with(String::new);
                model.push_str(&line);
                model.push('\n');
            }
            return Ok(());
        }
        for _ in 0..PARTITIONER_DRAIN_LIMIT {
            let Some(msg) = partitioner.receive_message() else {
                break;
            };
            self.apply_partitioner_message(msg);
        }
        Ok(())
    }

    fn apply_partitioner_message(&mut self, msg: P2C) {
        match msg {
            P2C::Sat => {
                if self.params.get_model_flag {
                    self.capturing_model = true;
                }
                self.tree
                    .node_solved(self.tree.root, NodeStatus::Sat, NodeReason::Partitioner)
            }
            P2C::Unsat => self
                .tree
                .node_solved(self.tree.root, NodeStatus::Unsat, NodeReason::Partitioner),
            P2C::Unknown => {}
            P2C::DebugInfo { .. } => {}
            P2C::NewUnknownNode { pid, ppid } | P2C::NewUnsatNode { pid, ppid } => {
                let parent_id = if ppid < 0 {
                    self.tree.root
                } else {
                    self.tree.find_by_pid(ppid).unwrap_or(self.tree.root)
                };
                let node_id = self.tree.make_node(pid, parent_id);
                if matches!(msg, P2C::NewUnsatNode { .. }) {
                    self.tree
                        .node_solved(node_id, NodeStatus::Unsat, NodeReason::Partitioner);
                }
            }
        }
    }

    fn poll_solvers(&mut self) {
        let finished: Vec<(NodeId, SolverOutcome)> = self
            .solvers
            .iter_mut()
            .filter_map(|(&id, solver)| {
                solver
                    .poll(self.params.get_model_flag)
                    .ok()
                    .flatten()
                    .map(|outcome| (id, outcome))
            })
            .collect();
        for (id, outcome) in finished {
            self.solvers.remove(&id);
            match outcome {
                SolverOutcome::Sat { model } => {
                    self.sat_model = model;
                    self.tree.node_solved(id, NodeStatus::Sat, NodeReason::Itself)
                }
                SolverOutcome::Unsat => {
                    self.tree.node_solved(id, NodeStatus::Unsat, NodeReason::Itself)
                }
                SolverOutcome::Unknown | SolverOutcome::Error => {
                    self.tree.terminate_node(id, NodeReason::Coordinator);
                }
            }
        }
    }

    /// `child_progress` counts, for a node's children: 1 point for each still
    /// in-progress child, 2 for each already-ended child. Matches
    /// `need_terminate`'s accounting exactly.
    fn child_progress(&self, node_id: NodeId) -> usize {
        self.tree
            .node(node_id)
            .core
            .children_ids
            .iter()
            .map(|&c| {
                let status = self.tree.node(c).core.status;
                if status.is_ended() {
                    2
                } else if status != NodeStatus::Unsolved {
                    1
                } else {
                    0
                }
            })
            .sum::<usize>()
            .min(3)
    }

    fn apply_terminate_on_demand(&mut self) {
        let remaining = self.remaining_time_budget();
        let solving_ids: Vec<NodeId> = self
            .tree
            .nodes
            .iter()
            .filter(|n| n.core.status == NodeStatus::Solving && !n.core.is_root())
            .map(|n| n.core.id)
            .collect();
        for id in solving_ids {
            let Some(solving_time) = self.tree.node(id).core.solving_time() else {
                continue;
            };
            let progress = self.child_progress(id);
            let threshold = Duration::from_secs_f64(TERMINATE_THRESHOLD_SECS[progress]);
            if remaining >= solving_time && solving_time > threshold {
                self.terminate_solving_node(id);
            }
        }
    }

    /// `time_limit - coordinator_elapsed`, matching `need_terminate`'s
    /// `remained_time = self.time_limit - self.get_coordinator_time()`. The leader
    /// still owns the authoritative global deadline (it alone decides `timeout`); this
    /// is only consulted by the terminate-on-demand heuristic below.
    fn remaining_time_budget(&self) -> Duration {
        match self.params.time_limit {
            Some(limit) => limit.saturating_sub(self.coordinator_start.elapsed()),
            None => Duration::from_secs(u64::MAX / 2),
        }
    }

    fn terminate_solving_node(&mut self, id: NodeId) {
        if let Some(mut solver) = self.solvers.remove(&id) {
            let _ = solver.kill();
        }
        self.tree.terminate_node(id, NodeReason::Coordinator);
        if let Some(partitioner) = self.partitioner.as_mut() {
            let pid = self.tree.node(id).pid;
            let _ = partitioner.send_message(&C2P::TerminateNode { pid }.to_line());
        }
    }

    /// Cores available for base-solver processes, after reserving one core for the
    /// coordinator's own thread and its partitioner child.
    fn usable_solver_slots(&self) -> usize {
        self.params.available_cores.saturating_sub(1).max(1)
    }

    fn dispatch_waiting_nodes(&mut self) -> Result<(), AriPartiError> {
        while self.solvers.len() < self.usable_solver_slots() {
            let Some(node_id) = self.next_waiting_node() else {
                break;
            };
            self.tree.assign_node(node_id);
            let pid = self.tree.node(node_id).pid;
            let task_file = task_file_path(&self.round_dir(), pid);
            let solver = BaseSolver::spawn(&self.params.solver_binary, &task_file, pid).map_err(
                |source| AriPartiError::Spawn {
                    path: self.params.solver_binary.clone(),
                    source,
                },
            )?;
            self.solvers.insert(node_id, solver);
        }
        Ok(())
    }

    fn next_waiting_node(&self) -> Option<NodeId> {
        self.tree
            .nodes
            .iter()
            .find(|n| n.core.status == NodeStatus::Unsolved && !self.solvers.contains_key(&n.core.id))
            .map(|n| n.core.id)
    }

    fn cleanup_round(&mut self) {
        for (_, mut solver) in self.solvers.drain() {
            let _ = solver.kill();
        }
        if let Some(mut partitioner) = self.partitioner.take() {
            let _ = partitioner.kill();
        }
    }

    /// The isolated coordinator's pre-partitioning pass: BFS-expand the emerging
    /// partitioner tree into `num_dist_coords` subnodes, bounded by a 20s wall-clock
    /// budget.
    pub fn run_isolated_pre_partition(
        &mut self,
        task_path: &Path,
    ) -> Result<PrePartitionOutcome, AriPartiError> {
        self.start_solving(task_path)?;
        #[cfg(feature = "solve-original-race")]
        self.spawn_original_race(task_path)?;
        let start = Instant::now();
        let mut subnodes: Vec<NodeId> = vec![self.tree.root];

        while subnodes.len() < self.params.num_dist_coords && start.elapsed() < PRE_PARTITION_BUDGET {
            #[cfg(feature = "solve-original-race")]
            if let Some(status) = self.poll_original_race() {
                return Ok(PrePartitionOutcome::OriginalRaceWon(status));
            }
            self.drain_partitioner()?;
            if self.tree.result.is_terminal() {
                break;
            }
            subnodes = self.leaf_frontier();
            if self.partitioner_is_done() {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        #[cfg(feature = "solve-original-race")]
        self.kill_original_race();
        Ok(PrePartitionOutcome::Subnodes(
            subnodes.into_iter().take(self.params.num_dist_coords).collect(),
        ))
    }

    #[cfg(feature = "solve-original-race")]
    fn spawn_original_race(&mut self, task_path: &Path) -> Result<(), AriPartiError> {
        let solver = BaseSolver::spawn(&self.params.solver_binary, task_path, -1).map_err(
            |source| AriPartiError::Spawn {
                path: self.params.solver_binary.clone(),
                source,
            },
        )?;
        self.original_solver = Some(solver);
        Ok(())
    }

    #[cfg(feature = "solve-original-race")]
    fn poll_original_race(&mut self) -> Option<ResultStatus> {
        let solver = self.original_solver.as_mut()?;
        let outcome = solver.poll(self.params.get_model_flag).ok().flatten()?;
        self.original_solver = None;
        match outcome {
            SolverOutcome::Sat { model } => {
                self.sat_model = model;
                Some(ResultStatus::Sat)
            }
            SolverOutcome::Unsat => Some(ResultStatus::Unsat),
            SolverOutcome::Unknown | SolverOutcome::Error => None,
        }
    }

    #[cfg(feature = "solve-original-race")]
    fn kill_original_race(&mut self) {
        if let Some(mut solver) = self.original_solver.take() {
            let _ = solver.kill();
        }
    }

    fn leaf_frontier(&self) -> Vec<NodeId> {
        self.tree
            .nodes
            .iter()
            .filter(|n| n.core.children_ids.is_empty() && n.core.status != NodeStatus::Unsat)
            .map(|n| n.core.id)
            .collect()
    }

    /// Full isolated-coordinator lifecycle: pre-partition, report the subnode count
    /// back to the leader, then wait for the leader's go-ahead before transferring
    /// each subnode's body to its assigned distributed coordinator (rank `i` gets
    /// `subnodes[i]`, matching the leader's own `0..count` assignment order in
    /// `leader::handle_pre_partition_done`).
    pub fn run_isolated(&mut self, task_path: &Path) -> RoundOutcome {
        let subnodes = match self.run_isolated_pre_partition(task_path) {
            Ok(PrePartitionOutcome::Subnodes(s)) => s,
            Ok(PrePartitionOutcome::OriginalRaceWon(status)) => {
                let model = self.sat_model.take();
                self.cleanup_round();
                if self
                    .link
                    .send_to_leader(C2L::NotifyOriginalResult { status, model })
                    .is_err()
                {
                    return RoundOutcome::Terminated;
                }
                return self.wait_for_terminate_signal();
            }
            Err(e) => {
                let _ = self.link.send_to_leader(C2L::NotifyError);
                return self.wait_for_terminate(e);
            }
        };
        let count = subnodes.len();
        if self
            .link
            .send_to_leader(C2L::PrePartitionDone { count })
            .is_err()
        {
            return RoundOutcome::Terminated;
        }

        loop {
            match self.link.recv_from_leader() {
                Ok(L2C::AssignNode { source_rank }) if source_rank == self.params.rank => {
                    for (target, &node_id) in subnodes.iter().enumerate() {
                        if let Err(e) = self.transfer_subnode(node_id, target) {
                            let _ = self.link.send_to_leader(C2L::NotifyError);
                            return self.wait_for_terminate(e);
                        }
                    }
                    self.cleanup_round();
                    return RoundOutcome::Result(ResultStatus::Unsolved, None);
                }
                Ok(L2C::TerminateCoordinator) => return RoundOutcome::Terminated,
                Ok(_) => continue,
                Err(_) => return RoundOutcome::Terminated,
            }
        }
    }

    fn transfer_subnode(&mut self, node_id: NodeId, target_rank: usize) -> Result<(), AriPartiError> {
        let pid = self.tree.node(node_id).pid;
        let path = task_file_path(&self.round_dir(), pid);
        let bytes = std::fs::read(&path).map_err(|source| AriPartiError::Io {
            path: path.clone(),
            source,
        })?;
        self.link
            .send_body(target_rank, bytes)
            .map_err(|_| AriPartiError::Coordinator {
                rank: self.params.rank,
                message: format!("failed to transfer subnode {node_id} to rank {target_rank}"),
            })
    }

    pub fn tree(&self) -> &ParallelTree {
        &self.tree
    }

    pub fn link(&self) -> &RankLink {
        &self.link
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::build_channel_transport;

    fn test_coordinator(time_limit: Option<Duration>) -> Coordinator {
        let (mut links, _leader_link) = build_channel_transport(1);
        let params = CoordinatorParams {
            rank: 0,
            is_isolated: false,
            num_dist_coords: 1,
            available_cores: 4,
            temp_dir: std::env::temp_dir(),
            output_dir: std::env::temp_dir(),
            partitioner_binary: PathBuf::from("partitioner-bin"),
            solver_binary: PathBuf::from("solver-bin"),
            get_model_flag: false,
            time_limit,
        };
        Coordinator::new(params, links.remove(0))
    }

    #[test]
    fn child_progress_counts_unsolved_started_and_ended_children() {
        let mut coord = test_coordinator(None);
        let root = coord.tree.make_root(0);
        let left = coord.tree.make_node(1, root);
        let right = coord.tree.make_node(2, root);
        // Both children still unsolved.
        assert_eq!(coord.child_progress(root), 0);
        coord.tree.assign_node(left); // started, unfinished
        assert_eq!(coord.child_progress(root), 1);
        coord
            .tree
            .node_solved(right, NodeStatus::Unsat, NodeReason::Itself);
        // left still started (1) + right ended (2) = 3
        assert_eq!(coord.child_progress(root), 3);
    }

    #[test]
    fn remaining_time_budget_is_effectively_unbounded_with_no_limit() {
        let coord = test_coordinator(None);
        assert!(coord.remaining_time_budget() > Duration::from_secs(3600 * 24 * 365));
    }

    #[test]
    fn remaining_time_budget_shrinks_toward_zero_as_limit_approaches() {
        let coord = test_coordinator(Some(Duration::from_millis(5)));
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(coord.remaining_time_budget(), Duration::ZERO);
    }

    #[test]
    fn usable_solver_slots_reserves_one_core_for_coordinator_and_partitioner() {
        let coord = test_coordinator(None);
        assert_eq!(coord.usable_solver_slots(), 3);
    }
}
