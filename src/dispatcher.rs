//! Rank-based entry point: builds the in-process channel fabric and spawns one
//! scoped thread per rank (interactive coordinators, the isolated coordinator, and
//! the leader), then joins them and reports the final verdict. Ranks below
//! `isolated_rank` are interactive coordinators, `isolated_rank` is the isolated
//! coordinator, and the leader runs on the scope-owning thread.

use crate::config::{LauncherConfig, Topology};
use crate::coordinator::{Coordinator, CoordinatorParams};
use crate::leader::Leader;
use crate::messages::RunResult;
use crate::transport::build_channel_transport;
use std::path::PathBuf;
use std::time::Duration;

pub struct RunOutcome {
    pub result: RunResult,
    pub elapsed: Duration,
}

/// Runs a whole solve: `topology.worker_node_cores.len()` interactive coordinators
/// plus one isolated coordinator plus the leader, all as scoped threads.
pub fn run(config: &LauncherConfig, topology: &Topology, temp_root: &std::path::Path) -> RunOutcome {
    let num_coords = topology.worker_node_cores.len();
    let isolated_rank = num_coords;
    let (mut links, leader_link) = build_channel_transport(num_coords + 1);

    let time_limit = if config.timeout_seconds > 0 {
        Some(Duration::from_secs(config.timeout_seconds))
    } else {
        None
    };

    let partitioner_binary = PathBuf::from("partitioner-bin");
    let solver_binary = PathBuf::from(&config.base_solver);
    let formula_file = config.formula_file.clone();
    let get_model_flag = config.get_model_flag();

    let start = std::time::Instant::now();

    let result = crossbeam::scope(|scope| {
        let mut coordinator_handles = Vec::new();

        // Interactive coordinators, ranks 0..num_coords.
        for rank in 0..num_coords {
            let link = links.remove(0);
            let params = CoordinatorParams {
                rank,
                is_isolated: false,
                num_dist_coords: num_coords,
                available_cores: topology.worker_node_cores[rank],
                temp_dir: temp_root.join(format!("Coordinator-{rank}")),
                output_dir: config.output_dir.clone(),
                partitioner_binary: partitioner_binary.clone(),
                solver_binary: solver_binary.clone(),
                get_model_flag,
                time_limit,
            };
            coordinator_handles.push(scope.spawn(move |_| {
                let mut coord = Coordinator::new(params, link);
                coord.run_interactive()
            }));
        }

        // Isolated coordinator, rank == num_coords.
        let isolated_link = links.remove(0);
        let isolated_params = CoordinatorParams {
            rank: isolated_rank,
            is_isolated: true,
            num_dist_coords: num_coords,
            available_cores: topology.reserved_cores,
            temp_dir: temp_root.join(format!("Coordinator-{isolated_rank}")),
            output_dir: config.output_dir.clone(),
            partitioner_binary: partitioner_binary.clone(),
            solver_binary: solver_binary.clone(),
            get_model_flag,
            time_limit,
        };
        let formula_file_for_isolated = formula_file.clone();
        let isolated_handle = scope.spawn(move |_| {
            let mut coord = Coordinator::new(isolated_params, isolated_link);
            coord.run_isolated(&formula_file_for_isolated)
        });

        // Leader, rank == num_coords + 1 (implicit: it owns leader_link directly).
        let mut leader = Leader::new(leader_link, num_coords, isolated_rank, time_limit);
        let leader_result = leader.solve();

        for handle in coordinator_handles {
            let _ = handle.join();
        }
        let _ = isolated_handle.join();

        leader_result
    })
    .unwrap_or(RunResult::LeaderError);

    RunOutcome {
        result,
        elapsed: start.elapsed(),
    }
}
