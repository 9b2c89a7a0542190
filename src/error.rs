//! Crate-wide error types.
//!
//! Local failures (a single base-solver invocation going bad) are absorbed by the
//! `Coordinator` and never reach this type; everything here represents a failure that
//! aborts a whole coordinator round or the leader's run.

use snafu::Snafu;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AriPartiError {
    #[snafu(display("coordinator {rank} failed: {message}"))]
    Coordinator { rank: usize, message: String },

    #[snafu(display("leader failed: {message}"))]
    Leader { message: String },

    #[snafu(display("global time limit of {limit_secs}s exceeded"))]
    Timeout { limit_secs: u64 },

    #[snafu(display("partitioner for node {pid} exited with status {code:?}"))]
    PartitionerCrash { pid: i64, code: Option<i32> },

    #[snafu(display("base solver for node {pid} produced an unreadable result"))]
    SolverProcessError { pid: i64 },

    #[snafu(display("could not spawn child process {path:?}: {source}"))]
    Spawn {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("i/o error on {path:?}: {source}"))]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to parse config: {source}"))]
    Config { source: serde_json::Error },

    #[snafu(display("invalid config: {message}"))]
    InvalidConfig { message: String },

    #[snafu(display("transport send failed on tag {tag:?} to rank {to}"))]
    SendFailed { tag: String, to: usize },

    #[snafu(display("transport recv failed on tag {tag:?} from rank {from}"))]
    RecvFailed { tag: String, from: usize },
}

pub type Result<T, E = AriPartiError> = std::result::Result<T, E>;
