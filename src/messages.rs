//! Control message vocabulary exchanged between ranks, and the partitioner/solver stdio
//! line grammar: four message families (`L2C`, `C2L`, `C2P`, `P2C`). Subproblem body
//! transfer itself is not a control message; it goes over the body channel via
//! `transport::RankLink::send_body`/`recv_body`.

use serde::{Deserialize, Serialize};

/// Leader -> Coordinator control messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum L2C {
    /// Ask the coordinator to try splitting off work for `target_rank`.
    RequestSplit { target_rank: usize },
    /// Tell the coordinator to push the subproblem body to `target_rank`.
    TransferNode { target_rank: usize },
    /// Assign a fresh round to this coordinator; payload follows on the body channel.
    AssignNode { source_rank: usize },
    /// Shut down and exit. Always sent to every coordinator before the leader exits.
    TerminateCoordinator,
}

/// Coordinator -> Leader control messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum C2L {
    SplitSucceed { target_rank: usize },
    SplitFailed { target_rank: usize },
    NotifyResult {
        status: ResultStatus,
        model: Option<String>,
    },
    /// Sent only by the isolated coordinator when its `solve-original-race` monolithic
    /// solve wins before pre-partitioning finishes.
    NotifyOriginalResult {
        status: ResultStatus,
        model: Option<String>,
    },
    PrePartitionDone { count: usize },
    NotifyError,
}

/// Coordinator -> Partitioner stdin grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum C2P {
    UnsatNode { pid: i64 },
    TerminateNode { pid: i64 },
}

impl C2P {
    /// Renders the line written to the partitioner's stdin.
    pub fn to_line(self) -> String {
        match self {
            C2P::UnsatNode { pid } => format!("0 {pid}"),
            C2P::TerminateNode { pid } => format!("1 {pid}"),
        }
    }
}

/// Partitioner -> Coordinator stdout grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum P2C {
    DebugInfo { pid: i64, ppid: i64 },
    NewUnknownNode { pid: i64, ppid: i64 },
    NewUnsatNode { pid: i64, ppid: i64 },
    Sat,
    Unsat,
    Unknown,
}

impl P2C {
    pub fn is_new_node(&self) -> bool {
        matches!(self, P2C::NewUnknownNode { .. } | P2C::NewUnsatNode { .. })
    }

    pub fn is_solved_result(&self) -> bool {
        matches!(self, P2C::Sat | P2C::Unsat | P2C::Unknown)
    }

    /// Parses one line of partitioner stdout.
    ///
    /// Returns `None` for blank lines (which are skipped, not errors).
    pub fn parse(line: &str) -> Option<P2C> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match line {
            "sat" => return Some(P2C::Sat),
            "unsat" => return Some(P2C::Unsat),
            "unknown" => return Some(P2C::Unknown),
            _ => {}
        }
        let mut parts = line.split_whitespace();
        let opcode: u8 = parts.next()?.parse().ok()?;
        let pid: i64 = parts.next()?.parse().ok()?;
        let ppid: i64 = parts.next()?.parse().ok()?;
        match opcode {
            0 => Some(P2C::DebugInfo { pid, ppid }),
            1 => Some(P2C::NewUnknownNode { pid, ppid }),
            2 => Some(P2C::NewUnsatNode { pid, ppid }),
            _ => None,
        }
    }
}

/// Terminal verdict for a tree (or the whole run).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultStatus {
    Sat,
    Unsat,
    Unsolved,
}

/// The final verdict printed by the leader to stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunResult {
    Sat { model: Option<String> },
    Unsat,
    Timeout,
    CoordinatorError,
    LeaderError,
}

impl std::fmt::Display for RunResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunResult::Sat { .. } => write!(f, "sat"),
            RunResult::Unsat => write!(f, "unsat"),
            RunResult::Timeout => write!(f, "timeout"),
            RunResult::CoordinatorError => write!(f, "Coordinator-Error"),
            RunResult::LeaderError => write!(f, "Leader-Error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_terminal_tokens() {
        assert_eq!(P2C::parse("sat"), Some(P2C::Sat));
        assert_eq!(P2C::parse("unsat"), Some(P2C::Unsat));
        assert_eq!(P2C::parse("unknown"), Some(P2C::Unknown));
    }

    #[test]
    fn parses_new_node_lines() {
        assert_eq!(
            P2C::parse("1 5 2"),
            Some(P2C::NewUnknownNode { pid: 5, ppid: 2 })
        );
        assert_eq!(
            P2C::parse("2 6 2"),
            Some(P2C::NewUnsatNode { pid: 6, ppid: 2 })
        );
    }

    #[test]
    fn ignores_blank_lines() {
        assert_eq!(P2C::parse(""), None);
        assert_eq!(P2C::parse("   "), None);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(P2C::parse("not a line"), None);
    }

    #[test]
    fn c2p_renders_expected_lines() {
        assert_eq!(C2P::UnsatNode { pid: 3 }.to_line(), "0 3");
        assert_eq!(C2P::TerminateNode { pid: 3 }.to_line(), "1 3");
    }
}
