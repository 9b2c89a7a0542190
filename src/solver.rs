//! Base solver subprocess wrapper: one child process per leaf node, polled for exit.
//! A nonzero exit is an error absorbed locally (the node is terminated, not
//! propagated to the leader); a zero exit parses stdout — the whole output is the
//! status string, or the first line is the status and the rest is the model when
//! `get_model_flag` is set.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

pub struct BaseSolver {
    pub node_pid: i64,
    pub task_file: PathBuf,
    child: Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolverOutcome {
    Sat { model: Option<String> },
    Unsat,
    Unknown,
    /// Nonzero exit or unparseable stdout; absorbed locally rather than escalated.
    Error,
}

impl BaseSolver {
    pub fn spawn(binary: &Path, task_file: &Path, node_pid: i64) -> std::io::Result<Self> {
        let child = Command::new(binary)
            .arg(task_file)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        Ok(BaseSolver {
            node_pid,
            task_file: task_file.to_path_buf(),
            child,
        })
    }

    /// Non-blocking poll. Returns `Some(outcome)` once the process has exited.
    pub fn poll(&mut self, get_model_flag: bool) -> std::io::Result<Option<SolverOutcome>> {
        let Some(status) = self.child.try_wait()? else {
            return Ok(None);
        };
        if !status.success() {
            return Ok(Some(SolverOutcome::Error));
        }
        let mut stdout = String::new();
        if let Some(mut out) = self.child.stdout.take() {
            out.read_to_string(&mut stdout)?;
        }
        Ok(Some(parse_solver_output(&stdout, get_model_flag)))
    }

    pub fn kill(&mut self) -> std::io::Result<()> {
        match self.child.kill() {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(e),
        }
    }
}

fn parse_solver_output(stdout: &str, get_model_flag: bool) -> SolverOutcome {
    let trimmed = stdout.trim();
    if !get_model_flag {
        return match trimmed {
            "sat" => SolverOutcome::Sat { model: None },
            "unsat" => SolverOutcome::Unsat,
            "unknown" => SolverOutcome::Unknown,
            _ => SolverOutcome::Error,
        };
    }
    let mut lines = trimmed.lines();
    match lines.next() {
        Some("sat") => {
            let model = lines.collect::<Vec<_>>().join("\n");
            SolverOutcome::Sat {
                model: if model.is_empty() { None } else { Some(model) },
            }
        }
        Some("unsat") => SolverOutcome::Unsat,
        Some("unknown") => SolverOutcome::Unknown,
        _ => SolverOutcome::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_status_without_model() {
        assert_eq!(parse_solver_output("unsat\n", false), SolverOutcome::Unsat);
    }

    #[test]
    fn parses_sat_with_model() {
        let out = "sat\n(model (define-fun x () Int 3))\n";
        match parse_solver_output(out, true) {
            SolverOutcome::Sat { model: Some(m) } => {
                assert!(m.contains("define-fun"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn garbage_output_is_error() {
        assert_eq!(parse_solver_output("garbage", false), SolverOutcome::Error);
    }
}
