//! Non-blocking stdio adapter around the external partitioner subprocess.
//!
//! The subprocess's status/poll loop is replaced by a reader thread plus an
//! unbounded channel (a worker-thread-plus-channel idiom), which is what lets
//! `receive_message` be truly non-blocking without raw fd manipulation.

use crate::error::{AriPartiError, SpawnSnafu};
use crate::messages::P2C;
use crossbeam_channel::{unbounded, Receiver, TryRecvError};
use snafu::ResultExt;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::thread;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionerLifecycle {
    Running,
    ProcessDone,
    ReceiveDone,
}

pub struct Partitioner {
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<String>,
    lifecycle: PartitionerLifecycle,
}

impl Partitioner {
    /// Spawns the partitioner binary:
    /// `partitioner-bin <task.smt2> -outputdir:<dir> -partimrt:<n> -partiseed:<seed>
    /// [-roottaskid:<id> -childtaskid:<id> -getmodelflag:<0|1>]`.
    pub fn spawn(
        binary: &Path,
        task_file: &Path,
        output_dir: &Path,
        max_runtime_cores: usize,
        parti_seed: u32,
        get_model_flag: bool,
    ) -> Result<Self, AriPartiError> {
        let mut cmd = Command::new(binary);
        cmd.arg(task_file)
            .arg(format!("-outputdir:{}", output_dir.display()))
            .arg(format!("-partimrt:{max_runtime_cores}"))
            .arg(format!("-partiseed:{parti_seed}"))
            .arg(format!("-getmodelflag:{}", get_model_flag as u8))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().context(SpawnSnafu {
            path: binary.to_path_buf(),
        })?;
        let stdin = child.stdin.take().expect("piped stdin");
        let stdout = child.stdout.take().expect("piped stdout");

        let (sender, receiver) = unbounded::<String>();
        thread::spawn(move || {
            let reader = BufReader::new(stdout);
            for line in reader.lines().map_while(Result::ok) {
                if sender.send(line).is_err() {
                    break;
                }
            }
        });

        Ok(Partitioner {
            child,
            stdin,
            lines: receiver,
            lifecycle: PartitionerLifecycle::Running,
        })
    }

    /// Non-blocking: returns at most one parsed message, or `None` if nothing is
    /// currently available.
    pub fn receive_message(&mut self) -> Option<P2C> {
        loop {
            match self.lines.try_recv() {
                Ok(line) => {
                    if let Some(msg) = P2C::parse(&line) {
                        return Some(msg);
                    }
                    // blank/garbage line, keep draining
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => {
                    self.lifecycle = PartitionerLifecycle::ReceiveDone;
                    return None;
                }
            }
        }
    }

    /// Drains one raw, unparsed line (bypassing `P2C::parse`), for the model-body
    /// capture mode entered after the partitioner reports `sat` with
    /// `get_model_flag` set: every line from there to EOF is model text, not
    /// protocol grammar. Non-blocking, like `receive_message`.
    pub fn receive_raw_line(&mut self) -> Option<String> {
        match self.lines.try_recv() {
            Ok(line) => Some(line),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.lifecycle = PartitionerLifecycle::ReceiveDone;
                None
            }
        }
    }

    pub fn send_message(&mut self, line: &str) -> std::io::Result<()> {
        writeln!(self.stdin, "{line}")?;
        self.stdin.flush()
    }

    /// Polls the child's exit status without blocking. Once observed, a nonzero exit
    /// is a fatal partitioner crash.
    pub fn poll_exit(&mut self) -> std::io::Result<Option<ExitStatus>> {
        let status = self.child.try_wait()?;
        if status.is_some() {
            self.lifecycle = PartitionerLifecycle::ProcessDone;
        }
        Ok(status)
    }

    pub fn lifecycle(&self) -> PartitionerLifecycle {
        self.lifecycle
    }

    pub fn kill(&mut self) -> std::io::Result<()> {
        match self.child.kill() {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(()), // already exited
            Err(e) => Err(e),
        }
    }
}

pub fn task_file_path(output_dir: &Path, pid: i64) -> PathBuf {
    output_dir.join(format!("task-{pid}.smt2"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_file_path_matches_naming_convention() {
        let p = task_file_path(Path::new("/tmp/round-0"), 42);
        assert_eq!(p, PathBuf::from("/tmp/round-0/task-42.smt2"));
    }
}
