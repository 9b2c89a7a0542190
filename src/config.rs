//! Launcher configuration: the run's JSON config schema, plus the worker[0]
//! core-reservation math for the isolated coordinator and leader.

use crate::error::{AriPartiError, ConfigSnafu, InvalidConfigSnafu};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Parallel,
    Distributed,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LauncherConfig {
    pub formula_file: PathBuf,
    pub timeout_seconds: u64,
    pub base_solver: String,
    pub mode: RunMode,

    #[serde(default)]
    pub parallel_core: Option<usize>,
    #[serde(default)]
    pub worker_node_ips: Vec<String>,
    #[serde(default)]
    pub worker_node_cores: Vec<usize>,
    #[serde(default)]
    pub network_interface: Option<String>,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub output_total_time: bool,
    /// Reserved cores for the isolated coordinator + leader on worker[0]. Matches the
    /// launcher's `isolated_coordinator_cores` override (default 8, see
    /// `resolve_topology`).
    #[serde(default)]
    pub isolated_coordinator_cores: Option<usize>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

/// The fully resolved cluster topology after mode-specific auto-fill and core
/// reservation.
#[derive(Debug, Clone)]
pub struct Topology {
    pub worker_node_ips: Vec<String>,
    /// Per-rank core counts for the `N` distributed coordinator ranks only (worker[0]
    /// already has the isolated/leader reservation subtracted).
    pub worker_node_cores: Vec<usize>,
    /// Cores reserved on worker[0] for the isolated coordinator (and, in the original,
    /// shared with the leader thread).
    pub reserved_cores: usize,
    pub network_interface: String,
}

impl LauncherConfig {
    pub fn load(path: &Path) -> Result<Self, AriPartiError> {
        let bytes = std::fs::read(path).map_err(|source| AriPartiError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: LauncherConfig = serde_json::from_slice(&bytes).context(ConfigSnafu)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AriPartiError> {
        match self.mode {
            RunMode::Parallel => {
                if self.parallel_core.is_none() {
                    return InvalidConfigSnafu {
                        message: "'parallel_core' is required for mode=parallel".to_string(),
                    }
                    .fail();
                }
            }
            RunMode::Distributed => {
                if self.worker_node_ips.is_empty() {
                    return InvalidConfigSnafu {
                        message: "'worker_node_ips' is required for mode=distributed".to_string(),
                    }
                    .fail();
                }
                if self.worker_node_cores.len() != self.worker_node_ips.len() {
                    return InvalidConfigSnafu {
                        message: "'worker_node_cores' must match 'worker_node_ips' in length"
                            .to_string(),
                    }
                    .fail();
                }
                if self.network_interface.is_none() {
                    return InvalidConfigSnafu {
                        message: "'network_interface' is required for mode=distributed".to_string(),
                    }
                    .fail();
                }
            }
        }
        Ok(())
    }

    /// Applies the parallel-mode auto-fill (`worker_node_ips = ["localhost"]`, a
    /// single-entry `worker_node_cores`, `network_interface = "lo"`) then reserves
    /// cores for the isolated coordinator on worker[0], per the launcher's
    /// `adjust_cores_for_isolated_coordinator`.
    pub fn resolve_topology(&self) -> Result<Topology, AriPartiError> {
        let (ips, mut cores, iface) = match self.mode {
            RunMode::Parallel => {
                let core_count = self.parallel_core.expect("validated by validate()");
                (
                    vec!["localhost".to_string()],
                    vec![core_count],
                    "lo".to_string(),
                )
            }
            RunMode::Distributed => (
                self.worker_node_ips.clone(),
                self.worker_node_cores.clone(),
                self.network_interface.clone().expect("validated"),
            ),
        };

        let server_0_cores = cores[0];
        let reserved = if server_0_cores >= 16 {
            self.isolated_coordinator_cores.unwrap_or(8)
        } else if server_0_cores >= 8 {
            4
        } else if server_0_cores >= 4 {
            2
        } else {
            return InvalidConfigSnafu {
                message: "not enough cores on first node to reserve cores for isolated coordinator"
                    .to_string(),
            }
            .fail();
        };
        cores[0] -= reserved;

        Ok(Topology {
            worker_node_ips: ips,
            worker_node_cores: cores,
            reserved_cores: reserved,
            network_interface: iface,
        })
    }

    /// The formula's basename without its `.smt2` extension, used for the run's
    /// `instance_name`.
    pub fn instance_name(&self) -> String {
        self.formula_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "instance".to_string())
    }

    /// Whether the formula requests a model: an uncommented `(get-model)` command
    /// anywhere in the file. Mirrors the launcher's own `check_get_model_flag`, which
    /// derives this from the formula rather than a JSON config key.
    pub fn get_model_flag(&self) -> bool {
        check_get_model_flag(&self.formula_file)
    }
}

/// Scans `path` line by line for an uncommented `(get-model)` SMT2 command (a `;`
/// comment may precede it on the same line but not the command itself).
fn check_get_model_flag(path: &Path) -> bool {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return false;
    };
    contents
        .lines()
        .any(|line| line.split(';').next().is_some_and(|code| code.contains("(get-model)")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_parallel() -> LauncherConfig {
        LauncherConfig {
            formula_file: PathBuf::from("/tmp/foo.smt2"),
            timeout_seconds: 60,
            base_solver: "z3".to_string(),
            mode: RunMode::Parallel,
            parallel_core: Some(16),
            worker_node_ips: vec![],
            worker_node_cores: vec![],
            network_interface: None,
            output_dir: default_output_dir(),
            output_total_time: false,
            isolated_coordinator_cores: None,
        }
    }

    #[test]
    fn parallel_mode_reserves_eight_cores_above_sixteen() {
        let cfg = base_parallel();
        let topo = cfg.resolve_topology().unwrap();
        assert_eq!(topo.worker_node_cores, vec![8]);
        assert_eq!(topo.reserved_cores, 8);
        assert_eq!(topo.network_interface, "lo");
    }

    #[test]
    fn reserves_four_cores_between_eight_and_sixteen() {
        let mut cfg = base_parallel();
        cfg.parallel_core = Some(10);
        let topo = cfg.resolve_topology().unwrap();
        assert_eq!(topo.reserved_cores, 4);
        assert_eq!(topo.worker_node_cores, vec![6]);
    }

    #[test]
    fn reserves_two_cores_between_four_and_eight() {
        let mut cfg = base_parallel();
        cfg.parallel_core = Some(5);
        let topo = cfg.resolve_topology().unwrap();
        assert_eq!(topo.reserved_cores, 2);
    }

    #[test]
    fn fails_below_four_cores() {
        let mut cfg = base_parallel();
        cfg.parallel_core = Some(2);
        assert!(cfg.resolve_topology().is_err());
    }

    #[test]
    fn instance_name_strips_extension() {
        let cfg = base_parallel();
        assert_eq!(cfg.instance_name(), "foo");
    }

    #[test]
    fn get_model_flag_detects_uncommented_command() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "(set-logic QF_LIA)\n(get-model)\n(exit)\n").unwrap();
        let mut cfg = base_parallel();
        cfg.formula_file = file.path().to_path_buf();
        assert!(cfg.get_model_flag());
    }

    #[test]
    fn get_model_flag_ignores_commented_command() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "(set-logic QF_LIA)\n; (get-model)\n(exit)\n").unwrap();
        let mut cfg = base_parallel();
        cfg.formula_file = file.path().to_path_buf();
        assert!(!cfg.get_model_flag());
    }

    #[test]
    fn distributed_mode_requires_matching_lengths() {
        let mut cfg = base_parallel();
        cfg.mode = RunMode::Distributed;
        cfg.worker_node_ips = vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()];
        cfg.worker_node_cores = vec![16];
        cfg.network_interface = Some("eth0".to_string());
        assert!(cfg.validate().is_err());
    }
}
