//! Execution plan for one supervised child process.
//!
//! A `Plan` describes everything the executor needs: the command, the exact
//! environment the child sees (nothing is inherited), the working directory,
//! and the resource ceilings.
//!
//! ## Defaults
//!
//! | Field | Default |
//! |-------|---------|
//! | `wall_timeout` | 5 seconds |
//! | `kill_grace` | 1 second |
//! | `cpu_seconds` | 5 |
//! | `memory_bytes` | 512 MiB (best-effort, see [`crate::limits`]) |
//! | `max_output` | 16 MiB |

use std::collections::HashMap;
use std::time::Duration;

/// Complete specification of one sandboxed execution.
#[derive(Debug, Clone)]
pub struct Plan {
    pub cmd: Vec<String>,
    /// Exact child environment. The child inherits nothing from the parent.
    pub env: HashMap<String, String>,
    pub cwd: Option<String>,
    /// Wall-clock budget granted to the child itself.
    pub wall_timeout: Duration,
    /// Extra time past `wall_timeout` before the supervisor sends SIGKILL.
    /// Gives an in-process cancellation mechanism a chance to exit cleanly.
    pub kill_grace: Duration,
    /// Hard CPU-time ceiling (RLIMIT_CPU), in seconds.
    pub cpu_seconds: u64,
    /// Address-space ceiling (RLIMIT_AS). `None` disables; enforcement is
    /// best-effort on platforms that reject it.
    pub memory_bytes: Option<u64>,
    /// Combined stdout+stderr capture cap.
    pub max_output: u64,
}

impl Default for Plan {
    fn default() -> Self {
        Self {
            cmd: Vec::new(),
            env: HashMap::new(),
            cwd: None,
            wall_timeout: Duration::from_secs(5),
            kill_grace: Duration::from_secs(1),
            cpu_seconds: 5,
            memory_bytes: Some(512 * 1024 * 1024),
            max_output: 16 * 1024 * 1024,
        }
    }
}

impl Plan {
    pub fn new(cmd: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            cmd: cmd.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn envs(
        mut self,
        vars: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn wall_timeout(mut self, timeout: Duration) -> Self {
        self.wall_timeout = timeout;
        self
    }

    pub fn kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }

    pub fn cpu_seconds(mut self, seconds: u64) -> Self {
        self.cpu_seconds = seconds;
        self
    }

    pub fn memory_bytes(mut self, bytes: impl Into<Option<u64>>) -> Self {
        self.memory_bytes = bytes.into();
        self
    }

    pub fn max_output(mut self, bytes: u64) -> Self {
        self.max_output = bytes;
        self
    }

    /// Supervisor-side deadline: wall budget plus the kill grace.
    pub(crate) fn deadline_from(&self, start: std::time::Instant) -> std::time::Instant {
        start + self.wall_timeout + self.kill_grace
    }
}
