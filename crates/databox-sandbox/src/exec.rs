//! Fork/exec pipeline for one supervised execution.
//!
//! ## Pipeline
//!
//! 1. Validate the command
//! 2. Create stdout/stderr pipes
//! 3. Prebuild argv/envp C strings (no allocation after fork)
//! 4. `fork()`
//! 5. Child: wire stdio, chdir, apply rlimits, `execve`
//! 6. Parent: open a pidfd, drop the child-side pipe ends, hand off to
//!    [`crate::monitor`]
//!
//! The child environment is exactly `plan.env` - nothing is inherited from
//! the supervisor, so `LD_PRELOAD`-style injection via the caller's
//! environment is structurally impossible.

use std::ffi::CString;
use std::io::{self, Write as _};

use rustix::process::{pidfd_open, Pid, PidfdFlags};
use thiserror::Error;

use crate::limits::apply_rlimits;
use crate::monitor::{monitor, Output};
use crate::pipes::{Pipe, Pipes};
use crate::plan::Plan;
use crate::validate::{validate_cmd, ValidationError};

/// Error during supervised execution.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("validation: {0}")]
    Validation(#[from] ValidationError),

    #[error("pipes: {0}")]
    Pipes(io::Error),

    #[error("fork: {0}")]
    Fork(io::Error),

    #[error("pidfd: {0}")]
    Pidfd(io::Error),

    #[error("monitor: {0}")]
    Monitor(io::Error),
}

/// Blocking executor: one plan, one child, one [`Output`].
pub struct Executor;

impl Executor {
    /// Execute a plan and wait for completion.
    pub fn run(plan: Plan) -> Result<Output, ExecError> {
        validate_cmd(&plan.cmd)?;

        tracing::debug!(
            cmd = %plan.cmd[0],
            cpu_seconds = plan.cpu_seconds,
            memory_bytes = ?plan.memory_bytes,
            wall_ms = plan.wall_timeout.as_millis() as u64,
            "spawning supervised child (memory ceiling is best-effort)"
        );

        let pipes = Pipes::new().map_err(ExecError::Pipes)?;

        // Prebuilt so the child performs no heap allocation between fork and
        // exec. validate_cmd already rejected interior null bytes.
        let cstrs = ChildStrings::prepare(&plan);

        let stdout_write_raw = pipes.stdout.write_fd();
        let stderr_write_raw = pipes.stderr.write_fd();
        let stdout_read_raw = pipes.stdout.read_fd();
        let stderr_read_raw = pipes.stderr.read_fd();

        let child_pid = unsafe { libc::fork() };
        if child_pid < 0 {
            return Err(ExecError::Fork(io::Error::last_os_error()));
        }

        if child_pid == 0 {
            // In the child. Only libc from here on; report setup failures on
            // the (already wired, or original) stderr and _exit.
            match child_process(
                &plan,
                &cstrs,
                stdout_read_raw,
                stderr_read_raw,
                stdout_write_raw,
                stderr_write_raw,
            ) {
                Ok(()) => unsafe { libc::_exit(127) },
                Err(e) => {
                    writeln!(io::stderr(), "sandbox error: {e}").ok();
                    unsafe { libc::_exit(126) }
                }
            }
        }

        // fork returned a positive pid of a live child.
        let pid = Pid::from_raw(child_pid)
            .ok_or_else(|| ExecError::Fork(io::Error::other("fork returned pid 0")))?;
        let pidfd = pidfd_open(pid, PidfdFlags::empty())
            .map_err(|e| ExecError::Pidfd(io::Error::from(e)))?;

        // Drop the child-side write ends so EOF reaches poll().
        let Pipes { stdout, stderr } = pipes;
        let Pipe {
            read: stdout_read,
            write: stdout_write,
        } = stdout;
        let Pipe {
            read: stderr_read,
            write: stderr_write,
        } = stderr;
        drop(stdout_write);
        drop(stderr_write);

        monitor(pidfd, &stdout_read, &stderr_read, &plan).map_err(ExecError::Monitor)
    }
}

/// argv/envp/cwd as C strings, built before fork.
struct ChildStrings {
    binary: CString,
    argv: Vec<CString>,
    envp: Vec<CString>,
    cwd: Option<CString>,
}

impl ChildStrings {
    fn prepare(plan: &Plan) -> Self {
        let binary = CString::new(plan.cmd[0].as_bytes()).unwrap_or_default();
        let argv = plan
            .cmd
            .iter()
            .map(|a| CString::new(a.as_bytes()).unwrap_or_default())
            .collect();
        let envp = plan
            .env
            .iter()
            .map(|(k, v)| CString::new(format!("{k}={v}")).unwrap_or_default())
            .collect();
        let cwd = plan
            .cwd
            .as_ref()
            .and_then(|c| CString::new(c.as_bytes()).ok());
        Self {
            binary,
            argv,
            envp,
            cwd,
        }
    }
}

/// Child-side setup. Runs between fork and exec; libc only.
fn child_process(
    plan: &Plan,
    cstrs: &ChildStrings,
    stdout_read: libc::c_int,
    stderr_read: libc::c_int,
    stdout_write: libc::c_int,
    stderr_write: libc::c_int,
) -> Result<(), &'static str> {
    unsafe {
        libc::close(stdout_read);
        libc::close(stderr_read);
    }

    setup_stdio(stdout_write, stderr_write)?;

    if let Some(ref cwd) = cstrs.cwd {
        if unsafe { libc::chdir(cwd.as_ptr()) } != 0 {
            return Err("chdir failed");
        }
    }

    apply_rlimits(plan).map_err(|_| "setrlimit failed")?;

    let argv_ptrs: Vec<*const libc::c_char> = cstrs
        .argv
        .iter()
        .map(|s| s.as_ptr())
        .chain(std::iter::once(std::ptr::null()))
        .collect();
    let envp_ptrs: Vec<*const libc::c_char> = cstrs
        .envp
        .iter()
        .map(|s| s.as_ptr())
        .chain(std::iter::once(std::ptr::null()))
        .collect();

    unsafe { libc::execve(cstrs.binary.as_ptr(), argv_ptrs.as_ptr(), envp_ptrs.as_ptr()) };

    Err("execve failed")
}

/// Wire stdin to /dev/null and stdout/stderr to the capture pipes.
fn setup_stdio(stdout_write: libc::c_int, stderr_write: libc::c_int) -> Result<(), &'static str> {
    unsafe {
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_RDONLY);
        if devnull < 0 {
            return Err("open /dev/null failed");
        }
        if libc::dup2(devnull, 0) < 0 {
            return Err("dup2 stdin failed");
        }
        libc::close(devnull);
        if libc::dup2(stdout_write, 1) < 0 {
            return Err("dup2 stdout failed");
        }
        if libc::dup2(stderr_write, 2) < 0 {
            return Err("dup2 stderr failed");
        }
        libc::close(stdout_write);
        libc::close(stderr_write);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::Status;
    use std::time::Duration;

    #[test]
    fn run_echo() {
        let plan = Plan::new(["/bin/echo", "hello"]);
        let output = Executor::run(plan).unwrap();
        assert!(output.success());
        assert_eq!(output.stdout, b"hello\n");
        assert!(output.stderr.is_empty());
    }

    #[test]
    fn run_nonzero_exit() {
        let plan = Plan::new(["/bin/sh", "-c", "exit 3"]);
        let output = Executor::run(plan).unwrap();
        assert_eq!(output.status, Status::Exited);
        assert_eq!(output.exit_code, Some(3));
    }

    #[test]
    fn run_captures_stderr() {
        let plan = Plan::new(["/bin/sh", "-c", "echo oops >&2"]);
        let output = Executor::run(plan).unwrap();
        assert_eq!(output.stderr, b"oops\n");
    }

    #[test]
    fn run_missing_binary() {
        let plan = Plan::new(["/nonexistent/binary"]);
        let output = Executor::run(plan).unwrap();
        // Child reports the exec failure and exits 126.
        assert_eq!(output.exit_code, Some(126));
        assert!(output.stderr_str().contains("sandbox error"));
    }

    #[test]
    fn run_empty_cmd_rejected() {
        let err = Executor::run(Plan::default()).unwrap_err();
        assert!(matches!(err, ExecError::Validation(_)));
    }

    #[test]
    fn wall_deadline_kills_sleeper() {
        let plan = Plan::new(["/bin/sh", "-c", "sleep 30"])
            .wall_timeout(Duration::from_millis(300))
            .kill_grace(Duration::from_millis(100));
        let start = std::time::Instant::now();
        let output = Executor::run(plan).unwrap();
        assert_eq!(output.status, Status::Timeout);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn output_limit_kills_flooder() {
        let plan = Plan::new(["/bin/sh", "-c", "while :; do echo xxxxxxxxxxxxxxxx; done"])
            .wall_timeout(Duration::from_secs(10))
            .max_output(64 * 1024);
        let output = Executor::run(plan).unwrap();
        assert_eq!(output.status, Status::OutputLimitExceeded);
    }

    #[test]
    fn env_is_exactly_the_plan_env() {
        let plan = Plan::new(["/bin/sh", "-c", r#"printf '%s' "$SANDBOX_MARKER:$HOME""#])
            .env("SANDBOX_MARKER", "present");
        let output = Executor::run(plan).unwrap();
        // HOME is not inherited from the supervisor.
        assert_eq!(output.stdout_str(), "present:");
    }

    #[test]
    fn cwd_is_applied() {
        let plan = Plan::new(["/bin/sh", "-c", "pwd"]).cwd("/tmp");
        let output = Executor::run(plan).unwrap();
        assert_eq!(output.stdout_str().trim_end(), "/tmp");
    }
}
