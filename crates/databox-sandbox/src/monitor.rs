//! Child supervision and output collection.
//!
//! Multiplexes with `poll()` between:
//!
//! - **pidfd** - signals child exit without waitpid races
//! - **stdout / stderr pipes** - captured output
//! - **deadline** - SIGKILL once the wall budget (plus grace) is spent
//!
//! ## Output Limits
//!
//! If combined stdout+stderr exceeds `max_output`, the child is killed and
//! the status becomes [`Status::OutputLimitExceeded`]. This stops a runaway
//! script from buffering the supervisor into the ground.
//!
//! ## Exit Detection
//!
//! `waitid(P_PIDFD, ...)` yields the detailed exit reason:
//! - `CLD_EXITED` - normal exit with exit code
//! - `CLD_KILLED` / `CLD_DUMPED` - killed by signal

use std::io;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::time::{Duration, Instant};

use rustix::process::{pidfd_send_signal, Signal};

use crate::plan::Plan;

/// Raw output of one supervised execution.
#[derive(Debug, Clone)]
pub struct Output {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub status: Status,
    pub duration: Duration,
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
}

impl Output {
    #[inline]
    pub fn success(&self) -> bool {
        self.status == Status::Exited && self.exit_code == Some(0)
    }

    #[inline]
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    #[inline]
    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// How the supervised child ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Child exited on its own.
    Exited,
    /// Child was killed by a signal it received from the kernel or elsewhere
    /// (SIGXCPU from the CPU ceiling lands here).
    Signaled,
    /// The supervisor killed the child at the wall-clock deadline.
    Timeout,
    /// The supervisor killed the child for flooding its output pipes.
    OutputLimitExceeded,
}

/// Supervise the child until exit, deadline, or output overflow.
///
/// `stdout_pipe` and `stderr_pipe` are the parent-held read ends; the write
/// ends must already be closed in the parent or EOF never arrives.
pub fn monitor(
    pidfd: OwnedFd,
    stdout_pipe: &OwnedFd,
    stderr_pipe: &OwnedFd,
    plan: &Plan,
) -> io::Result<Output> {
    let start = Instant::now();
    let deadline = plan.deadline_from(start);

    let stdout_fd = stdout_pipe.as_raw_fd();
    let stderr_fd = stderr_pipe.as_raw_fd();
    let pidfd_raw = pidfd.as_raw_fd();

    set_nonblocking(stdout_fd)?;
    set_nonblocking(stderr_fd)?;

    let mut stdout_buf = Vec::new();
    let mut stderr_buf = Vec::new();
    let mut status = Status::Exited;
    let mut exit_code = None;
    let mut signal = None;
    let mut buf = [0u8; 4096];

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            tracing::warn!("wall-clock deadline exceeded; killing child");
            pidfd_send_signal(&pidfd, Signal::KILL).ok();
            status = Status::Timeout;
            wait_for_exit(pidfd_raw)?;
            break;
        }

        // Cap at 100ms so the deadline is checked periodically. The cast is
        // safe since min(100) fits in i32.
        let poll_timeout = remaining.as_millis().min(100) as i32;
        let mut fds = [
            libc::pollfd {
                fd: stdout_fd,
                events: libc::POLLIN,
                revents: 0,
            },
            libc::pollfd {
                fd: stderr_fd,
                events: libc::POLLIN,
                revents: 0,
            },
            libc::pollfd {
                fd: pidfd_raw,
                events: libc::POLLIN,
                revents: 0,
            },
        ];

        let ret = unsafe { libc::poll(fds.as_mut_ptr(), 3, poll_timeout) };
        if ret < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }

        if fds[0].revents & libc::POLLIN != 0 {
            if let Ok(n) = read_nonblocking(stdout_fd, &mut buf) {
                if n > 0 {
                    if stdout_buf.len() + n > plan.max_output as usize {
                        status = Status::OutputLimitExceeded;
                        pidfd_send_signal(&pidfd, Signal::KILL).ok();
                        wait_for_exit(pidfd_raw)?;
                        break;
                    }
                    stdout_buf.extend_from_slice(&buf[..n]);
                }
            }
        }

        if fds[1].revents & libc::POLLIN != 0 {
            if let Ok(n) = read_nonblocking(stderr_fd, &mut buf) {
                if n > 0 {
                    if stderr_buf.len() + n > plan.max_output as usize {
                        status = Status::OutputLimitExceeded;
                        pidfd_send_signal(&pidfd, Signal::KILL).ok();
                        wait_for_exit(pidfd_raw)?;
                        break;
                    }
                    stderr_buf.extend_from_slice(&buf[..n]);
                }
            }
        }

        if fds[2].revents & libc::POLLIN != 0 {
            let (ec, sig) = wait_for_exit(pidfd_raw)?;
            exit_code = ec;
            signal = sig;
            if sig.is_some() {
                status = Status::Signaled;
            }
            break;
        }

        if (fds[0].revents & libc::POLLHUP != 0) && (fds[1].revents & libc::POLLHUP != 0) {
            let (ec, sig) = wait_for_exit(pidfd_raw)?;
            exit_code = ec;
            signal = sig;
            if sig.is_some() {
                status = Status::Signaled;
            }
            break;
        }
    }

    drain_remaining(stdout_fd, &mut stdout_buf, &mut buf, plan.max_output);
    drain_remaining(stderr_fd, &mut stderr_buf, &mut buf, plan.max_output);

    Ok(Output {
        stdout: stdout_buf,
        stderr: stderr_buf,
        status,
        duration: start.elapsed(),
        exit_code,
        signal,
    })
}

#[inline]
pub(crate) fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    let ret = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

#[inline]
fn read_nonblocking(fd: RawFd, buf: &mut [u8]) -> io::Result<usize> {
    let ret = unsafe { libc::read(fd, buf.as_mut_ptr().cast::<libc::c_void>(), buf.len()) };
    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret as usize)
    }
}

fn drain_remaining(fd: RawFd, output: &mut Vec<u8>, buf: &mut [u8], max_output: u64) {
    let max = max_output as usize;
    loop {
        if output.len() >= max {
            break;
        }
        match read_nonblocking(fd, buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let remaining = max.saturating_sub(output.len());
                let to_add = n.min(remaining);
                output.extend_from_slice(&buf[..to_add]);
            }
        }
    }
}

pub(crate) fn wait_for_exit(pidfd: RawFd) -> io::Result<(Option<i32>, Option<i32>)> {
    let mut siginfo: libc::siginfo_t = unsafe { std::mem::zeroed() };
    let ret = unsafe {
        libc::waitid(
            libc::P_PIDFD,
            pidfd as libc::id_t,
            &mut siginfo,
            libc::WEXITED,
        )
    };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }

    let code = siginfo.si_code;
    let status = unsafe { siginfo.si_status() };

    match code {
        libc::CLD_EXITED => Ok((Some(status), None)),
        libc::CLD_KILLED | libc::CLD_DUMPED => Ok((None, Some(status))),
        _ => Ok((None, None)),
    }
}
