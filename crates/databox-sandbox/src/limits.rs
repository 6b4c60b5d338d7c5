//! Kernel resource ceilings applied in the child before `execve`.
//!
//! | Limit | Purpose | Enforcement |
//! |-------|---------|-------------|
//! | `RLIMIT_CPU` | CPU seconds | hard - kernel delivers SIGXCPU/SIGKILL |
//! | `RLIMIT_AS` | address space | best-effort - some platforms reject it |
//! | `RLIMIT_FSIZE` | file size | fixed generous cap (chart artifacts) |
//! | `RLIMIT_CORE` | core dumps | disabled |
//!
//! The CPU ceiling and the supervisor's wall-clock deadline are independent:
//! a process can burn its CPU budget in under a second of wall time (threads)
//! or idle past the wall deadline without consuming CPU.

use std::io;

use crate::plan::Plan;

/// Largest file the child may create. Generous enough for rasterized charts,
/// small enough to stop a disk-filling loop.
const FSIZE_LIMIT: u64 = 64 * 1024 * 1024;

/// Apply all ceilings from the plan. Runs post-fork, pre-exec.
///
/// `RLIMIT_AS` failures are swallowed: address-space limiting is best-effort
/// and must never fail the request on platforms that reject it.
pub fn apply_rlimits(plan: &Plan) -> io::Result<()> {
    set_rlimit(libc::RLIMIT_CPU, plan.cpu_seconds)?;

    if let Some(bytes) = plan.memory_bytes {
        let _ = set_rlimit(libc::RLIMIT_AS, bytes);
    }

    set_rlimit(libc::RLIMIT_FSIZE, FSIZE_LIMIT)?;
    set_rlimit(libc::RLIMIT_CORE, 0)?;
    Ok(())
}

#[inline]
fn set_rlimit(resource: libc::__rlimit_resource_t, limit: u64) -> io::Result<()> {
    let rlim = libc::rlimit {
        rlim_cur: limit,
        rlim_max: limit,
    };
    // SAFETY: rlim is valid, resource is a valid constant.
    if unsafe { libc::setrlimit(resource, &rlim) } != 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn get_current_cpu_limit() {
        let mut rlim = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        assert_eq!(unsafe { libc::getrlimit(libc::RLIMIT_CPU, &mut rlim) }, 0);
    }
}
