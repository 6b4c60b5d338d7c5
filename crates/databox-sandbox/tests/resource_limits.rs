//! Kernel-enforced limit tests.
//!
//! These exercise the real rlimit/deadline machinery with /bin/sh, so they
//! run anywhere the crate itself runs.

use std::time::{Duration, Instant};

use databox_sandbox::{Executor, Plan, Status};

#[test]
fn cpu_ceiling_kills_busy_loop() {
    let plan = Plan::new(["/bin/sh", "-c", "while :; do :; done"])
        .cpu_seconds(1)
        .wall_timeout(Duration::from_secs(10));

    let start = Instant::now();
    let output = Executor::run(plan).unwrap();

    assert_eq!(output.status, Status::Signaled);
    assert_eq!(output.signal, Some(libc::SIGXCPU));
    // Killed by the CPU clock, well before the wall deadline.
    assert!(start.elapsed() < Duration::from_secs(8));
}

#[test]
fn wall_deadline_is_independent_of_cpu() {
    // Sleeping consumes no CPU; only the wall deadline can stop it.
    let plan = Plan::new(["/bin/sh", "-c", "sleep 60"])
        .cpu_seconds(5)
        .wall_timeout(Duration::from_millis(500))
        .kill_grace(Duration::from_millis(100));

    let start = Instant::now();
    let output = Executor::run(plan).unwrap();

    assert_eq!(output.status, Status::Timeout);
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn limits_do_not_leak_into_the_supervisor() {
    let plan = Plan::new(["/bin/true"]).cpu_seconds(1);
    Executor::run(plan).unwrap();

    // The supervisor's own CPU limit is untouched by the child's.
    let mut rlim = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    assert_eq!(unsafe { libc::getrlimit(libc::RLIMIT_CPU, &mut rlim) }, 0);
    assert_ne!(rlim.rlim_cur, 1);
}
