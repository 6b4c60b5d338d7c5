//! databox-sandbox: supervised execution of one untrusted child process.
//!
//! This crate owns the process-level half of the sandbox: it forks a child,
//! applies kernel resource ceilings before `execve`, and supervises the child
//! from the parent with a `pidfd` + `poll()` loop that captures stdout/stderr
//! (size-bounded) and enforces a wall-clock deadline with SIGKILL.
//!
//! It deliberately does **not** know anything about scripts, datasets, or
//! charts - the `databox` crate builds the execution environment and hands a
//! fully specified [`Plan`] down here.
//!
//! ## Example
//!
//! ```ignore
//! use databox_sandbox::{Executor, Plan};
//! use std::time::Duration;
//!
//! let plan = Plan::new(["/bin/echo", "hello"])
//!     .wall_timeout(Duration::from_secs(5))
//!     .cpu_seconds(5);
//! let output = Executor::run(plan)?;
//! assert_eq!(output.stdout, b"hello\n");
//! ```
//!
//! ## Guarantees
//!
//! - The child never outlives the deadline by more than the poll granularity.
//! - Limits are armed per invocation inside the child; nothing leaks into the
//!   supervising process or into later invocations.
//! - Captured output is capped at `max_output`; a child that floods its pipes
//!   is killed and reported as [`Status::OutputLimitExceeded`].

pub mod exec;
pub mod limits;
pub mod monitor;
pub mod pipes;
pub mod plan;
pub mod validate;

pub use exec::{ExecError, Executor};
pub use monitor::{Output, Status};
pub use plan::Plan;
pub use validate::ValidationError;
