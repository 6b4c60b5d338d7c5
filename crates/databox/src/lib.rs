//! databox: sandboxed execution of untrusted analysis scripts.
//!
//! Takes a generated Python analysis script plus a CSV dataset reference,
//! applies a lexical security pre-check, runs the script in a supervised,
//! resource-limited child process with an explicit capability environment
//! (`df`, `pd`, `plt`, pre-declared output slots), and returns one structured
//! [`ExecutionResult`]: console output, an optional result table, and chart
//! artifact references.
//!
//! ## Quick Start
//!
//! ```ignore
//! use databox::{Config, ExecutionRequest, Sandbox};
//!
//! let sandbox = Sandbox::new(Config::from_env());
//! let result = sandbox.execute(&ExecutionRequest {
//!     code: "out_df = df.groupby('city', as_index=False).sum()".into(),
//!     dataset_path: "/data/uploads/abc.csv".into(),
//! });
//! assert!(result.ok);
//! ```
//!
//! ## Pipeline
//!
//! 1. **Filter** - case-insensitive denylist scan; rejected scripts never run
//! 2. **Prepare** - request-scoped scratch dir, generated interpreter runner
//! 3. **Run** - one child process per request, CPU/memory rlimits, wall-clock
//!    deadline (in-process alarm first, supervisor SIGKILL as the authority)
//! 4. **Extract** - pre-declared output slots, first dataframe wins, 200-row cap
//! 5. **Collect** - open figures persisted under request-unique names
//! 6. **Assemble** - every failure folded into an `ok=false` result; nothing
//!    escapes the sandbox boundary
//!
//! ## Failure model
//!
//! [`Sandbox::execute`] is infallible by design: security violations,
//! timeouts, resource-limit kills, script exceptions, and internal faults all
//! come back as a well-formed result with a bounded diagnostic. The denylist
//! is a best-effort guard against naive misuse, not a hardened boundary - the
//! capability environment and the per-process limits do the actual damage
//! control.

pub mod charts;
pub mod config;
pub mod detect;
pub mod error;
pub mod extract;
pub mod filter;
pub mod harness;
pub mod result;
pub mod runner;
pub mod scratch;

pub use config::{Config, Limits};
pub use error::Error;
pub use filter::Violation;
pub use result::{ExecutionRequest, ExecutionResult};
pub use runner::Sandbox;
