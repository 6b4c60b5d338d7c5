//! Execution orchestration.
//!
//! [`Sandbox::execute`] drives one request through the full pipeline:
//! filter → prepare → run → classify → extract → collect → assemble. It
//! never returns an error - every fault inside the boundary, from a denylist
//! hit to a malformed harness report, becomes a structured `ok=false` result.

use std::path::Path;
use std::time::Duration;

use databox_sandbox::{Executor, Plan, Status};
use uuid::Uuid;

use crate::charts;
use crate::config::Config;
use crate::detect;
use crate::error::Error;
use crate::extract::{self, ScriptStatus};
use crate::filter;
use crate::harness;
use crate::result::{ExecutionRequest, ExecutionResult};
use crate::scratch::{Scratch, RUNNER_FILE, SCRIPT_FILE};

/// Extra wall time granted to the supervisor past the script's own budget,
/// so the in-process alarm can produce a clean report (including slot
/// extraction and figure rasterization) before the authoritative SIGKILL.
const KILL_GRACE: Duration = Duration::from_secs(2);

/// The execution sandbox. Holds configuration only - all per-request state
/// lives in a request-scoped scratch directory and a dedicated child process,
/// so concurrent `execute` calls share nothing but the chart storage root.
#[derive(Debug, Clone)]
pub struct Sandbox {
    config: Config,
}

impl Sandbox {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Execute one untrusted script against its dataset.
    ///
    /// Blocks until the script completes, times out, or is killed. Always
    /// returns a well-formed result; nothing propagates out of the sandbox.
    pub fn execute(&self, request: &ExecutionRequest) -> ExecutionResult {
        let code = filter::extract_code(&request.code);

        if let Some(violation) = filter::scan(&code, &self.config.denylist) {
            tracing::info!(token = %violation.token.trim(), "script rejected by security filter");
            return ExecutionResult::rejected(&violation);
        }

        let request_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("execute", request_id = %request_id);
        let _guard = span.enter();

        match self.run_supervised(&code, &request.dataset_path, &request_id) {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "execution failed inside the sandbox boundary");
                ExecutionResult::fault(e.to_string())
            }
        }
    }

    fn run_supervised(
        &self,
        code: &str,
        dataset_path: &Path,
        request_id: &str,
    ) -> Result<ExecutionResult, Error> {
        if !dataset_path.is_file() {
            return Err(Error::DatasetNotFound(dataset_path.to_path_buf()));
        }

        let python = detect::resolve_python(self.config.python.as_deref())
            .ok_or(Error::RuntimeNotFound)?;

        let limits = self.config.limits;
        let scratch = Scratch::new()?;
        scratch.write_file(SCRIPT_FILE, code)?;
        scratch.write_file(
            RUNNER_FILE,
            &harness::render(limits.wall_seconds, &self.config.output_slots),
        )?;

        // Rebuilding the matplotlib font cache on every request would eat the
        // wall budget, so it lives next to the chart storage. Writes are
        // atomic-rename on matplotlib's side, safe across invocations.
        let mpl_cache = self.config.storage_root.join(".mplcache");
        let mpl_dir = match std::fs::create_dir_all(&mpl_cache) {
            Ok(()) => mpl_cache,
            Err(_) => scratch.mpl_dir(),
        };

        let plan = Plan::new([
            python.to_string_lossy().into_owned(),
            "-I".to_string(),
            scratch.runner_path().to_string_lossy().into_owned(),
            dataset_path.to_string_lossy().into_owned(),
            scratch.script_path().to_string_lossy().into_owned(),
            scratch.report_path().to_string_lossy().into_owned(),
            scratch.charts_dir().to_string_lossy().into_owned(),
        ])
        .cwd(scratch.root().to_string_lossy().into_owned())
        .wall_timeout(Duration::from_secs(limits.wall_seconds))
        .kill_grace(KILL_GRACE)
        .cpu_seconds(limits.cpu_seconds)
        .memory_bytes(Some(limits.memory_bytes))
        .max_output(self.config.max_output_bytes)
        .envs([
            ("PATH", "/usr/local/bin:/usr/bin:/bin".to_string()),
            ("HOME", scratch.root().to_string_lossy().into_owned()),
            ("LANG", "C.UTF-8".to_string()),
            ("LC_ALL", "C.UTF-8".to_string()),
            ("MPLBACKEND", "Agg".to_string()),
            ("MPLCONFIGDIR", mpl_dir.to_string_lossy().into_owned()),
        ]);

        let output = Executor::run(plan)?;
        let stdout = output.stdout_str();
        let stderr = output.stderr_str();

        match output.status {
            Status::Timeout => {
                // The authoritative kill: the child ignored (or never reached)
                // its in-process alarm, so there is no report to extract.
                Ok(ExecutionResult::failure(
                    time_limit_message(limits.wall_seconds),
                    stdout,
                    stderr,
                ))
            }
            Status::OutputLimitExceeded => Ok(ExecutionResult::failure(
                "Execution produced too much console output and was stopped",
                stdout,
                stderr,
            )),
            Status::Signaled => Ok(ExecutionResult::failure(
                describe_signal(output.signal, limits.cpu_seconds),
                stdout,
                stderr,
            )),
            Status::Exited => self.assemble(&scratch, request_id, output.exit_code, stdout, stderr),
        }
    }

    fn assemble(
        &self,
        scratch: &Scratch,
        request_id: &str,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    ) -> Result<ExecutionResult, Error> {
        let report = match extract::read_report(&scratch.report_path()) {
            Ok(report) => report,
            Err(_) if exit_code != Some(0) => {
                // The harness itself died before reporting (missing pandas,
                // broken interpreter). Console output carries the detail.
                return Ok(ExecutionResult::failure(
                    format!(
                        "analysis runtime failed (exit code {})",
                        exit_code.unwrap_or(-1)
                    ),
                    stdout,
                    stderr,
                ));
            }
            Err(e) => return Err(e),
        };

        let chart_urls = charts::collect(
            &scratch.charts_dir(),
            &self.config.storage_root,
            &self.config.chart_url_prefix,
            request_id,
        );
        if chart_urls.len() != report.figures as usize {
            tracing::warn!(
                rendered = report.figures,
                persisted = chart_urls.len(),
                "some figures were not persisted"
            );
        }

        let (ok, error) = match report.status {
            ScriptStatus::Completed => (true, None),
            ScriptStatus::Timeout => (
                false,
                Some(time_limit_message(self.config.limits.wall_seconds)),
            ),
            ScriptStatus::Error => {
                let message = report
                    .error
                    .as_ref()
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "script failed".to_string());
                (false, Some(message))
            }
        };

        Ok(ExecutionResult {
            ok,
            stdout,
            stderr,
            table: report.table,
            columns: report.columns,
            chart_urls,
            error,
        })
    }
}

fn time_limit_message(wall_seconds: u64) -> String {
    format!("Execution exceeded the {wall_seconds}-second time limit")
}

fn describe_signal(signal: Option<i32>, cpu_seconds: u64) -> String {
    match signal {
        Some(libc::SIGXCPU) => {
            format!("Execution exceeded the {cpu_seconds}-second CPU time limit")
        }
        Some(libc::SIGKILL) => {
            "Execution was terminated by the resource limits (likely memory)".to_string()
        }
        Some(signal) => format!("Execution was terminated by signal {signal}"),
        None => "Execution was terminated unexpectedly".to_string(),
    }
}
