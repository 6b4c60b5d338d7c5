//! Public request and result types.
//!
//! The result shape is the wire contract with the web layer: always
//! well-formed, JSON-serializable, and carrying enough diagnostic text to
//! explain a rejection, timeout, or exception without internal detail.

use std::path::PathBuf;

use serde::Serialize;

use crate::extract::Row;
use crate::filter::Violation;

/// One execution request: the untrusted script and the dataset it runs over.
/// Created once per caller turn and discarded when the sandbox returns.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub code: String,
    pub dataset_path: PathBuf,
}

/// Structured outcome of one execution.
///
/// `ok` is false whenever a security violation, timeout, resource-limit kill,
/// or unhandled script exception occurred. `table`/`columns` are present only
/// when the script bound a recognized output slot to a dataframe.
/// `chart_urls` holds one entry per figure left open at the end of execution,
/// in creation order.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub ok: bool,
    pub stdout: String,
    pub stderr: String,
    pub table: Option<Vec<Row>>,
    pub columns: Option<Vec<String>>,
    pub chart_urls: Vec<String>,
    pub error: Option<String>,
}

impl ExecutionResult {
    /// Pre-execution rejection by the security filter. The script never ran:
    /// no output, no table, no charts.
    pub fn rejected(violation: &Violation) -> Self {
        Self {
            ok: false,
            stdout: String::new(),
            stderr: String::new(),
            table: None,
            columns: None,
            chart_urls: Vec::new(),
            error: Some(violation.message.clone()),
        }
    }

    /// A failure with whatever console output was captured before it.
    pub fn failure(error: impl Into<String>, stdout: String, stderr: String) -> Self {
        Self {
            ok: false,
            stdout,
            stderr,
            table: None,
            columns: None,
            chart_urls: Vec::new(),
            error: Some(error.into()),
        }
    }

    /// An internal fault surfaced as a structured result.
    pub fn fault(error: impl Into<String>) -> Self {
        Self::failure(error, String::new(), String::new())
    }
}
