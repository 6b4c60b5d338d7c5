//! Internal error types.
//!
//! These never cross the sandbox boundary: [`crate::Sandbox::execute`]
//! converts every one of them into an `ok=false` result with a bounded
//! diagnostic.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("python runtime not found (set DATABOX_PYTHON or install python3 with pandas and matplotlib)")]
    RuntimeNotFound,

    #[error("dataset not found: {0}")]
    DatasetNotFound(PathBuf),

    #[error("sandbox: {0}")]
    Sandbox(#[from] databox_sandbox::ExecError),

    #[error("the analysis runtime produced no report")]
    MissingReport,

    #[error("malformed analysis report: {0}")]
    MalformedReport(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
