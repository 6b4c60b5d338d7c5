//! Harness report parsing and table re-validation.
//!
//! The harness leaves `report.json` in the scratch directory. This module
//! turns it into typed data and re-enforces the row cap on the way in - the
//! harness is the first line, but the supervisor does not trust a child
//! artifact to have honored it.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::Error;
use crate::harness::ROW_CAP;

/// One result-table row: column name → JSON value.
pub type Row = Map<String, Value>;

/// Outcome the harness recorded for the script itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptStatus {
    Completed,
    Timeout,
    Error,
}

/// Classified script failure, as recorded by the harness.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptError {
    pub kind: ScriptErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptErrorKind {
    Timeout,
    Memory,
    Exception,
}

/// The harness report, as written to `report.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct Report {
    pub status: ScriptStatus,
    pub error: Option<ScriptError>,
    pub table: Option<Vec<Row>>,
    pub columns: Option<Vec<String>>,
    #[serde(default)]
    pub figures: u32,
}

/// Read and parse the report left by the harness.
pub fn read_report(path: &Path) -> Result<Report, Error> {
    let raw = fs::read_to_string(path).map_err(|_| Error::MissingReport)?;
    let mut report: Report =
        serde_json::from_str(&raw).map_err(|e| Error::MalformedReport(e.to_string()))?;

    if let Some(table) = report.table.as_mut() {
        if table.len() > ROW_CAP {
            table.truncate(ROW_CAP);
        }
    }
    // A table without a column list (or vice versa) is not a usable output.
    if report.table.is_none() || report.columns.is_none() {
        report.table = None;
        report.columns = None;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_report(json: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        fs::write(&path, json).unwrap();
        (dir, path)
    }

    #[test]
    fn parse_completed_report() {
        let (_dir, path) = write_report(
            r#"{"status":"completed","error":null,
                "table":[{"x":1,"y":"a"}],"columns":["x","y"],"figures":2}"#,
        );
        let report = read_report(&path).unwrap();
        assert_eq!(report.status, ScriptStatus::Completed);
        assert_eq!(report.figures, 2);
        assert_eq!(report.columns.as_deref(), Some(&["x".into(), "y".into()][..]));
        assert_eq!(report.table.unwrap().len(), 1);
    }

    #[test]
    fn parse_error_report() {
        let (_dir, path) = write_report(
            r#"{"status":"error",
                "error":{"kind":"exception","message":"ZeroDivisionError: division by zero"},
                "table":null,"columns":null,"figures":0}"#,
        );
        let report = read_report(&path).unwrap();
        assert_eq!(report.status, ScriptStatus::Error);
        let err = report.error.unwrap();
        assert_eq!(err.kind, ScriptErrorKind::Exception);
        assert!(err.message.contains("ZeroDivisionError"));
    }

    #[test]
    fn oversized_table_is_truncated() {
        let rows: Vec<String> = (0..ROW_CAP + 50).map(|i| format!(r#"{{"n":{i}}}"#)).collect();
        let json = format!(
            r#"{{"status":"completed","error":null,"table":[{}],"columns":["n"],"figures":0}}"#,
            rows.join(",")
        );
        let (_dir, path) = write_report(&json);
        let report = read_report(&path).unwrap();
        assert_eq!(report.table.unwrap().len(), ROW_CAP);
    }

    #[test]
    fn table_without_columns_is_dropped() {
        let (_dir, path) = write_report(
            r#"{"status":"completed","error":null,"table":[{"x":1}],"columns":null,"figures":0}"#,
        );
        let report = read_report(&path).unwrap();
        assert!(report.table.is_none());
        assert!(report.columns.is_none());
    }

    #[test]
    fn missing_report_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = read_report(&dir.path().join("report.json")).unwrap_err();
        assert!(matches!(err, Error::MissingReport));
    }

    #[test]
    fn malformed_report() {
        let (_dir, path) = write_report("{not json");
        let err = read_report(&path).unwrap_err();
        assert!(matches!(err, Error::MalformedReport(_)));
    }
}
