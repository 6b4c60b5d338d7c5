//! Environment-driven configuration.
//!
//! Every knob has a default matching the production deployment; environment
//! variables override individually. Malformed values are logged and ignored
//! rather than failing startup.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `DATABOX_CPU_SECONDS` | 5 |
//! | `DATABOX_MEMORY_BYTES` | 536870912 (512 MiB) |
//! | `DATABOX_WALL_SECONDS` | 5 |
//! | `DATABOX_MAX_OUTPUT_BYTES` | 16777216 (16 MiB) |
//! | `DATABOX_DENYLIST` | built-in token set (comma-separated override) |
//! | `DATABOX_OUTPUT_SLOTS` | `out_df,result_df,result` |
//! | `DATABOX_STORAGE_ROOT` | `/data` |
//! | `DATABOX_CHART_URL_PREFIX` | `/static/charts` |
//! | `DATABOX_PYTHON` | auto-detected (see [`crate::detect`]) |

use std::env;
use std::path::PathBuf;

use crate::filter;

/// Resource ceilings for one execution. Wall and CPU seconds are independent
/// budgets: a thread-heavy script can exhaust CPU in under a second of wall
/// time, an idle one can sit at the wall deadline without consuming CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub cpu_seconds: u64,
    pub memory_bytes: u64,
    pub wall_seconds: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            cpu_seconds: 5,
            memory_bytes: 512 * 1024 * 1024,
            wall_seconds: 5,
        }
    }
}

/// Sandbox configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub limits: Limits,
    /// Lexical denylist tokens, matched case-insensitively as substrings.
    pub denylist: Vec<String>,
    /// Output slot names inspected in priority order after execution.
    pub output_slots: Vec<String>,
    /// Shared storage root; chart artifacts land in `<root>/charts`.
    pub storage_root: PathBuf,
    /// Prefix under which the external static-file layer serves charts.
    pub chart_url_prefix: String,
    /// Explicit interpreter path; `None` means auto-detect.
    pub python: Option<PathBuf>,
    /// Combined stdout+stderr capture cap.
    pub max_output_bytes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            denylist: filter::DEFAULT_DENYLIST
                .iter()
                .map(|s| s.to_string())
                .collect(),
            output_slots: vec!["out_df".into(), "result_df".into(), "result".into()],
            storage_root: PathBuf::from("/data"),
            chart_url_prefix: "/static/charts".into(),
            python: None,
            max_output_bytes: 16 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Load configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(v) = parse_u64("DATABOX_CPU_SECONDS") {
            config.limits.cpu_seconds = v;
        }
        if let Some(v) = parse_u64("DATABOX_MEMORY_BYTES") {
            config.limits.memory_bytes = v;
        }
        if let Some(v) = parse_u64("DATABOX_WALL_SECONDS") {
            config.limits.wall_seconds = v;
        }
        if let Some(v) = parse_u64("DATABOX_MAX_OUTPUT_BYTES") {
            config.max_output_bytes = v;
        }
        if let Some(list) = parse_list("DATABOX_DENYLIST") {
            config.denylist = list;
        }
        if let Some(list) = parse_list("DATABOX_OUTPUT_SLOTS") {
            config.output_slots = list;
        }
        if let Ok(root) = env::var("DATABOX_STORAGE_ROOT") {
            if !root.is_empty() {
                config.storage_root = PathBuf::from(root);
            }
        }
        if let Ok(prefix) = env::var("DATABOX_CHART_URL_PREFIX") {
            if !prefix.is_empty() {
                config.chart_url_prefix = prefix.trim_end_matches('/').to_string();
            }
        }
        if let Ok(python) = env::var("DATABOX_PYTHON") {
            if !python.is_empty() {
                config.python = Some(PathBuf::from(python));
            }
        }

        config
    }
}

fn parse_u64(key: &str) -> Option<u64> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable configuration value");
            None
        }
    }
}

fn parse_list(key: &str) -> Option<Vec<String>> {
    let raw = env::var(key).ok()?;
    let items: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.limits.cpu_seconds, 5);
        assert_eq!(config.limits.memory_bytes, 512 * 1024 * 1024);
        assert_eq!(config.limits.wall_seconds, 5);
        assert_eq!(
            config.output_slots,
            vec!["out_df", "result_df", "result"]
        );
        assert_eq!(config.storage_root, PathBuf::from("/data"));
        assert!(config.denylist.iter().any(|t| t == "import "));
    }

    #[test]
    fn env_overrides() {
        env::set_var("DATABOX_WALL_SECONDS", "9");
        env::set_var("DATABOX_OUTPUT_SLOTS", "answer, table_out");
        let config = Config::from_env();
        env::remove_var("DATABOX_WALL_SECONDS");
        env::remove_var("DATABOX_OUTPUT_SLOTS");
        assert_eq!(config.limits.wall_seconds, 9);
        assert_eq!(config.output_slots, vec!["answer", "table_out"]);
    }

    #[test]
    fn bad_number_falls_back() {
        env::set_var("DATABOX_CPU_SECONDS", "not-a-number");
        let config = Config::from_env();
        env::remove_var("DATABOX_CPU_SECONDS");
        assert_eq!(config.limits.cpu_seconds, 5);
    }
}
