//! Lexical security pre-filter.
//!
//! Scans the raw script for denylisted substrings (case-insensitive) before
//! anything executes. First match wins and the script is rejected outright.
//! The check is purely lexical - no parsing - and is trivially bypassable by
//! a determined adversary; it exists to stop accidental or naive misuse. The
//! real containment is the capability environment and the per-process
//! resource ceilings.
//!
//! Also hosts the markdown fence stripper: generators tend to wrap code in
//! ```` ```python ```` blocks, and the fence is not part of the script.

use std::sync::LazyLock;

use regex::Regex;

/// Forbidden substrings: import syntax, dunder access, dynamic
/// evaluation/compilation, filesystem/process/network primitives, and
/// reflection primitives.
pub const DEFAULT_DENYLIST: &[&str] = &[
    "import ",
    "__",
    "exec(",
    "eval(",
    "compile(",
    "open(",
    "input(",
    "os.",
    "sys.",
    "subprocess",
    "shutil",
    "socket",
    "requests",
    "http",
    "urllib",
    "ftplib",
    "pickle",
    "dill",
    "ctypes",
    "cffi",
    "multiprocessing",
    "thread",
    "fork",
    "builtins",
    "globals(",
    "locals(",
    "getattr(",
    "setattr(",
    "delattr(",
    "memoryview",
];

/// A denylist hit. Produced only by [`scan`], always before execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// The matched denylist token.
    pub token: String,
    /// Caller-facing rejection message.
    pub message: String,
}

impl Violation {
    fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
            message: format!("Use of '{}' is not allowed in the sandbox.", token.trim()),
        }
    }
}

/// Scan a script against the denylist. Returns the first hit, if any.
pub fn scan(code: &str, denylist: &[String]) -> Option<Violation> {
    let lower = code.to_lowercase();
    for token in denylist {
        if lower.contains(&token.to_lowercase()) {
            return Some(Violation::new(token));
        }
    }
    None
}

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?si)```(?:python)?\n(.*?)```").unwrap());

/// Strip a markdown code fence if present; otherwise return the trimmed text.
pub fn extract_code(text: &str) -> String {
    if let Some(caps) = FENCE_RE.captures(text) {
        return caps[1].trim().to_string();
    }
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn denylist() -> Vec<String> {
        DEFAULT_DENYLIST.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn clean_code_passes() {
        assert_eq!(scan("out_df = df.groupby('x').sum()", &denylist()), None);
    }

    #[test]
    fn import_is_rejected() {
        let violation = scan("import os\nprint(1)", &denylist()).unwrap();
        assert_eq!(violation.token, "import ");
        assert!(violation.message.contains("not allowed"));
    }

    #[test]
    fn match_is_case_insensitive() {
        let violation = scan("IMPORT os", &denylist()).unwrap();
        assert_eq!(violation.token, "import ");
    }

    #[test]
    fn dunder_is_rejected() {
        assert!(scan("df.__class__", &denylist()).is_some());
    }

    #[test]
    fn eval_is_rejected_anywhere() {
        assert!(scan("x = eval('1+1')", &denylist()).is_some());
        assert!(scan("eval('1+1')", &denylist()).is_some());
    }

    #[test]
    fn first_match_wins() {
        let violation = scan("import socket", &denylist()).unwrap();
        assert_eq!(violation.token, "import ");
    }

    #[test]
    fn extract_python_fence() {
        let text = "Here you go:\n```python\nout_df = df.head()\n```\nEnjoy!";
        assert_eq!(extract_code(text), "out_df = df.head()");
    }

    #[test]
    fn extract_bare_fence() {
        let text = "```\nprint(1)\n```";
        assert_eq!(extract_code(text), "print(1)");
    }

    #[test]
    fn extract_without_fence_trims() {
        assert_eq!(extract_code("  print(1)\n"), "print(1)");
    }

    #[test]
    fn extract_empty() {
        assert_eq!(extract_code(""), "");
    }
}
