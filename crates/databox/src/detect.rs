//! Interpreter detection.
//!
//! Resolution order:
//! 1. Explicit configuration (`DATABOX_PYTHON`)
//! 2. `$VIRTUAL_ENV` / `$CONDA_PREFIX`
//! 3. `python3` / `python` on PATH
//! 4. Common fallback locations

use std::path::{Path, PathBuf};

/// Resolve the Python interpreter to run scripts with.
pub fn resolve_python(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.is_absolute() && is_executable(path) {
            return Some(path.to_path_buf());
        }
        return resolve_binary(&path.to_string_lossy(), &[]);
    }

    if let Some(path) = resolve_from_env("VIRTUAL_ENV", "python3") {
        return Some(path);
    }
    if let Some(path) = resolve_from_env("CONDA_PREFIX", "python3") {
        return Some(path);
    }

    for name in ["python3", "python"] {
        if let Some(path) = resolve_binary(name, &[]) {
            return Some(path);
        }
    }

    let fallbacks = [
        "/usr/bin/python3",
        "/usr/local/bin/python3",
        "/opt/python/bin/python3",
    ];
    for fallback in &fallbacks {
        let path = Path::new(fallback);
        if path.exists() && is_executable(path) {
            return Some(path.to_path_buf());
        }
    }

    None
}

/// Resolve a binary name to an absolute path: absolute paths are checked
/// directly, otherwise PATH is searched, then the fallback list.
pub fn resolve_binary(name: &str, fallbacks: &[&str]) -> Option<PathBuf> {
    let path = Path::new(name);

    if path.is_absolute() {
        if path.exists() && is_executable(path) {
            return Some(path.to_path_buf());
        }
        return None;
    }

    if let Ok(path) = which::which(name) {
        return Some(path);
    }

    for fallback in fallbacks {
        let path = Path::new(fallback);
        if path.exists() && is_executable(path) {
            return Some(path.to_path_buf());
        }
    }

    None
}

/// Resolve a binary from an environment variable that names either the
/// binary itself or an installation prefix containing `bin/<name>`.
fn resolve_from_env(env_var: &str, bin_name: &str) -> Option<PathBuf> {
    let value = std::env::var(env_var).ok()?;
    let path = Path::new(&value);

    if path.is_file() && is_executable(path) {
        return Some(path.to_path_buf());
    }

    if path.is_dir() {
        let bin_path = path.join("bin").join(bin_name);
        if bin_path.exists() && is_executable(&bin_path) {
            return Some(bin_path);
        }
    }

    None
}

fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_binary_in_path() {
        let result = resolve_binary("sh", &[]);
        assert!(result.is_some(), "sh should be in PATH");
    }

    #[test]
    fn resolve_binary_absolute_nonexistent() {
        assert!(resolve_binary("/nonexistent/binary", &[]).is_none());
    }

    #[test]
    fn resolve_binary_not_found() {
        assert!(resolve_binary("this_binary_does_not_exist_12345", &[]).is_none());
    }

    #[test]
    fn resolve_binary_with_fallbacks() {
        let Ok(sh) = which::which("sh") else {
            eprintln!("Skipping: sh not found");
            return;
        };
        let result = resolve_binary("nonexistent", &[sh.to_str().unwrap()]);
        assert_eq!(result, Some(sh));
    }

    #[test]
    fn configured_path_wins() {
        let Ok(sh) = which::which("sh") else {
            eprintln!("Skipping: sh not found");
            return;
        };
        let result = resolve_python(Some(&sh));
        assert_eq!(result, Some(sh));
    }

    #[test]
    fn is_executable_nonexistent() {
        assert!(!is_executable(Path::new("/nonexistent")));
    }
}
