//! Request-scoped scratch directory.
//!
//! Each execution gets a fresh temp directory holding everything the child
//! touches, deleted when the request is done:
//!
//! ```text
//! databox-<rand>/
//!   runner.py     generated interpreter harness
//!   script.py     the untrusted script
//!   report.json   written by the harness after execution
//!   charts/       rasterized figures, fig_0001.png ... in creation order
//!   .mplconfig/   matplotlib cache, kept out of $HOME
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

pub const RUNNER_FILE: &str = "runner.py";
pub const SCRIPT_FILE: &str = "script.py";
pub const REPORT_FILE: &str = "report.json";
pub const CHARTS_DIR: &str = "charts";
pub const MPL_DIR: &str = ".mplconfig";

/// One request's scratch space. Dropping it deletes everything.
#[derive(Debug)]
pub struct Scratch {
    root: PathBuf,
    _tempdir: TempDir,
}

impl Scratch {
    pub fn new() -> io::Result<Self> {
        let tempdir = TempDir::with_prefix("databox-")?;
        let scratch = Self {
            root: tempdir.path().to_path_buf(),
            _tempdir: tempdir,
        };
        scratch.create_dir(CHARTS_DIR)?;
        scratch.create_dir(MPL_DIR)?;
        Ok(scratch)
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn write_file(&self, name: &str, content: &str) -> io::Result<PathBuf> {
        let full = self.root.join(name);
        fs::write(&full, content)?;
        Ok(full)
    }

    pub fn create_dir(&self, name: &str) -> io::Result<PathBuf> {
        let full = self.root.join(name);
        fs::create_dir_all(&full)?;
        Ok(full)
    }

    pub fn runner_path(&self) -> PathBuf {
        self.root.join(RUNNER_FILE)
    }

    pub fn script_path(&self) -> PathBuf {
        self.root.join(SCRIPT_FILE)
    }

    pub fn report_path(&self) -> PathBuf {
        self.root.join(REPORT_FILE)
    }

    pub fn charts_dir(&self) -> PathBuf {
        self.root.join(CHARTS_DIR)
    }

    pub fn mpl_dir(&self) -> PathBuf {
        self.root.join(MPL_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_creation() {
        let scratch = Scratch::new().unwrap();
        assert!(scratch.root().exists());
        assert!(scratch.charts_dir().exists());
        assert!(scratch.mpl_dir().exists());
    }

    #[test]
    fn scratch_write_file() {
        let scratch = Scratch::new().unwrap();
        let path = scratch.write_file(SCRIPT_FILE, "print(1)\n").unwrap();
        assert!(path.exists());
        assert_eq!(std::fs::read_to_string(path).unwrap(), "print(1)\n");
    }

    #[test]
    fn scratch_cleanup_on_drop() {
        let root = {
            let scratch = Scratch::new().unwrap();
            scratch.root().to_path_buf()
        };
        assert!(!root.exists());
    }
}
