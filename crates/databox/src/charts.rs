//! Chart artifact collection.
//!
//! The harness leaves rasterized figures as `fig_0001.png`, `fig_0002.png`,
//! ... in the scratch charts directory (creation order). This module persists
//! each one into the shared storage root under a name derived from the
//! request id and a sequence index - never from user input - so concurrent
//! and repeated requests can write to the shared directory append-only,
//! without locking or collisions.
//!
//! Per-figure persistence failures are skipped: one bad artifact does not
//! fail the request, the remaining figures still go out.

use std::fs;
use std::path::Path;

/// Subdirectory of the storage root where chart artifacts live.
pub const CHARTS_SUBDIR: &str = "charts";

/// Persist every figure from `scratch_charts` into the storage root.
/// Returns the reference paths (in creation order) for the figures that made
/// it to storage.
pub fn collect(
    scratch_charts: &Path,
    storage_root: &Path,
    url_prefix: &str,
    request_id: &str,
) -> Vec<String> {
    let mut sources = match list_figures(scratch_charts) {
        Ok(sources) => sources,
        Err(e) => {
            tracing::warn!(error = %e, "cannot enumerate scratch charts");
            return Vec::new();
        }
    };
    sources.sort();

    if sources.is_empty() {
        return Vec::new();
    }

    let dest_dir = storage_root.join(CHARTS_SUBDIR);
    if let Err(e) = fs::create_dir_all(&dest_dir) {
        tracing::warn!(error = %e, dir = %dest_dir.display(), "cannot create chart storage");
        return Vec::new();
    }

    let mut urls = Vec::with_capacity(sources.len());
    for (index, source) in sources.iter().enumerate() {
        let name = format!("{request_id}_{}.png", index + 1);
        let dest = dest_dir.join(&name);
        match fs::copy(source, &dest) {
            Ok(_) => urls.push(format!("{url_prefix}/{name}")),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    source = %source.display(),
                    "skipping chart that failed to persist"
                );
            }
        }
    }
    urls
}

fn list_figures(dir: &Path) -> std::io::Result<Vec<std::path::PathBuf>> {
    let mut sources = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with("fig_") && name.ends_with(".png") {
            sources.push(path);
        }
    }
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fake_figure(dir: &Path, name: &str, content: &[u8]) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn collects_in_creation_order() {
        let scratch = TempDir::new().unwrap();
        let storage = TempDir::new().unwrap();
        // Written out of order on purpose; sequence comes from the names.
        fake_figure(scratch.path(), "fig_0002.png", b"second");
        fake_figure(scratch.path(), "fig_0001.png", b"first");

        let urls = collect(scratch.path(), storage.path(), "/static/charts", "req-1");
        assert_eq!(
            urls,
            vec![
                "/static/charts/req-1_1.png".to_string(),
                "/static/charts/req-1_2.png".to_string(),
            ]
        );
        let first = storage.path().join(CHARTS_SUBDIR).join("req-1_1.png");
        assert_eq!(fs::read(first).unwrap(), b"first");
    }

    #[test]
    fn empty_scratch_yields_no_urls() {
        let scratch = TempDir::new().unwrap();
        let storage = TempDir::new().unwrap();
        let urls = collect(scratch.path(), storage.path(), "/static/charts", "req-2");
        assert!(urls.is_empty());
        // No charts directory is created for nothing.
        assert!(!storage.path().join(CHARTS_SUBDIR).exists());
    }

    #[test]
    fn unrelated_files_are_ignored() {
        let scratch = TempDir::new().unwrap();
        let storage = TempDir::new().unwrap();
        fake_figure(scratch.path(), "fig_0001.png", b"chart");
        fake_figure(scratch.path(), "notes.txt", b"junk");

        let urls = collect(scratch.path(), storage.path(), "/static/charts", "req-3");
        assert_eq!(urls.len(), 1);
    }

    #[test]
    fn distinct_requests_never_collide() {
        let scratch_a = TempDir::new().unwrap();
        let scratch_b = TempDir::new().unwrap();
        let storage = TempDir::new().unwrap();
        fake_figure(scratch_a.path(), "fig_0001.png", b"same-bytes");
        fake_figure(scratch_b.path(), "fig_0001.png", b"same-bytes");

        let a = collect(scratch_a.path(), storage.path(), "/static/charts", "req-a");
        let b = collect(scratch_b.path(), storage.path(), "/static/charts", "req-b");
        assert_ne!(a[0], b[0]);

        let dir = storage.path().join(CHARTS_SUBDIR);
        assert_eq!(fs::read_dir(dir).unwrap().count(), 2);
    }

    #[test]
    fn missing_scratch_dir_is_nonfatal() {
        let storage = TempDir::new().unwrap();
        let urls = collect(
            Path::new("/nonexistent/charts"),
            storage.path(),
            "/static/charts",
            "req-4",
        );
        assert!(urls.is_empty());
    }
}
