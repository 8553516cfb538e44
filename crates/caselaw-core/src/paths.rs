//! Persisted state layout (spec.md §6): `state/`, `output/decisions/`, and
//! the three store files.

use std::path::{Path, PathBuf};

/// Resolves the on-disk layout rooted at `Config::data_dir`.
#[derive(Debug, Clone)]
pub struct PathLayout {
    root: PathBuf,
}

impl PathLayout {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        self.root.join("state")
    }

    /// `state/{court_code}.json` — state journal of already-ingested IDs.
    #[must_use]
    pub fn state_journal(&self, court_code: &str) -> PathBuf {
        self.state_dir().join(format!("{court_code}.json"))
    }

    /// `state/incapsula_{safe_host}.json` — cookie cache.
    #[must_use]
    pub fn cookie_cache(&self, host: &str) -> PathBuf {
        let safe_host = host.replace('.', "_");
        self.state_dir().join(format!("incapsula_{safe_host}.json"))
    }

    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.root.join("output")
    }

    #[must_use]
    pub fn decisions_dir(&self) -> PathBuf {
        self.output_dir().join("decisions")
    }

    /// `output/decisions/{court_code}.jsonl` — append-only record log.
    #[must_use]
    pub fn decisions_log(&self, court_code: &str) -> PathBuf {
        self.decisions_dir().join(format!("{court_code}.jsonl"))
    }

    #[must_use]
    pub fn decisions_db(&self) -> PathBuf {
        self.output_dir().join("decisions.db")
    }

    #[must_use]
    pub fn vectors_db(&self) -> PathBuf {
        self.output_dir().join("vectors.db")
    }

    #[must_use]
    pub fn reference_graph_db(&self) -> PathBuf {
        self.output_dir().join("reference_graph.db")
    }

    /// Ensure `state/` and `output/decisions/` exist.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.state_dir())?;
        std::fs::create_dir_all(self.decisions_dir())
    }
}

/// Compute the `.tmp` sibling path used by every atomic-write-then-rename
/// build (spec.md §3/§4.4/§4.6: "write to `.tmp`, rename on success").
#[must_use]
pub fn tmp_sibling(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| format!(".{}.tmp", n.to_string_lossy()))
        .unwrap_or_else(|| ".tmp".to_string());
    path.with_file_name(file_name)
}

/// Write-to-tmp-then-rename-on-success, deleting the tmp file on any error
/// (spec.md §3/§4.4/§4.6/§7: StoreError leaves existing state untouched).
pub fn atomic_build<F, E>(target: &Path, build: F) -> Result<(), E>
where
    F: FnOnce(&Path) -> Result<(), E>,
    E: From<std::io::Error>,
{
    let tmp = tmp_sibling(target);
    if tmp.exists() {
        let _ = std::fs::remove_file(&tmp);
    }
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    match build(&tmp) {
        Ok(()) => {
            std::fs::rename(&tmp, target)?;
            Ok(())
        }
        Err(e) => {
            let _ = std::fs::remove_file(&tmp);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_build_renames_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.db");
        let result: Result<(), std::io::Error> = atomic_build(&target, |tmp| {
            std::fs::write(tmp, b"data")?;
            Ok(())
        });
        assert!(result.is_ok());
        assert!(target.exists());
        assert!(!tmp_sibling(&target).exists());
    }

    #[test]
    fn atomic_build_removes_tmp_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.db");
        std::fs::write(&target, b"original").unwrap();
        let result: Result<(), std::io::Error> = atomic_build(&target, |tmp| {
            std::fs::write(tmp, b"partial")?;
            Err(std::io::Error::other("boom"))
        });
        assert!(result.is_err());
        assert_eq!(std::fs::read(&target).unwrap(), b"original");
        assert!(!tmp_sibling(&target).exists());
    }
}
