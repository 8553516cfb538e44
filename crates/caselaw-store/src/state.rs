//! Disk-backed state journal (spec.md §3/§6): `state/{court_code}.json`
//! holding `{known_ids: [...]}` plus run metadata, so a driver run can skip
//! decisions already ingested in an earlier run.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use caselaw_extract::StateJournal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Serialize, Deserialize)]
struct JournalFile {
    known_ids: Vec<String>,
    #[serde(default = "Utc::now")]
    last_run_at: DateTime<Utc>,
}

/// `StateJournal` implementation backed by one JSON file per court.
pub struct FileStateJournal {
    path: PathBuf,
    known: HashSet<String>,
}

impl FileStateJournal {
    /// Load `path` if it exists, otherwise start empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let known = if path.exists() {
            let bytes = std::fs::read(&path)?;
            let file: JournalFile = serde_json::from_slice(&bytes)?;
            file.known_ids.into_iter().collect()
        } else {
            HashSet::new()
        };
        Ok(Self { path, known })
    }

    /// Flush the current known-ID set to disk (spec.md §3: "flushed to disk
    /// on run completion").
    pub fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut known_ids: Vec<String> = self.known.iter().cloned().collect();
        known_ids.sort_unstable();
        let file = JournalFile {
            known_ids,
            last_run_at: Utc::now(),
        };
        let bytes = serde_json::to_vec_pretty(&file)?;
        std::fs::write(&self.path, bytes)?;
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.known.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}

impl StateJournal for FileStateJournal {
    fn contains(&self, decision_id: &str) -> bool {
        self.known.contains(decision_id)
    }

    fn add(&mut self, decision_id: &str) {
        self.known.insert(decision_id.to_string());
    }
}

/// Safe on-disk file name for a cookie-cache / state-journal path component.
#[must_use]
pub fn safe_name(court_code: &str) -> String {
    court_code.replace(['/', '\\'], "_")
}

#[must_use]
pub fn journal_path(state_dir: &Path, court_code: &str) -> PathBuf {
    state_dir.join(format!("{}.json", safe_name(court_code)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_known_ids_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = journal_path(dir.path(), "bger");

        let mut journal = FileStateJournal::open(&path).unwrap();
        assert!(journal.is_empty());
        journal.add("bger_1");
        journal.add("bger_2");
        journal.flush().unwrap();

        let reopened = FileStateJournal::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        assert!(reopened.contains("bger_1"));
        assert!(reopened.contains("bger_2"));
        assert!(!reopened.contains("bger_3"));
    }

    #[test]
    fn opening_a_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = journal_path(dir.path(), "unknown_court");
        let journal = FileStateJournal::open(&path).unwrap();
        assert!(journal.is_empty());
    }
}
