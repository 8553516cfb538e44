//! Append-only per-source JSONL record log (spec.md §6:
//! `output/decisions/{court_code}.jsonl`), the `DecisionSink` the extractor
//! driver writes to.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use caselaw_core::Decision;
use caselaw_extract::DecisionSink;

pub struct JsonlRecordLog {
    writer: BufWriter<File>,
}

impl JsonlRecordLog {
    pub fn open_append(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl DecisionSink for JsonlRecordLog {
    fn write(&mut self, decision: &Decision) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, decision)
            .map_err(std::io::Error::other)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

/// Read every well-formed `Decision` line from a record-log file, skipping
/// blank lines and logging (but not raising on) malformed ones, per
/// spec.md §6: "tolerant of blank lines and logs but skips malformed lines".
pub fn read_decisions(path: impl AsRef<Path>) -> std::io::Result<Vec<Decision>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)?;
    let mut decisions = Vec::new();
    for (lineno, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Decision>(line) {
            Ok(decision) => decisions.push(decision),
            Err(err) => {
                tracing::warn!(path = %path.display(), line = lineno + 1, error = %err, "skipping malformed record-log line");
            }
        }
    }
    Ok(decisions)
}
