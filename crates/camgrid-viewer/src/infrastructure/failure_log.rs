//! Camera failure log.
//!
//! Every failure the viewer reports is appended to a plain text file, one
//! line per failure:
//!
//! ```text
//! 2026-03-14 21:07:55 - rtsp://10.0.0.7/stream1 - stream state: Error
//! ```
//!
//! The file is opened, appended to and closed for each entry so that a crash
//! never loses earlier lines and an operator can `tail -f` it.  Write errors
//! are logged and swallowed: a full disk must not take the camera wall down.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local, TimeZone};
use tracing::warn;

use crate::application::viewer::FailureSink;

/// `strftime` format of the timestamp at the start of each line.
pub const FAILURE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Formats one failure line, without the trailing newline.
pub fn format_failure_line<Tz>(at: &DateTime<Tz>, url: &str, reason: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("{} - {url} - {reason}", at.format(FAILURE_TIMESTAMP_FORMAT))
}

/// Appends failures to a text file, timestamped in local time.
#[derive(Debug, Clone)]
pub struct FileFailureLog {
    path: PathBuf,
}

impl FileFailureLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")
    }
}

impl FailureSink for FileFailureLog {
    fn record(&mut self, url: &str, reason: &str) {
        let line = format_failure_line(&Local::now(), url, reason);
        if let Err(e) = self.append(&line) {
            warn!(path = %self.path.display(), error = %e, "cannot write failure log");
        }
    }
}

/// One failure kept by [`MemoryFailureLog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub url: String,
    pub reason: String,
}

/// Keeps failures in memory.  Clones share the same list.
#[derive(Debug, Clone, Default)]
pub struct MemoryFailureLog {
    entries: Arc<Mutex<Vec<FailureRecord>>>,
}

impl MemoryFailureLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<FailureRecord> {
        self.entries.lock().expect("lock poisoned").clone()
    }
}

impl FailureSink for MemoryFailureLog {
    fn record(&mut self, url: &str, reason: &str) {
        self.entries
            .lock()
            .expect("lock poisoned")
            .push(FailureRecord {
                url: url.to_string(),
                reason: reason.to_string(),
            });
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
