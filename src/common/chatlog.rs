//! Append-only chat log.
//!
//! One line per relayed message: `[YYYY-MM-DD HH:MM:SS] text`, timestamps in UTC.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tracing::warn;

/// Default chat log file name, relative to the working directory.
pub const DEFAULT_CHAT_LOG: &str = "log.txt";

#[derive(Debug)]
pub struct ChatLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl ChatLog {
    /// Open (or create) the log file for appending.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line. Write failures are logged, never returned.
    pub fn append(&self, text: &str) {
        let line = format_line(Utc::now(), text);
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = file.write_all(line.as_bytes()) {
            warn!("Failed to write chat log {}: {}", self.path.display(), e);
        }
    }
}

/// Format a log line for the given instant.
fn format_line(at: DateTime<Utc>, text: &str) -> String {
    format!("[{}] {}\n", at.format("%Y-%m-%d %H:%M:%S"), text)
}
