//! Append-only flat debug log for the send path.
//!
//! One line per entry, `[<timestamp>]: <message>`, no rotation. Short
//! single-line appends are atomic enough at the filesystem level for the
//! request-scoped writers this service has.

use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone)]
pub struct DebugLog {
    path: PathBuf,
}

impl DebugLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one timestamp-prefixed line. Multi-line payloads (transport
    /// error chatter) are flattened so the log stays one entry per line.
    pub async fn append(&self, message: &str) -> io::Result<()> {
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let line = format!("[{stamp}]: {}\n", message.replace('\n', " "));

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        Ok(())
    }
}
