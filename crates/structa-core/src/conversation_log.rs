//! Conversation log — an append-only audit trail of a conversation.
//!
//! One line per user/assistant message plus short `[ERROR]` / `[SUCCESS]`
//! markers. The agent only ever writes to it; nothing reads it back.
//!
//! [`DailyFileLog`] writes to `<dir>/YYYY-MM-DD.txt`, one file per day.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::utils;

/// An append-only text sink for conversation lines.
pub trait ConversationSink: Send + Sync {
    /// Append a single line. The sink adds the trailing newline.
    fn append_line(&self, line: &str) -> std::io::Result<()>;
}

// ─────────────────────────────────────────────
// DailyFileLog
// ─────────────────────────────────────────────

/// Appends lines to a dated text file inside a log directory.
#[derive(Clone, Debug)]
pub struct DailyFileLog {
    dir: PathBuf,
}

impl DailyFileLog {
    /// Create a log rooted at `dir`. `~` is expanded; the directory is
    /// created lazily on first write.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = utils::expand_home(&dir.as_ref().to_string_lossy());
        Self { dir }
    }

    /// The log directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of today's log file.
    pub fn today_file(&self) -> PathBuf {
        self.dir.join(format!("{}.txt", utils::today_date()))
    }
}

impl ConversationSink for DailyFileLog {
    fn append_line(&self, line: &str) -> std::io::Result<()> {
        if !self.dir.is_dir() {
            std::fs::create_dir_all(&self.dir)?;
            debug!(dir = %self.dir.display(), "created conversation log directory");
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.today_file())?;
        writeln!(file, "{line}")
    }
}

// ─────────────────────────────────────────────
// MemoryLog
// ─────────────────────────────────────────────

/// In-memory sink, handy for hosts that render the log themselves.
#[derive(Debug, Default)]
pub struct MemoryLog {
    lines: Mutex<Vec<String>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every line written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }
}

impl ConversationSink for MemoryLog {
    fn append_line(&self, line: &str) -> std::io::Result<()> {
        let mut lines = self
            .lines
            .lock()
            .map_err(|_| std::io::Error::other("conversation log lock poisoned"))?;
        lines.push(line.to_string());
        Ok(())
    }
}
