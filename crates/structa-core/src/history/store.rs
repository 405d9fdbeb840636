//! History persistence for hosts.
//!
//! File format: JSONL in `~/.structa/history/{safe_key}.jsonl`
//! - Line 1: `{"_type":"metadata","created_at":"...","updated_at":"...","message_count":N}`
//! - Line 2+: `{"role":"user","content":"hello"}`

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::Message;
use crate::utils;

/// Metadata header written as the first line of each JSONL history file.
#[derive(Debug, Serialize, Deserialize)]
struct HistoryMetadata {
    #[serde(rename = "_type")]
    record_type: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    message_count: usize,
}

// ─────────────────────────────────────────────
// HistoryStore
// ─────────────────────────────────────────────

/// Persists conversation message lists, one JSONL file per session key.
///
/// The agent never touches this; the host loads a list before a turn and
/// saves the agent's list after it.
pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    /// Create a history store.
    ///
    /// `dir` defaults to `~/.structa/history/` if `None`.
    /// The directory is created if it doesn't exist.
    pub fn new(dir: Option<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.unwrap_or_else(utils::get_history_path);
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Directory holding the history files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load the message list for `key`. Missing or unreadable files yield an
    /// empty list; malformed lines are skipped.
    pub fn load(&self, key: &str) -> Vec<Message> {
        let path = self.history_path(key);
        if !path.exists() {
            return Vec::new();
        }

        let file = match std::fs::File::open(&path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Failed to open history file {}: {}", path.display(), e);
                return Vec::new();
            }
        };

        let mut messages = Vec::new();
        for line in std::io::BufReader::new(file).lines() {
            let Ok(line) = line else { continue };
            if line.trim().is_empty() {
                continue;
            }
            if serde_json::from_str::<HistoryMetadata>(&line)
                .is_ok_and(|meta| meta.record_type == "metadata")
            {
                continue;
            }
            match serde_json::from_str::<Message>(&line) {
                Ok(msg) => messages.push(msg),
                Err(e) => warn!(key = key, error = %e, "skipping malformed history line"),
            }
        }

        debug!("Loaded history '{}' with {} messages", key, messages.len());
        messages
    }

    /// Overwrite the stored list for `key`, keeping the original creation time.
    pub fn save(&self, key: &str, messages: &[Message]) -> std::io::Result<()> {
        let path = self.history_path(key);
        let created_at = self
            .read_metadata(&path)
            .map(|meta| meta.created_at)
            .unwrap_or_else(Utc::now);

        let mut file = std::fs::File::create(&path)?;
        let meta = HistoryMetadata {
            record_type: "metadata".to_string(),
            created_at,
            updated_at: Utc::now(),
            message_count: messages.len(),
        };
        writeln!(file, "{}", serde_json::to_string(&meta)?)?;
        for msg in messages {
            writeln!(file, "{}", serde_json::to_string(msg)?)?;
        }

        debug!(
            "Saved history '{}' ({} messages) to {}",
            key,
            messages.len(),
            path.display()
        );
        Ok(())
    }

    /// Reset the stored list for `key` to empty.
    pub fn clear(&self, key: &str) -> std::io::Result<()> {
        self.save(key, &[])
    }

    /// Delete the history file. Returns `true` if it existed.
    pub fn delete(&self, key: &str) -> bool {
        let path = self.history_path(key);
        if !path.exists() {
            return false;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!("Deleted history file: {}", path.display());
                true
            }
            Err(e) => {
                warn!("Failed to delete history file: {}", e);
                false
            }
        }
    }

    /// List stored histories, most recently updated first.
    pub fn list(&self) -> Vec<HistorySummary> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to read history directory: {}", e);
                return Vec::new();
            }
        };

        let mut summaries: Vec<HistorySummary> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "jsonl"))
            .filter_map(|path| {
                let meta = self.read_metadata(&path)?;
                let key = path.file_stem()?.to_str()?.replace('_', ":");
                Some(HistorySummary {
                    key,
                    created_at: meta.created_at,
                    updated_at: meta.updated_at,
                    message_count: meta.message_count,
                    path,
                })
            })
            .collect();

        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        summaries
    }

    fn history_path(&self, key: &str) -> PathBuf {
        let safe_key = utils::safe_filename(&key.replace(':', "_"));
        self.dir.join(format!("{}.jsonl", safe_key))
    }

    fn read_metadata(&self, path: &Path) -> Option<HistoryMetadata> {
        let file = std::fs::File::open(path).ok()?;
        let line = std::io::BufReader::new(file).lines().next()?.ok()?;
        serde_json::from_str::<HistoryMetadata>(&line)
            .ok()
            .filter(|meta| meta.record_type == "metadata")
    }
}

/// Summary of a stored history for listing purposes.
#[derive(Clone, Debug)]
pub struct HistorySummary {
    /// Session key (e.g. `"cli:default"`).
    pub key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: usize,
    /// Path to the JSONL file.
    pub path: PathBuf,
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
