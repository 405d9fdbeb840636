//! Conversation history persistence — JSONL files, one per session key.
//!
//! # Disk format (JSONL)
//!
//! Each history is a `.jsonl` file under `~/.structa/history/`.
//! - Line 1: metadata `{"_type": "metadata", "created_at": "...", "updated_at": "...", "message_count": N}`
//! - Lines 2+: messages `{"role": "user", "content": "hello"}`

pub mod store;

pub use store::{HistoryStore, HistorySummary};
