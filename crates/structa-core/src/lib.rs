//! Structa Core — shared types, conversation store, config, and persistence.
//!
//! This crate contains:
//! - **types**: role-tagged `Message`
//! - **conversation**: the append-only `ConversationStore`
//! - **conversation_log**: append-only audit sinks
//! - **config**: JSON config schema + loader with env overrides
//! - **history**: host-side JSONL persistence of message lists

pub mod config;
pub mod conversation;
pub mod conversation_log;
pub mod history;
pub mod types;
pub mod utils;

pub use conversation::ConversationStore;
pub use conversation_log::{ConversationSink, DailyFileLog, MemoryLog};
pub use history::HistoryStore;
pub use types::{Message, Role};
