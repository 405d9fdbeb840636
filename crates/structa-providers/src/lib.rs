//! Completion provider layer for Structa.
//!
//! - [`traits::CompletionProvider`] — the trait the agent calls
//! - [`registry`] — static specs for the supported backends + model matching
//! - [`http_provider::HttpProvider`] — OpenAI-compatible HTTP client
//! - [`http_provider::create_provider`] — builder from model name + config

pub mod http_provider;
pub mod registry;
pub mod traits;

pub use http_provider::{create_provider, HttpProvider};
pub use registry::{ProviderConfig, ProviderSpec, PROVIDERS};
pub use traits::{CompletionConfig, CompletionProvider};
