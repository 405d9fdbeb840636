use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use structa_core::types::Message;
use structa_providers::{CompletionConfig, CompletionProvider};

/// Scripted completion provider: replays responses in order, repeating the
/// last one forever, and records every request it receives.
pub struct ScriptedProvider {
    responses: Mutex<Vec<String>>,
    pub requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedProvider {
    pub fn new(responses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(
        &self,
        _model: &str,
        messages: &[Message],
        _config: &CompletionConfig,
    ) -> anyhow::Result<String> {
        self.requests.lock().unwrap().push(messages.to_vec());
        let mut responses = self.responses.lock().unwrap();
        match responses.len() {
            0 => anyhow::bail!("script is empty"),
            1 => Ok(responses[0].clone()),
            _ => Ok(responses.remove(0)),
        }
    }

    fn display_name(&self) -> &str {
        "Scripted"
    }
}

pub fn finish(answer: &str) -> String {
    serde_json::json!({
        "thought": "I have the answer.",
        "function": "finish_conversation",
        "arguments": {"final_answer": answer},
    })
    .to_string()
}
