//! One persisted conversation. Every turn builds a fresh agent from the
//! stored history and writes the resulting history back.

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde_json::json;
use tracing::{debug, info};

use structa_agent::{Agent, FunctionTool, ParameterSpec, Tool, TurnOutcome, TypeTag};
use structa_core::config::schema::AgentDefaults;
use structa_core::config::Config;
use structa_core::conversation_log::{ConversationSink, DailyFileLog};
use structa_core::history::HistoryStore;
use structa_providers::{create_provider, CompletionProvider, ProviderConfig};

pub struct ChatSession {
    provider: Arc<dyn CompletionProvider>,
    model: String,
    providers: HashMap<String, ProviderConfig>,
    defaults: AgentDefaults,
    tools: ToolSet,
    history: HistoryStore,
    log: Option<Arc<dyn ConversationSink>>,
    key: String,
}

impl ChatSession {
    pub fn from_config(config: &Config, key: &str) -> Result<Self> {
        let model = config.agent.model.clone();
        let providers = config.providers.to_map();
        let provider = create_provider(&model, &providers)?;
        let history = HistoryStore::new(None).context("failed to open history directory")?;
        let log = config
            .log
            .conversation_log_dir
            .as_deref()
            .map(|dir| Arc::new(DailyFileLog::new(dir)) as Arc<dyn ConversationSink>);

        Ok(Self {
            provider: Arc::new(provider),
            model,
            providers,
            defaults: config.agent.clone(),
            tools: ToolSet::new(builtin_tools()),
            history,
            log,
            key: key.to_string(),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Switch the model for later turns. The current model stays when no
    /// configured provider serves `model`.
    pub fn set_model(&mut self, model: &str) -> Result<()> {
        let provider = create_provider(model, &self.providers)?;
        info!(from = %self.model, to = %model, "switching model");
        self.provider = Arc::new(provider);
        self.model = model.to_string();
        Ok(())
    }

    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    pub fn tools_mut(&mut self) -> &mut ToolSet {
        &mut self.tools
    }

    /// Run one user turn and persist the history, even when the turn fails.
    pub async fn send(&self, text: &str) -> Result<TurnOutcome> {
        let mut builder = Agent::builder(Arc::clone(&self.provider), self.model.clone())
            .defaults(&self.defaults)
            .tools(self.tools.enabled())
            .previous_messages(self.history.load(&self.key));
        if let Some(ref log) = self.log {
            builder = builder.conversation_log(Arc::clone(log));
        }
        let mut agent = builder.build();

        let outcome = agent.add_user_message(text).await;
        let messages = agent.into_previous_messages();
        self.history
            .save(&self.key, &messages)
            .with_context(|| format!("failed to save history '{}'", self.key))?;
        debug!(session = %self.key, messages = messages.len(), "history saved");
        outcome
    }

    /// The explicit external reset of the conversation.
    pub fn clear(&self) -> Result<()> {
        self.history
            .clear(&self.key)
            .with_context(|| format!("failed to clear history '{}'", self.key))
    }
}

// ─────────────────────────────────────────────
// ToolSet
// ─────────────────────────────────────────────

/// Host tools available to a session, each switchable on or off.
pub struct ToolSet {
    entries: Vec<(Arc<dyn Tool>, bool)>,
}

impl ToolSet {
    /// All tools start enabled.
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        Self {
            entries: tools.into_iter().map(|tool| (tool, true)).collect(),
        }
    }

    /// Tool names with their enabled flag, in registration order.
    pub fn status(&self) -> Vec<(String, bool)> {
        self.entries
            .iter()
            .map(|(tool, on)| (tool.name().to_string(), *on))
            .collect()
    }

    pub fn enabled(&self) -> Vec<Arc<dyn Tool>> {
        self.entries
            .iter()
            .filter(|(_, on)| *on)
            .map(|(tool, _)| Arc::clone(tool))
            .collect()
    }

    pub fn enable(&mut self, name: &str) -> Result<()> {
        self.toggle(name, true)
    }

    pub fn disable(&mut self, name: &str) -> Result<()> {
        self.toggle(name, false)
    }

    fn toggle(&mut self, name: &str, on: bool) -> Result<()> {
        let Some(entry) = self.entries.iter_mut().find(|(tool, _)| tool.name() == name) else {
            bail!("Tool is not available: {name}");
        };
        match (entry.1, on) {
            (true, true) => bail!("Tool is already active: {name}"),
            (false, false) => bail!("Tool is not active: {name}"),
            _ => entry.1 = on,
        }
        debug!(tool = name, enabled = on, "tool toggled");
        Ok(())
    }
}

/// Tools the CLI host offers besides `finish_conversation`.
pub fn builtin_tools() -> Vec<Arc<dyn Tool>> {
    let now = FunctionTool::new(
        "current_datetime",
        "Get the current local date and time.",
        |args| {
            let format = args
                .get("format")
                .and_then(|v| v.as_str())
                .unwrap_or("%Y-%m-%d %H:%M:%S");
            let mut out = String::new();
            write!(out, "{}", chrono::Local::now().format(format))
                .map_err(|_| anyhow::anyhow!("invalid format string: {format}"))?;
            Ok(json!(out))
        },
    )
    .param(
        ParameterSpec::optional("format", TypeTag::Str, json!("%Y-%m-%d %H:%M:%S"))
            .describe("strftime-style format string"),
    )
    .returns(TypeTag::Str);

    vec![Arc::new(now)]
}
