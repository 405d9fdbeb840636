//! Agent Loop Controller.
//!
//! One [`Agent`] serves one conversation. Each call to
//! [`Agent::add_user_message`] drives the loop
//!
//! ```text
//! request → extract → validate → execute → check termination → request ...
//! ```
//!
//! until `finish_conversation` succeeds or the iteration budget runs out.
//! Every outcome, good or bad, is appended to the conversation as a feedback
//! message; that is the only channel back to the model.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{debug, error, info, warn};

use structa_core::config::schema::AgentDefaults;
use structa_core::conversation::ConversationStore;
use structa_core::conversation_log::ConversationSink;
use structa_core::types::{Message, Role};
use structa_core::utils::truncate_string;
use structa_providers::{CompletionConfig, CompletionProvider};

use crate::error::{CallError, ExtractError};
use crate::executor::ExecutionEngine;
use crate::extract::{AgentDecision, ResponseExtractor};
use crate::prompt::{example_exchange, PromptCompiler};
use crate::schema::SchemaRegistry;
use crate::tools::{FinishConversation, Tool, FINISH_TOOL_NAME};
use crate::validate::validate_call;

/// Default request cycles per user turn.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// Tracing target of the `show_system_prompt` / `show_history` output.
pub const PROMPT_LOG_TARGET: &str = "structa::prompt";

/// Result of one user turn.
#[derive(Clone, Debug, PartialEq)]
pub enum TurnOutcome {
    /// `finish_conversation` was called; holds its result.
    Answer(Value),
    /// The iteration budget ran out without a final answer.
    NoResult,
}

impl TurnOutcome {
    pub fn is_answer(&self) -> bool {
        matches!(self, TurnOutcome::Answer(_))
    }

    /// The answer as display text: strings verbatim, other values as JSON.
    pub fn answer_text(&self) -> Option<String> {
        match self {
            TurnOutcome::Answer(Value::String(s)) => Some(s.clone()),
            TurnOutcome::Answer(other) => Some(other.to_string()),
            TurnOutcome::NoResult => None,
        }
    }
}

// ─────────────────────────────────────────────
// Agent
// ─────────────────────────────────────────────

/// A structured tool-calling agent over a free-text completion provider.
pub struct Agent {
    provider: Arc<dyn CompletionProvider>,
    model: String,
    completion: CompletionConfig,
    registry: SchemaRegistry,
    engine: ExecutionEngine,
    extractor: ResponseExtractor,
    system_message: Message,
    conversation: ConversationStore,
    max_iterations: u32,
    log: Option<Arc<dyn ConversationSink>>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("model", &self.model)
            .field("tools", &self.registry.names())
            .field("messages", &self.conversation.len())
            .field("max_iterations", &self.max_iterations)
            .finish()
    }
}

impl Agent {
    pub fn builder(provider: Arc<dyn CompletionProvider>, model: impl Into<String>) -> AgentBuilder {
        AgentBuilder::new(provider, model)
    }

    /// The compiled system message. Fixed for the agent's lifetime.
    pub fn system_message(&self) -> &Message {
        &self.system_message
    }

    /// Full request list: system message, example exchange, then history.
    pub fn messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.conversation.len() + 3);
        messages.push(self.system_message.clone());
        messages.extend(example_exchange());
        messages.extend_from_slice(self.conversation.messages());
        messages
    }

    /// Conversation history without the system message or example exchange.
    pub fn previous_messages(&self) -> &[Message] {
        self.conversation.messages()
    }

    /// Hand the history back to the host for persistence.
    pub fn into_previous_messages(self) -> Vec<Message> {
        self.conversation.into_messages()
    }

    /// Registered tool names, `finish_conversation` included.
    pub fn tool_names(&self) -> Vec<String> {
        self.registry.names()
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Submit a user message and drive the loop to an answer or budget exhaustion.
    ///
    /// Model mistakes never surface here; they are fed back as feedback
    /// messages. Only completion transport failures return `Err`, and
    /// whatever was already appended for the turn stays in the history.
    pub async fn add_user_message(&mut self, content: impl Into<String>) -> anyhow::Result<TurnOutcome> {
        let user_message = content.into();
        self.append(Role::User, user_message.clone());
        self.log_line(&format!("User: {user_message}"));

        for iteration in 1..=self.max_iterations {
            debug!(iteration, max = self.max_iterations, "requesting completion");

            let raw = self
                .provider
                .complete(&self.model, &self.messages(), &self.completion)
                .await
                .map_err(|e| {
                    error!(iteration, error = %e, "completion failed");
                    e
                })?;

            let decision = match self.extractor.extract(&raw, &user_message).await {
                Ok(decision) => decision,
                Err(ExtractError::Transport(e)) => {
                    error!(iteration, error = %e, "fixer completion failed");
                    self.append_assistant(raw);
                    return Err(e);
                }
                Err(ExtractError::Malformed(malformed)) => {
                    warn!(
                        iteration,
                        error = %malformed,
                        preview = %truncate_string(&raw, 120),
                        "unparseable response"
                    );
                    self.append_assistant(raw);
                    self.feedback(json!({
                        "type": "format_error",
                        "details": "Assistant response is unparseable.",
                        "error": malformed.to_payload(),
                        "original_user_message": user_message,
                    }));
                    self.log_line("[ERROR] Invalid message");
                    continue;
                }
            };

            self.append_assistant(decision.to_json_string());
            debug!(
                iteration,
                function = %decision.function,
                thought = %decision.thought,
                "decision extracted"
            );

            let AgentDecision {
                function,
                arguments,
                ..
            } = decision;

            match self.call(&function, arguments.clone()).await {
                Ok(result) => {
                    self.log_line(&format!("[SUCCESS] {}", display_value(&result)));
                    self.feedback(json!({
                        "type": "function_call_ok",
                        "function": function,
                        "arguments": arguments,
                        "result": result,
                        "original_user_message": user_message,
                    }));
                    if function == FINISH_TOOL_NAME {
                        info!(iteration, "conversation finished");
                        return Ok(TurnOutcome::Answer(result));
                    }
                }
                Err(call_error) => {
                    warn!(iteration, function = %function, error = %call_error, "function call rejected");
                    self.feedback(json!({
                        "type": "function_call_error",
                        "details": "Assistant function call is incorrect.",
                        "function": function,
                        "arguments": arguments,
                        "error": call_error.to_payload(),
                        "original_user_message": user_message,
                    }));
                    self.log_line("[ERROR] Function call error");
                }
            }
        }

        warn!(
            max_iterations = self.max_iterations,
            "iteration budget exhausted without a final answer"
        );
        Ok(TurnOutcome::NoResult)
    }

    async fn call(&self, function: &str, arguments: Map<String, Value>) -> Result<Value, CallError> {
        let schema = validate_call(&self.registry, function, &arguments)?;
        self.engine.execute(schema, arguments).await
    }

    fn append(&mut self, role: Role, content: String) {
        self.conversation.push(role, content);
    }

    fn append_assistant(&mut self, content: String) {
        self.log_line(&format!("Assistant: {content}"));
        self.append(Role::Assistant, content);
    }

    fn feedback(&mut self, body: Value) {
        self.append(Role::User, body.to_string());
    }

    fn log_line(&self, line: &str) {
        if let Some(ref log) = self.log {
            if let Err(e) = log.append_line(line) {
                warn!(error = %e, "failed to write conversation log");
            }
        }
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ─────────────────────────────────────────────
// AgentBuilder
// ─────────────────────────────────────────────

/// Configures and constructs an [`Agent`].
pub struct AgentBuilder {
    provider: Arc<dyn CompletionProvider>,
    model: String,
    completion: CompletionConfig,
    prompt: PromptCompiler,
    tools: Vec<Arc<dyn Tool>>,
    previous_messages: Vec<Message>,
    max_iterations: u32,
    log: Option<Arc<dyn ConversationSink>>,
    show_system_prompt: bool,
    show_history: bool,
}

impl AgentBuilder {
    pub fn new(provider: Arc<dyn CompletionProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            completion: CompletionConfig::default(),
            prompt: PromptCompiler::default(),
            tools: Vec::new(),
            previous_messages: Vec::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            log: None,
            show_system_prompt: false,
            show_history: false,
        }
    }

    /// Apply loaded config defaults (model is left as given).
    pub fn defaults(mut self, defaults: &AgentDefaults) -> Self {
        self.max_iterations = defaults.max_iterations;
        self.completion.temperature = defaults.temperature;
        self.completion.max_tokens = defaults.max_tokens;
        if let Some(ref persona) = defaults.system_prompt {
            self.prompt.system_prompt = persona.clone();
        }
        if let Some(ref persona) = defaults.fixer_system_prompt {
            self.prompt.fixer_system_prompt = persona.clone();
        }
        self.show_system_prompt = defaults.show_system_prompt;
        self.show_history = defaults.show_history;
        self
    }

    /// Operator persona placed at the top of the system message.
    pub fn system_prompt(mut self, persona: impl Into<String>) -> Self {
        self.prompt.system_prompt = persona.into();
        self
    }

    /// Replace the main system message template.
    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.prompt.template = template.into();
        self
    }

    pub fn fixer_system_prompt(mut self, persona: impl Into<String>) -> Self {
        self.prompt.fixer_system_prompt = persona.into();
        self
    }

    pub fn fixer_template(mut self, template: impl Into<String>) -> Self {
        self.prompt.fixer_template = template.into();
        self
    }

    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn tools(mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    /// History to continue from. System messages in it are dropped.
    pub fn previous_messages(mut self, messages: Vec<Message>) -> Self {
        self.previous_messages = messages;
        self
    }

    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Provider kwargs sent with every completion.
    pub fn completion_config(mut self, config: CompletionConfig) -> Self {
        self.completion = config;
        self
    }

    pub fn conversation_log(mut self, log: Arc<dyn ConversationSink>) -> Self {
        self.log = Some(log);
        self
    }

    pub fn show_system_prompt(mut self, show: bool) -> Self {
        self.show_system_prompt = show;
        self
    }

    pub fn show_history(mut self, show: bool) -> Self {
        self.show_history = show;
        self
    }

    pub fn build(self) -> Agent {
        let mut tools: Vec<Arc<dyn Tool>> = Vec::with_capacity(self.tools.len() + 1);
        tools.push(Arc::new(FinishConversation));
        tools.extend(self.tools);

        let registry = SchemaRegistry::from_tools(&tools);
        let engine = ExecutionEngine::new(&tools);
        let compiled = self.prompt.compile(&registry);

        let extractor = ResponseExtractor::new(
            Arc::clone(&self.provider),
            self.model.clone(),
            self.completion.clone(),
            compiled.fixer_message,
            compiled.response_format,
        );

        let conversation = ConversationStore::from_messages(self.previous_messages);

        info!(
            provider = self.provider.display_name(),
            model = %self.model,
            tools = registry.len(),
            history = conversation.len(),
            "agent ready"
        );
        if self.show_system_prompt {
            info!(target: PROMPT_LOG_TARGET, "system prompt:\n{}", compiled.system_message);
        }
        if self.show_history {
            for msg in conversation.messages() {
                info!(target: PROMPT_LOG_TARGET, "[{}] {}", msg.role, msg.content);
            }
        }

        Agent {
            provider: self.provider,
            model: self.model,
            completion: self.completion,
            registry,
            engine,
            extractor,
            system_message: Message::system(compiled.system_message),
            conversation,
            max_iterations: self.max_iterations,
            log: self.log,
        }
    }
}
