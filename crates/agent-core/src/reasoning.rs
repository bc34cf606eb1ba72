//! Reasoning Loop
//!
//! Implements the ReAct (Reason + Act) pattern for agent behavior.
//! The agent asks the model, runs whatever tools it requests, feeds the
//! results back and repeats until the model answers in plain text.
//!
//! ```text
//! Idle → Preparing → AwaitingModel ⇄ ExecutingTools
//!                         │                │
//!                         ▼                ▼
//!                        Done           Failed
//! ```
//!
//! Each call to the model is one iteration. Before every model call the loop
//! checks the iteration cap and the elapsed wall-clock time; running out of
//! either ends the turn with a budget error. Tool failures never end a turn,
//! they are reported to the model as tool results.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::{AgentError, ErrorKind, Result};
use crate::history::ConversationHistory;
use crate::message::{Message, Role, ToolCall};
use crate::provider::{Attribution, GenerationOptions, LlmProvider};
use crate::tool::{Tool, ToolRegistry};

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Static instructions placed in the system message
    pub system_prompt: String,

    /// Maximum model calls per `chat` before giving up
    pub max_iterations: usize,

    /// Wall-clock budget per `chat`
    pub timeout: Duration,

    /// How many stored history messages are replayed into each call
    pub history_window: usize,

    /// Run the tool calls of one model response concurrently
    pub parallel_tool_calls: bool,

    /// Generation options
    pub generation: GenerationOptions,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            timeout: DEFAULT_TIMEOUT,
            history_window: DEFAULT_HISTORY_WINDOW,
            parallel_tool_calls: false,
            generation: GenerationOptions::default(),
        }
    }
}

impl AgentConfig {
    /// Reject configurations the loop cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(AgentError::Config("max_iterations must be at least 1".into()));
        }
        if self.timeout.is_zero() {
            return Err(AgentError::Config("timeout must be greater than zero".into()));
        }
        if self.generation.model.trim().is_empty() {
            return Err(AgentError::Config("model name must not be empty".into()));
        }
        if self.generation.max_tokens == 0 {
            return Err(AgentError::Config("max_tokens must be greater than zero".into()));
        }
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(AgentError::Config(format!(
                "temperature must be between 0 and 2, got {}",
                self.generation.temperature
            )));
        }
        Ok(())
    }
}

pub const DEFAULT_MAX_ITERATIONS: usize = 10;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_HISTORY_WINDOW: usize = 5;

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant. You can engage in conversations and help users with various tasks.";

const TOOL_GUIDANCE: &str = r"When using tools:
1. Think step by step about what information you need
2. Use tools when they would provide helpful information
3. Always provide a clear, helpful response to the user

Be concise but thorough in your responses.";

/// Outcome of one `chat` call
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Final answer, or a user-facing apology on failure
    pub content: String,

    /// Every tool invocation the model requested during the turn
    pub tool_calls_made: Vec<ToolCall>,

    /// Model calls consumed
    pub iterations: usize,

    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl AgentResponse {
    fn completed(content: String, tool_calls_made: Vec<ToolCall>, iterations: usize) -> Self {
        Self {
            content,
            tool_calls_made,
            iterations,
            success: true,
            error: None,
            error_kind: None,
        }
    }

    fn failed(err: &AgentError, tool_calls_made: Vec<ToolCall>, iterations: usize) -> Self {
        Self {
            content: err.user_message(),
            tool_calls_made,
            iterations,
            success: false,
            error: Some(err.to_string()),
            error_kind: Some(err.kind()),
        }
    }
}

/// Where a turn currently is
#[derive(Debug)]
enum State {
    Preparing,
    AwaitingModel,
    ExecutingTools(Vec<ToolCall>),
    Done(String),
    Failed(AgentError),
}

impl State {
    const fn name(&self) -> &'static str {
        match self {
            Self::Preparing => "preparing",
            Self::AwaitingModel => "awaiting_model",
            Self::ExecutingTools(_) => "executing_tools",
            Self::Done(_) => "done",
            Self::Failed(_) => "failed",
        }
    }
}

/// Per-call working state; dropped when `chat` returns
struct Turn {
    transcript: Vec<Message>,
    iterations: usize,
    tool_calls_made: Vec<ToolCall>,
    started: Instant,
}

/// The main Agent struct
///
/// One agent holds one conversation. Use one instance per conversation when
/// serving several at once.
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
    history: ConversationHistory,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("provider", &self.provider.name())
            .field("tools", &self.tools)
            .field("config", &self.config)
            .field("history_len", &self.history.len())
            .finish()
    }
}

impl Agent {
    /// Create a new agent, failing fast on an unusable configuration
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        config: AgentConfig,
    ) -> Result<Self> {
        config.validate()?;

        tracing::info!(
            provider = provider.name(),
            model = %config.generation.model,
            tools = tools.len(),
            "Agent initialized"
        );

        Ok(Self {
            provider,
            tools,
            config,
            history: ConversationHistory::new(),
        })
    }

    /// Send one user message and drive the loop to an answer.
    ///
    /// Never fails: errors are reported through [`AgentResponse::success`]
    /// and [`AgentResponse::error`], together with the progress made so far.
    pub async fn chat(&mut self, user_text: &str) -> AgentResponse {
        let mut turn = Turn {
            transcript: Vec::new(),
            iterations: 0,
            tool_calls_made: Vec::new(),
            started: Instant::now(),
        };
        let mut state = State::Preparing;

        loop {
            tracing::debug!(state = state.name(), iteration = turn.iterations, "Agent state");

            state = match state {
                State::Preparing => match self.prepare_messages(user_text) {
                    Ok(messages) => {
                        turn.transcript = messages;
                        State::AwaitingModel
                    }
                    Err(e) => State::Failed(e),
                },
                State::AwaitingModel => match self.await_model(&mut turn).await {
                    Ok(message) if message.has_tool_calls() => {
                        let calls = message.tool_calls.clone();
                        turn.transcript.push(message);
                        State::ExecutingTools(calls)
                    }
                    Ok(message) => State::Done(message.content),
                    Err(e) => State::Failed(e),
                },
                State::ExecutingTools(calls) => match self.execute_tools(&mut turn, calls).await {
                    Ok(()) => State::AwaitingModel,
                    Err(e) => State::Failed(e),
                },
                State::Done(content) => {
                    self.history.append(Message::user(user_text));
                    self.history.append(Message::assistant(content.clone()));

                    tracing::info!(
                        iterations = turn.iterations,
                        tool_calls = turn.tool_calls_made.len(),
                        elapsed_ms = turn.started.elapsed().as_millis(),
                        "Chat completed"
                    );
                    return AgentResponse::completed(content, turn.tool_calls_made, turn.iterations);
                }
                State::Failed(err) => {
                    if err.is_budget_exhausted() {
                        tracing::warn!(
                            error = %err,
                            iterations = turn.iterations,
                            tool_calls = turn.tool_calls_made.len(),
                            "Chat stopped by budget"
                        );
                    } else {
                        tracing::error!(
                            error = %err,
                            kind = ?err.kind(),
                            iterations = turn.iterations,
                            "Chat failed"
                        );
                    }
                    return AgentResponse::failed(&err, turn.tool_calls_made, turn.iterations);
                }
            };
        }
    }

    /// Clear the conversation history
    pub fn reset(&mut self) {
        self.history.clear();
        tracing::info!("Conversation history reset");
    }

    /// Copy of the conversation history, oldest first
    pub fn history(&self) -> Vec<Message> {
        self.history.snapshot()
    }

    /// Register a tool with this agent's registry.
    ///
    /// The registry may be shared, in which case other agents see the tool too.
    pub fn register_tool<T: Tool + 'static>(&self, tool: T) {
        let name = tool.schema().name;
        self.tools.register(tool);
        tracing::info!(tool = %name, "Tool added to agent");
    }

    /// Get the tool registry
    pub const fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    /// Get configuration
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Build the system message, naming every currently registered tool
    pub fn system_message(&self) -> Message {
        let mut prompt = self.config.system_prompt.clone();

        let names = self.tools.names();
        if !names.is_empty() {
            prompt.push_str("\n\nYou have access to the following tools: ");
            prompt.push_str(&names.join(", "));
            prompt.push_str(". Use them when they would be helpful to answer the user's question.");
        }

        prompt.push_str("\n\n");
        prompt.push_str(TOOL_GUIDANCE);
        Message::system(prompt)
    }

    fn prepare_messages(&self, user_text: &str) -> Result<Vec<Message>> {
        if user_text.trim().is_empty() {
            return Err(AgentError::InvalidInput("message must not be empty".into()));
        }

        let recent = self.history.recent(self.config.history_window);
        let mut messages = Vec::with_capacity(recent.len() + 2);
        messages.push(self.system_message());
        messages.extend(recent.iter().map(Message::to_plain));
        messages.push(Message::user(user_text));
        Ok(messages)
    }

    async fn await_model(&self, turn: &mut Turn) -> Result<Message> {
        if turn.iterations >= self.config.max_iterations {
            return Err(AgentError::IterationBudgetExceeded {
                max: self.config.max_iterations,
            });
        }
        let remaining = self.remaining(turn)?;
        turn.iterations += 1;

        let descriptors = self.tools.descriptors();
        tracing::debug!(
            iteration = turn.iterations,
            messages = turn.transcript.len(),
            tools = descriptors.len(),
            "Calling model"
        );

        let completion = tokio::time::timeout(
            remaining,
            self.provider
                .complete(&turn.transcript, &descriptors, &self.config.generation),
        )
        .await
        .map_err(|_| self.timeout_error())??;

        let message = completion.message;
        if message.role != Role::Assistant {
            return Err(AgentError::MalformedResponse(format!(
                "expected an assistant message, got role '{}'",
                message.role
            )));
        }
        Ok(message)
    }

    async fn execute_tools(&self, turn: &mut Turn, calls: Vec<ToolCall>) -> Result<()> {
        let remaining = self.remaining(turn)?;
        turn.tool_calls_made.extend(calls.iter().cloned());

        tracing::debug!(count = calls.len(), parallel = self.config.parallel_tool_calls, "Executing tools");

        let results = tokio::time::timeout(
            remaining,
            self.tools.invoke_all(&calls, self.config.parallel_tool_calls),
        )
        .await
        .map_err(|_| self.timeout_error())?;

        turn.transcript.extend(
            results
                .into_iter()
                .map(|r| Message::tool(r.to_content(), r.call_id, r.name)),
        );
        Ok(())
    }

    /// Time left in the budget, or the timeout error if none is left
    fn remaining(&self, turn: &Turn) -> Result<Duration> {
        let remaining = self.config.timeout.saturating_sub(turn.started.elapsed());
        if remaining.is_zero() {
            Err(self.timeout_error())
        } else {
            Ok(remaining)
        }
    }

    const fn timeout_error(&self) -> AgentError {
        AgentError::TimeoutExceeded {
            timeout: self.config.timeout,
        }
    }
}

/// Builder for Agent configuration
#[derive(Default)]
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: Option<Arc<ToolRegistry>>,
    config: AgentConfig,
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Register a tool. Without an explicit registry the tool goes into a
    /// fresh one owned by this builder.
    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools
            .get_or_insert_with(|| Arc::new(ToolRegistry::new()))
            .register(tool);
        self
    }

    /// Use an existing (possibly shared) registry
    pub fn tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.generation.model = model.into();
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.config.generation.temperature = temp;
        self
    }

    pub fn max_tokens(mut self, max: u32) -> Self {
        self.config.generation.max_tokens = max;
        self
    }

    pub fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn history_window(mut self, window: usize) -> Self {
        self.config.history_window = window;
        self
    }

    pub fn parallel_tool_calls(mut self, parallel: bool) -> Self {
        self.config.parallel_tool_calls = parallel;
        self
    }

    pub fn attribution(mut self, attribution: Attribution) -> Self {
        self.config.generation.attribution = attribution;
        self
    }

    /// Build the agent. Uses the shared default registry when none was given.
    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;
        let tools = self.tools.unwrap_or_else(ToolRegistry::shared_default);

        Agent::new(provider, tools, self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Completion;
    use crate::tool::ToolSchema;
    use async_trait::async_trait;

    struct SilentProvider;

    #[async_trait]
    impl LlmProvider for SilentProvider {
        fn name(&self) -> &str {
            "silent"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        async fn complete(
            &self,
            _messages: &[Message],
            _tools: &[ToolSchema],
            options: &GenerationOptions,
        ) -> Result<Completion> {
            Ok(Completion::from_message(Message::assistant("ok"), &options.model))
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.history_window, 5);
        assert!(!config.parallel_tool_calls);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_requires_provider() {
        let err = AgentBuilder::new().build().unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
    }

    #[test]
    fn test_builder_rejects_invalid_budgets() {
        let zero_iterations = AgentBuilder::new()
            .provider(Arc::new(SilentProvider))
            .max_iterations(0)
            .build();
        assert!(matches!(zero_iterations, Err(AgentError::Config(_))));

        let zero_timeout = AgentBuilder::new()
            .provider(Arc::new(SilentProvider))
            .timeout(Duration::ZERO)
            .build();
        assert!(matches!(zero_timeout, Err(AgentError::Config(_))));

        let hot = AgentBuilder::new()
            .provider(Arc::new(SilentProvider))
            .temperature(7.5)
            .build();
        assert!(matches!(hot, Err(AgentError::Config(_))));
    }

    #[test]
    fn test_system_message_names_tools() {
        let agent = AgentBuilder::new()
            .provider(Arc::new(SilentProvider))
            .tools(Arc::new(ToolRegistry::with_defaults()))
            .build()
            .unwrap();

        let system = agent.system_message();
        assert_eq!(system.role, Role::System);
        assert!(system.content.contains("helpful AI assistant"));
        assert!(system.content.contains("calculator, web_search"));

        let bare = AgentBuilder::new()
            .provider(Arc::new(SilentProvider))
            .tools(Arc::new(ToolRegistry::new()))
            .build()
            .unwrap();
        assert!(!bare.system_message().content.contains("following tools"));
    }

    #[test]
    fn test_prepare_messages_layout() {
        let mut agent = AgentBuilder::new()
            .provider(Arc::new(SilentProvider))
            .tools(Arc::new(ToolRegistry::new()))
            .build()
            .unwrap();
        agent.history.append(Message::user("Hello"));
        agent.history.append(Message::assistant("Hi there!"));

        let messages = agent.prepare_messages("How are you?").unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].content, "Hello");
        assert_eq!(messages[3].role, Role::User);
        assert_eq!(messages[3].content, "How are you?");
    }

    #[tokio::test]
    async fn test_empty_input_fails_before_model_call() {
        let mut agent = AgentBuilder::new()
            .provider(Arc::new(SilentProvider))
            .tools(Arc::new(ToolRegistry::new()))
            .build()
            .unwrap();

        let response = agent.chat("   ").await;
        assert!(!response.success);
        assert_eq!(response.iterations, 0);
        assert_eq!(response.error_kind, Some(ErrorKind::InvalidInput));
        assert!(agent.history().is_empty());
    }
}
