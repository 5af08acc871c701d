//! Per-query settings and report

use crate::types::ConversationMessage;

/// Output budget of the streamed follow-up completion
pub const DEFAULT_FOLLOW_UP_MAX_TOKENS: u32 = 512;

/// Settings shared by every query an orchestrator runs
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    /// Model identifier passed to the backend
    pub model: String,
    /// Optional system preamble placed before the user query
    pub system_prompt: Option<String>,
    pub follow_up_max_tokens: u32,
}

impl OrchestratorSettings {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: None,
            follow_up_max_tokens: DEFAULT_FOLLOW_UP_MAX_TOKENS,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_follow_up_max_tokens(mut self, tokens: u32) -> Self {
        self.follow_up_max_tokens = tokens;
        self
    }
}

/// Where a query is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Initiating,
    Dispatching,
    AwaitingFollowUp,
    Streaming,
    Done,
}

/// Outcome of one successful query
#[derive(Debug, Clone)]
pub struct Turn {
    /// The full message log, ending with the assistant's answer
    pub messages: Vec<ConversationMessage>,
    /// The answer text as forwarded to the caller
    pub answer: String,
    /// Number of tool calls dispatched
    pub dispatched: usize,
    /// States visited, in order
    pub path: Vec<TurnState>,
}

impl Turn {
    pub fn used_tools(&self) -> bool {
        self.dispatched > 0
    }
}
