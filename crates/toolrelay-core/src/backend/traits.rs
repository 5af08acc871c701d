//! Completion backend trait definition

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use super::error::CompletionResult;
use crate::types::{ConversationMessage, StreamChunk, ToolCallRequest, ToolDescriptor};

/// One completion request
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Model identifier, optionally prefixed with a provider (`ollama/qwen2.5`)
    pub model: String,
    pub messages: Vec<ConversationMessage>,
    /// Tools the model may call. Empty means tool calling is not offered.
    pub tools: Vec<ToolDescriptor>,
    pub max_output_tokens: Option<u32>,
    pub stream: bool,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ConversationMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: Vec::new(),
            max_output_tokens: None,
            stream: false,
        }
    }

    /// Set tools
    pub fn with_tools(mut self, tools: Vec<ToolDescriptor>) -> Self {
        self.tools = tools;
        self
    }

    /// Set max tokens
    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    /// Request a streamed response
    pub fn streaming(mut self) -> Self {
        self.stream = true;
        self
    }
}

/// Why the model stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    Stop,
    ToolCalls,
    Length,
    Other(String),
}

/// Non-streaming completion outcome
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionResponse {
    /// The model answered directly
    Final { content: String, stop_reason: StopReason },
    /// The model asked for one or more tool calls
    ToolCalls {
        content: Option<String>,
        calls: Vec<ToolCallRequest>,
    },
}

impl CompletionResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Final {
            content: content.into(),
            stop_reason: StopReason::Stop,
        }
    }

    pub fn tool_calls(calls: Vec<ToolCallRequest>) -> Self {
        Self::ToolCalls {
            content: None,
            calls,
        }
    }

    pub fn stop_reason(&self) -> StopReason {
        match self {
            Self::Final { stop_reason, .. } => stop_reason.clone(),
            Self::ToolCalls { .. } => StopReason::ToolCalls,
        }
    }
}

/// Type alias for the streaming response
pub type CompletionStream = Pin<Box<dyn Stream<Item = CompletionResult<StreamChunk>> + Send>>;

/// A language-model backend with function calling
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Backend name (e.g., "ollama", "scripted")
    fn name(&self) -> &str;

    /// Request a complete, non-streamed response
    async fn complete(&self, request: CompletionRequest) -> CompletionResult<CompletionResponse>;

    /// Request a streamed response. The stream is finite and ends when the
    /// backend closes it.
    async fn stream(&self, request: CompletionRequest) -> CompletionResult<CompletionStream>;
}
