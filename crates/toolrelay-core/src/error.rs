//! Relay error types

use thiserror::Error;

use crate::backend::CompletionError;
use crate::config::ConfigError;
use crate::transport::TransportError;

/// Errors surfaced by the registry and the orchestrator
#[derive(Error, Debug)]
pub enum RelayError {
    /// Failed to reach or talk to a provider
    #[error("Connection error: {0}")]
    Connection(#[from] TransportError),

    /// No registered provider exposes this tool
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Argument payload rejected before the provider was contacted
    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    /// The provider reported a failure while executing the tool
    #[error("Tool {tool} failed: {message}")]
    Provider { tool: String, message: String },

    #[error(transparent)]
    Completion(#[from] CompletionError),

    /// Two providers expose the same tool name
    #[error("Tool {name} is exposed by both {first_provider} and {second_provider}")]
    DuplicateTool {
        name: String,
        first_provider: String,
        second_provider: String,
    },

    /// A provider advertised a tool with an unusable parameter schema
    #[error("Invalid schema for tool {tool}: {reason}")]
    InvalidSchema { tool: String, reason: String },

    /// The peer sent something that does not follow the protocol
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl RelayError {
    pub fn invalid_arguments(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    pub fn provider(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}

pub type RelayResult<T> = Result<T, RelayError>;
