//! Tool provider trait

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::protocol::ToolDefinition;
use crate::types::ContentBlock;

/// Failure reported by a provider while handling a call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderFault {
    /// The provider does not own a tool by this name
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// The tool ran and failed
    #[error("{0}")]
    Execution(String),
}

impl ProviderFault {
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }
}

/// A set of tools hosted behind a transport.
///
/// `call_tool` may be invoked concurrently: every inbound request is handled
/// on its own task, so implementations must tolerate overlapping calls.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Provider name, reported during the handshake
    fn name(&self) -> &str;

    fn version(&self) -> &str {
        "1.0.0"
    }

    /// Tools this provider exposes
    async fn list_tools(&self) -> Vec<ToolDefinition>;

    /// Run one tool with already-decoded arguments
    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Vec<ContentBlock>, ProviderFault>;
}
