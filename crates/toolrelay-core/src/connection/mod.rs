//! Connections from the registry to tool providers

mod paired;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::RelayResult;
use crate::protocol::ToolDefinition;
use crate::types::ContentBlock;

pub use paired::PairedConnection;

/// The consumer side of one provider
#[async_trait]
pub trait ToolConnection: Send + Sync {
    /// Name the provider reported when the connection was opened
    fn provider_name(&self) -> &str;

    async fn list_tools(&self) -> RelayResult<Vec<ToolDefinition>>;

    /// Invoke a tool. Overlapping calls on one connection are allowed.
    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> RelayResult<Vec<ContentBlock>>;

    async fn close(&self) -> RelayResult<()>;
}
