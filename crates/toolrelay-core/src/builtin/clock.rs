//! Current date and time

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Local};
use serde_json::{json, Map, Value};

use crate::protocol::ToolDefinition;
use crate::server::{ProviderFault, ToolProvider};
use crate::types::ContentBlock;

pub const TOOL_NAME: &str = "get-current-time";

/// Reports the current local date and time as `get-current-time`
#[derive(Debug, Clone, Default)]
pub struct ClockProvider {
    fixed: Option<DateTime<FixedOffset>>,
}

impl ClockProvider {
    /// Use the system clock
    pub fn new() -> Self {
        Self::default()
    }

    /// Always report `at`
    pub fn fixed(at: DateTime<FixedOffset>) -> Self {
        Self { fixed: Some(at) }
    }

    fn now(&self) -> DateTime<FixedOffset> {
        self.fixed.unwrap_or_else(|| Local::now().fixed_offset())
    }

    /// e.g. "Monday, April 1, 2024 at 12:30:00"
    pub fn describe(at: &DateTime<FixedOffset>) -> String {
        at.format("%A, %B %-d, %Y at %H:%M:%S").to_string()
    }
}

#[async_trait]
impl ToolProvider for ClockProvider {
    fn name(&self) -> &str {
        "clock"
    }

    async fn list_tools(&self) -> Vec<ToolDefinition> {
        vec![ToolDefinition::new(
            TOOL_NAME,
            "Returns the current date and time",
            json!({"type": "object", "properties": {}}),
        )]
    }

    async fn call_tool(
        &self,
        name: &str,
        _arguments: Map<String, Value>,
    ) -> Result<Vec<ContentBlock>, ProviderFault> {
        if name != TOOL_NAME {
            return Err(ProviderFault::UnknownTool(name.to_string()));
        }
        let now = self.now();
        Ok(vec![ContentBlock::text(format!(
            "Current date and time: {}",
            Self::describe(&now)
        ))])
    }
}
