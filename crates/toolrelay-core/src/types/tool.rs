//! Tool descriptors, calls and results

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::schema::ParameterSchema;

/// A tool as advertised to the model
///
/// Names are unique across every provider of one registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name (function name)
    pub name: String,
    /// Description of what the tool does
    pub description: String,
    /// Structurally validated parameter schema
    #[serde(rename = "parameters")]
    pub parameter_schema: ParameterSchema,
}

impl ToolDescriptor {
    /// Create a new tool descriptor
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameter_schema: ParameterSchema,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameter_schema,
        }
    }
}

/// Tool call issued by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Model-issued id, unique within one completion response
    pub id: String,
    /// Name of the tool being called
    pub name: String,
    /// Arguments in their textual JSON encoding, as the model produced them
    pub arguments: String,
}

impl ToolCallRequest {
    /// Create a new tool call
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// Resolved tool call, correlated with its request by id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    #[serde(rename = "toolCallId")]
    pub tool_call_id: String,
    /// Content exactly as the provider returned it
    pub content: Vec<ContentBlock>,
}

impl ToolCallResult {
    pub fn new(tool_call_id: impl Into<String>, content: Vec<ContentBlock>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            content,
        }
    }

    /// Text of all text blocks, newline separated
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentBlock::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Typed content block returned by a tool provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Resource {
        resource: Value,
    },
}

impl ContentBlock {
    /// Create a text block
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    /// Get text content if this is a text block
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_block_wire_format() {
        let block = ContentBlock::text("72F, sunny");
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json, json!({"type": "text", "text": "72F, sunny"}));

        let image: ContentBlock =
            serde_json::from_value(json!({"type": "image", "data": "AA==", "mimeType": "image/png"}))
                .unwrap();
        assert!(matches!(image, ContentBlock::Image { ref mime_type, .. } if mime_type == "image/png"));
    }

    #[test]
    fn test_tool_call_result_text() {
        let result = ToolCallResult::new(
            "call_1",
            vec![ContentBlock::text("line one"), ContentBlock::text("line two")],
        );
        assert_eq!(result.text(), "line one\nline two");
    }

    #[test]
    fn test_descriptor_serializes_schema_as_parameters() {
        let schema = ParameterSchema::new(json!({"type": "object", "properties": {}})).unwrap();
        let descriptor = ToolDescriptor::new("get-current-time", "Current time", schema);
        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["parameters"]["type"], "object");
    }
}
