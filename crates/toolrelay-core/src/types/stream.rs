//! Streaming response types

use serde::{Deserialize, Serialize};

/// One piece of a streamed completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamChunk {
    /// Answer text
    Text { text: String },
    /// Model reasoning, never part of the answer
    Reasoning { text: String },
}

impl StreamChunk {
    pub fn text(text: impl Into<String>) -> Self {
        StreamChunk::Text { text: text.into() }
    }

    pub fn reasoning(text: impl Into<String>) -> Self {
        StreamChunk::Reasoning { text: text.into() }
    }

    /// The answer text, if this chunk carries any
    pub fn as_text(&self) -> Option<&str> {
        match self {
            StreamChunk::Text { text } => Some(text),
            StreamChunk::Reasoning { .. } => None,
        }
    }
}
