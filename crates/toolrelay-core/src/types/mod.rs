//! Core types for tool-calling conversations
//!
//! This module contains the shared data model used by the registry,
//! the completion backends and the orchestrator.

mod message;
mod schema;
mod stream;
mod tool;

pub use message::{ConversationMessage, MessageContent, MessageRole};
pub use schema::ParameterSchema;
pub use stream::StreamChunk;
pub use tool::{ContentBlock, ToolCallRequest, ToolCallResult, ToolDescriptor};
