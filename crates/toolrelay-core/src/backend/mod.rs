//! Language-model completion backends
//!
//! ## Architecture
//!
//! [`GenaiBackend`] talks to real models through the `genai` crate, which
//! handles provider protocols (OpenAI, Ollama, Anthropic, Gemini, ...), SSE
//! parsing and tool-call encoding. OpenAI-compatible servers are reached by
//! pointing `api_base` at them.
//!
//! [`ScriptedBackend`] replays queued responses and records every request,
//! for tests and offline runs.

mod error;
mod genai_adapter;
mod genai_backend;
mod scripted;
mod traits;

pub use error::{CompletionError, CompletionResult};
pub use genai_adapter::BackendConfig;
pub use genai_backend::GenaiBackend;
pub use scripted::{ScriptedBackend, ScriptedStream};
pub use traits::{
    CompletionBackend, CompletionRequest, CompletionResponse, CompletionStream, StopReason,
};
