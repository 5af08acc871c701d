//! ToolRelay Core
//!
//! Tool-call orchestration for chat-completion backends.
//! A query goes to the model together with every registered tool; when the
//! model asks for tools, the calls are dispatched concurrently over paired
//! protocol transports and a streamed follow-up completion produces the answer.
//!
//! ## Layers
//!
//! - `transport`: in-process duplex pairs and newline-delimited JSON streams
//! - `protocol`: JSON-RPC frames and the MCP-style tool messages they carry
//! - `server`: the [`ToolProvider`] trait and the loop that serves it
//! - `tools`: the [`ToolRegistry`] that connects providers and routes calls
//! - `orchestrator`: the [`ConversationOrchestrator`] query loop
//!
//! ```rust,ignore
//! use toolrelay_core::{ConversationOrchestrator, ToolRegistry, ProviderEndpoint};
//! use toolrelay_core::builtin::{ClockProvider, WeatherProvider};
//!
//! let registry = ToolRegistry::new(logger.clone())
//!     .register(vec![
//!         ProviderEndpoint::in_process(ClockProvider::new()),
//!         ProviderEndpoint::in_process(WeatherProvider::demo()),
//!     ])
//!     .await?;
//!
//! let orchestrator = ConversationOrchestrator::new(backend, settings, logger);
//! let turn = orchestrator
//!     .query(&registry, "What's the weather in Osaka?", |fragment| print!("{}", fragment))
//!     .await?;
//!
//! registry.close().await?;
//! ```

pub mod types;
pub mod logging;
pub mod error;
pub mod config;
pub mod protocol;
pub mod transport;
pub mod server;
pub mod connection;
pub mod mcp;
pub mod tools;
pub mod backend;
pub mod orchestrator;
pub mod builtin;

// Re-export commonly used types
pub use types::{
    ContentBlock, ConversationMessage, MessageContent, MessageRole,
    ParameterSchema, StreamChunk,
    ToolCallRequest, ToolCallResult, ToolDescriptor,
};

pub use logging::{Logger, LogLevel, SharedLogger, NoOpLogger, MemoryLogger, ConsoleLogger};

pub use error::{RelayError, RelayResult};

pub use config::{ConfigError, FileConfig, RelayConfig};

pub use transport::{Transport, TransportError, TransportPair};

pub use server::{ProviderFault, ToolProvider};

pub use connection::ToolConnection;

pub use tools::{ProviderEndpoint, RegistryHandle, ToolRegistry};

pub use backend::{
    CompletionBackend, CompletionError, CompletionRequest, CompletionResponse,
    GenaiBackend, ScriptedBackend,
};

pub use orchestrator::{ConversationOrchestrator, OrchestratorSettings, Turn};

// MCP client using official rmcp SDK
pub use mcp::{McpClient, McpError, RemoteServer};
