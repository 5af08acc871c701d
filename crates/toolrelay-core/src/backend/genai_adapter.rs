//! Adapter between toolrelay types and genai types
//!
//! Conversion functions plus client construction. Auth comes from the
//! configured key or a `<PROVIDER>_API_KEY` environment variable, and a
//! configured `api_base` overrides the adapter's default endpoint.

use std::future::Future;
use std::pin::Pin;

use genai::chat::{
    ChatMessage as GenaiMessage, ChatOptions as GenaiOptions, Tool as GenaiTool,
    ToolCall as GenaiToolCall, ToolResponse as GenaiToolResponse,
};
use genai::resolver::{AuthData, AuthResolver, Endpoint, ServiceTargetResolver};
use genai::{adapter::AdapterKind, Client, ModelIden, ServiceTarget};
use serde_json::{json, Value};

use super::error::{CompletionError, CompletionResult};
use super::traits::CompletionRequest;
use crate::types::{ConversationMessage, MessageRole, ToolCallRequest, ToolDescriptor};

// ============================================================================
// Message Conversion: toolrelay -> genai
// ============================================================================

/// Convert one conversation message to a genai message
pub fn to_genai_message(msg: &ConversationMessage) -> CompletionResult<GenaiMessage> {
    let message = match msg.role {
        MessageRole::System => GenaiMessage::system(msg.text()),
        MessageRole::User => GenaiMessage::user(msg.text()),
        MessageRole::Assistant if !msg.tool_calls.is_empty() => {
            let calls = msg
                .tool_calls
                .iter()
                .map(to_genai_tool_call)
                .collect::<CompletionResult<Vec<_>>>()?;
            GenaiMessage::from(calls)
        }
        MessageRole::Assistant => GenaiMessage::assistant(msg.text()),
        MessageRole::Tool => {
            let call_id = msg.tool_call_id.clone().unwrap_or_default();
            GenaiMessage::from(GenaiToolResponse::new(call_id, msg.text()))
        }
    };
    Ok(message)
}

/// Convert a message log to genai messages
pub fn to_genai_messages(messages: &[ConversationMessage]) -> CompletionResult<Vec<GenaiMessage>> {
    messages.iter().map(to_genai_message).collect()
}

/// Rebuild a genai tool call from one the model issued earlier
pub fn to_genai_tool_call(call: &ToolCallRequest) -> CompletionResult<GenaiToolCall> {
    let arguments = if call.arguments.trim().is_empty() {
        json!({})
    } else {
        serde_json::from_str(&call.arguments).unwrap_or_else(|_| Value::String(call.arguments.clone()))
    };

    serde_json::from_value(json!({
        "call_id": call.id,
        "fn_name": call.name,
        "fn_arguments": arguments,
    }))
    .map_err(|e| CompletionError::invalid_response("genai", format!("tool call {}: {e}", call.id)))
}

// ============================================================================
// Tool Conversion: toolrelay -> genai
// ============================================================================

/// Convert a tool descriptor to a genai tool
pub fn to_genai_tool(tool: &ToolDescriptor) -> GenaiTool {
    GenaiTool::new(&tool.name)
        .with_description(&tool.description)
        .with_schema(tool.parameter_schema.as_value().clone())
}

pub fn to_genai_tools(tools: &[ToolDescriptor]) -> Vec<GenaiTool> {
    tools.iter().map(to_genai_tool).collect()
}

// ============================================================================
// Options Conversion
// ============================================================================

pub fn to_genai_options(request: &CompletionRequest) -> GenaiOptions {
    let mut genai_opts = GenaiOptions::default();

    if let Some(max_tokens) = request.max_output_tokens {
        genai_opts = genai_opts.with_max_tokens(max_tokens);
    }

    genai_opts
}

// ============================================================================
// Response Conversion: genai -> toolrelay
// ============================================================================

/// Convert a genai tool call into the textual form the registry decodes
pub fn from_genai_tool_call(tc: &GenaiToolCall) -> ToolCallRequest {
    // Some adapters hand back the arguments as an already-encoded string
    let arguments = match &tc.fn_arguments {
        Value::String(encoded) => encoded.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    ToolCallRequest::new(tc.call_id.clone(), tc.fn_name.clone(), arguments)
}

// ============================================================================
// Client Creation
// ============================================================================

/// Backend connection settings
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Provider identifier (e.g., "ollama", "openai", "openai-compatible")
    pub provider: String,
    /// API key for authentication
    pub api_key: Option<String>,
    /// Custom API base URL
    pub api_base: Option<String>,
}

impl BackendConfig {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            api_key: None,
            api_base: None,
        }
    }
}

/// Map a provider ID to the genai adapter that speaks its protocol.
///
/// Anything genai does not know natively is treated as OpenAI-compatible.
pub fn adapter_for(provider: &str) -> AdapterKind {
    match provider.to_lowercase().as_str() {
        "ollama" => AdapterKind::Ollama,
        "anthropic" => AdapterKind::Anthropic,
        "gemini" | "google" => AdapterKind::Gemini,
        "groq" => AdapterKind::Groq,
        "xai" => AdapterKind::Xai,
        "deepseek" => AdapterKind::DeepSeek,
        "cohere" => AdapterKind::Cohere,
        "fireworks" => AdapterKind::Fireworks,
        "together" => AdapterKind::Together,
        _ => AdapterKind::OpenAI,
    }
}

/// Environment variable holding the key for a provider
pub fn api_key_env_var(provider: &str) -> String {
    format!("{}_API_KEY", provider.to_uppercase().replace('-', "_"))
}

/// Create a genai Client with custom auth and endpoint resolution
pub fn create_client(config: &BackendConfig) -> Client {
    let auth_provider = config.provider.clone();
    let auth_explicit_key = config.api_key.clone();

    let auth_resolver = AuthResolver::from_resolver_async_fn(
        move |_model_iden: ModelIden| -> Pin<Box<dyn Future<Output = genai::resolver::Result<Option<AuthData>>> + Send>> {
            let provider = auth_provider.clone();
            let explicit_key = auth_explicit_key.clone();

            Box::pin(async move {
                if let Some(key) = explicit_key {
                    return Ok(Some(AuthData::from_single(key)));
                }
                // None is fine for keyless local servers such as Ollama
                Ok(std::env::var(api_key_env_var(&provider))
                    .ok()
                    .map(AuthData::from_single))
            })
        },
    );

    let adapter_kind = adapter_for(&config.provider);
    let target_api_base = config.api_base.clone();

    let target_resolver = ServiceTargetResolver::from_resolver_fn(
        move |target: ServiceTarget| -> Result<ServiceTarget, genai::resolver::Error> {
            let ServiceTarget { endpoint, auth, model } = target;

            let endpoint = target_api_base
                .as_ref()
                .map(|u| Endpoint::from_owned(u.clone()))
                .unwrap_or(endpoint);

            Ok(ServiceTarget {
                endpoint,
                auth,
                model: ModelIden::new(adapter_kind, model.model_name.clone()),
            })
        },
    );

    Client::builder()
        .with_auth_resolver(auth_resolver)
        .with_service_target_resolver(target_resolver)
        .build()
}
