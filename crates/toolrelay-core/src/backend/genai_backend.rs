//! GenaiBackend - completion backend using the genai crate
//!
//! Handles every genai-supported provider (Ollama, OpenAI, Anthropic, Gemini,
//! ...) as well as OpenAI-compatible servers reached through `api_base`.

use async_trait::async_trait;
use futures::StreamExt;

use genai::chat::{ChatRequest, ChatStreamEvent};

use crate::logging::SharedLogger;
use crate::types::StreamChunk;
use crate::{log_debug, log_error, log_info};

use super::error::{CompletionError, CompletionResult};
use super::genai_adapter::{
    create_client, from_genai_tool_call, to_genai_messages, to_genai_options, to_genai_tools,
    BackendConfig,
};
use super::traits::{
    CompletionBackend, CompletionRequest, CompletionResponse, CompletionStream, StopReason,
};

/// Completion backend for any genai-supported LLM API
pub struct GenaiBackend {
    config: BackendConfig,
    logger: SharedLogger,
}

impl GenaiBackend {
    pub fn new(provider_id: impl Into<String>, logger: SharedLogger) -> Self {
        Self {
            config: BackendConfig::new(provider_id),
            logger,
        }
    }

    pub fn from_config(config: BackendConfig, logger: SharedLogger) -> Self {
        Self { config, logger }
    }

    /// Set the API key
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    /// Set the API base URL
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.config.api_base = Some(base.into());
        self
    }

    /// Extract model name from a model string (e.g., "ollama/qwen2.5" -> "qwen2.5")
    pub fn extract_model_name(model: &str) -> &str {
        model.split('/').nth(1).unwrap_or(model)
    }

    fn build_request(&self, request: &CompletionRequest) -> CompletionResult<ChatRequest> {
        let mut chat_req = ChatRequest::new(to_genai_messages(&request.messages)?);
        if !request.tools.is_empty() {
            chat_req = chat_req.with_tools(to_genai_tools(&request.tools));
        }
        Ok(chat_req)
    }
}

#[async_trait]
impl CompletionBackend for GenaiBackend {
    fn name(&self) -> &str {
        &self.config.provider
    }

    async fn complete(&self, request: CompletionRequest) -> CompletionResult<CompletionResponse> {
        let model_name = Self::extract_model_name(&request.model);
        log_info!(
            self.logger,
            "[GenaiBackend] complete: provider={}, model={}, tools={}",
            self.config.provider,
            model_name,
            request.tools.len()
        );

        let client = create_client(&self.config);
        let chat_req = self.build_request(&request)?;
        let options = to_genai_options(&request);

        let response = client
            .exec_chat(model_name, chat_req, Some(&options))
            .await
            .map_err(|e| CompletionError::api(&self.config.provider, e.to_string()))?;

        let content = response.first_text().map(str::to_string);
        let calls: Vec<_> = response
            .into_tool_calls()
            .iter()
            .map(from_genai_tool_call)
            .collect();

        if calls.is_empty() {
            log_debug!(self.logger, "[GenaiBackend] Final answer received");
            Ok(CompletionResponse::Final {
                content: content.unwrap_or_default(),
                stop_reason: StopReason::Stop,
            })
        } else {
            log_info!(
                self.logger,
                "[GenaiBackend] Model requested {} tool calls",
                calls.len()
            );
            Ok(CompletionResponse::ToolCalls { content, calls })
        }
    }

    async fn stream(&self, request: CompletionRequest) -> CompletionResult<CompletionStream> {
        let model_name = Self::extract_model_name(&request.model);
        log_info!(
            self.logger,
            "[GenaiBackend] Starting stream for model: {}",
            model_name
        );

        let client = create_client(&self.config);
        let chat_req = self.build_request(&request)?;
        let options = to_genai_options(&request);

        let chat_stream = client
            .exec_chat_stream(model_name, chat_req, Some(&options))
            .await
            .map_err(|e| CompletionError::api(&self.config.provider, e.to_string()))?;

        let logger = self.logger.clone();
        let stream = chat_stream.stream.filter_map(move |result| {
            let logger = logger.clone();
            async move {
                match result {
                    Ok(ChatStreamEvent::Chunk(chunk)) => Some(Ok(StreamChunk::text(chunk.content))),
                    Ok(ChatStreamEvent::End(_)) => {
                        log_debug!(logger, "[GenaiBackend] Stream event: End");
                        None
                    }
                    Ok(ChatStreamEvent::ReasoningChunk(chunk)) => {
                        Some(Ok(StreamChunk::reasoning(chunk.content)))
                    }
                    // Tool-call deltas are not forwarded
                    Ok(_) => None,
                    Err(e) => {
                        log_error!(logger, "[GenaiBackend] Stream error: {}", e);
                        Some(Err(CompletionError::Stream(e.to_string())))
                    }
                }
            }
        });

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use std::sync::Arc;

    #[test]
    fn test_extract_model_name() {
        assert_eq!(GenaiBackend::extract_model_name("ollama/qwen2.5-coder:14b"), "qwen2.5-coder:14b");
        assert_eq!(GenaiBackend::extract_model_name("qwen2.5-coder:14b"), "qwen2.5-coder:14b");
    }

    #[test]
    fn test_builder() {
        let backend = GenaiBackend::new("ollama", Arc::new(NoOpLogger::new()))
            .with_api_base("http://localhost:11434/v1/")
            .with_api_key("unused");
        assert_eq!(backend.name(), "ollama");
        assert_eq!(backend.config.api_base.as_deref(), Some("http://localhost:11434/v1/"));
        assert_eq!(backend.config.api_key.as_deref(), Some("unused"));
    }
}
