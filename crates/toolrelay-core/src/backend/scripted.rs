//! Scripted backend for testing
//!
//! Replays queued responses without network dependencies and records every
//! request it receives. When a queue runs dry it echoes the last user message.

use std::collections::VecDeque;

use async_trait::async_trait;
use futures::{stream, StreamExt};
use parking_lot::Mutex;

use super::error::{CompletionError, CompletionResult};
use super::traits::{CompletionBackend, CompletionRequest, CompletionResponse, CompletionStream};
use crate::logging::SharedLogger;
use crate::types::{ConversationMessage, MessageRole, StreamChunk};
use crate::log_debug;

/// One scripted streamed response
#[derive(Debug, Clone)]
pub enum ScriptedStream {
    /// Split into chunks of the configured size
    Text(String),
    /// Yield exactly these chunks
    Chunks(Vec<String>),
    /// Yield these chunks, then fail
    Error { chunks: Vec<String>, message: String },
    /// Yield nothing
    Empty,
}

enum ScriptedCompletion {
    Respond(CompletionResponse),
    Fail(String),
}

/// Completion backend that replays queued responses
pub struct ScriptedBackend {
    completions: Mutex<VecDeque<ScriptedCompletion>>,
    streams: Mutex<VecDeque<ScriptedStream>>,
    requests: Mutex<Vec<CompletionRequest>>,
    /// Size of each chunk when splitting text responses
    chunk_size: usize,
    logger: SharedLogger,
}

impl ScriptedBackend {
    pub fn new(logger: SharedLogger) -> Self {
        Self {
            completions: Mutex::new(VecDeque::new()),
            streams: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            chunk_size: 10,
            logger,
        }
    }

    /// Queue a non-streamed response
    pub fn respond(self, response: CompletionResponse) -> Self {
        self.completions
            .lock()
            .push_back(ScriptedCompletion::Respond(response));
        self
    }

    /// Queue a failing non-streamed request
    pub fn fail_completion(self, message: impl Into<String>) -> Self {
        self.completions
            .lock()
            .push_back(ScriptedCompletion::Fail(message.into()));
        self
    }

    /// Queue a streamed response
    pub fn stream_with(self, scripted: ScriptedStream) -> Self {
        self.streams.lock().push_back(scripted);
        self
    }

    /// Set chunk size for splitting responses
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Every request received so far, in order
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }

    fn record(&self, request: CompletionRequest) {
        self.requests.lock().push(request);
    }

    fn last_user_message(messages: &[ConversationMessage]) -> String {
        messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(ConversationMessage::text)
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| "Hello from ScriptedBackend!".to_string())
    }

    /// Split text into chunks
    fn split_into_chunks(&self, text: &str) -> Vec<String> {
        if self.chunk_size == 0 || text.is_empty() {
            return vec![text.to_string()];
        }

        text.chars()
            .collect::<Vec<_>>()
            .chunks(self.chunk_size)
            .map(|c| c.iter().collect())
            .collect()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> CompletionResult<CompletionResponse> {
        log_debug!(self.logger, "[ScriptedBackend] complete called");
        let echo = format!("Echo: {}", Self::last_user_message(&request.messages));
        self.record(request);

        match self.completions.lock().pop_front() {
            Some(ScriptedCompletion::Respond(response)) => Ok(response),
            Some(ScriptedCompletion::Fail(message)) => Err(CompletionError::api("scripted", message)),
            None => Ok(CompletionResponse::text(echo)),
        }
    }

    async fn stream(&self, request: CompletionRequest) -> CompletionResult<CompletionStream> {
        log_debug!(self.logger, "[ScriptedBackend] stream called");
        let scripted = self
            .streams
            .lock()
            .pop_front()
            .unwrap_or_else(|| {
                ScriptedStream::Text(format!("Echo: {}", Self::last_user_message(&request.messages)))
            });
        self.record(request);

        let (chunks, failure) = match scripted {
            ScriptedStream::Text(text) => (self.split_into_chunks(&text), None),
            ScriptedStream::Chunks(chunks) => (chunks, None),
            ScriptedStream::Error { chunks, message } => (chunks, Some(message)),
            ScriptedStream::Empty => (Vec::new(), None),
        };

        let logger = self.logger.clone();

        let items = chunks
            .into_iter()
            .map(Ok)
            .chain(failure.map(Err))
            .enumerate()
            .collect::<Vec<_>>();

        let stream = stream::iter(items).map(move |(i, item)| match item {
            Ok(chunk) => {
                log_debug!(logger, "[ScriptedBackend] Yielding chunk {}: '{}'", i, chunk);
                Ok(StreamChunk::text(chunk))
            }
            Err(message) => Err(CompletionError::Stream(message)),
        });

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use crate::types::ToolCallRequest;
    use std::sync::Arc;

    fn test_logger() -> SharedLogger {
        Arc::new(NoOpLogger::new())
    }

    fn request(content: &str) -> CompletionRequest {
        CompletionRequest::new("scripted-model", vec![ConversationMessage::user(content)])
    }

    async fn collect(stream: CompletionStream) -> Vec<CompletionResult<StreamChunk>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn test_echo_when_unscripted() {
        let backend = ScriptedBackend::new(test_logger());
        let response = backend.complete(request("Hello, world!")).await.unwrap();
        assert_eq!(response, CompletionResponse::text("Echo: Hello, world!"));

        let chunks = collect(backend.stream(request("again")).await.unwrap()).await;
        let text: String = chunks
            .into_iter()
            .map(|c| c.unwrap().as_text().unwrap_or_default().to_string())
            .collect();
        assert_eq!(text, "Echo: again");
    }

    #[tokio::test]
    async fn test_queued_responses_in_order() {
        let calls = vec![ToolCallRequest::new("1", "get-current-time", "{}")];
        let backend = ScriptedBackend::new(test_logger())
            .respond(CompletionResponse::tool_calls(calls.clone()))
            .fail_completion("overloaded");

        assert_eq!(
            backend.complete(request("a")).await.unwrap(),
            CompletionResponse::tool_calls(calls)
        );
        assert_eq!(
            backend.complete(request("b")).await.unwrap_err(),
            CompletionError::api("scripted", "overloaded")
        );
        assert_eq!(backend.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_chunked_mode() {
        let chunks = vec!["First ".to_string(), "second ".to_string(), "third.".to_string()];
        let backend = ScriptedBackend::new(test_logger())
            .stream_with(ScriptedStream::Chunks(chunks.clone()));

        let received: Vec<String> = collect(backend.stream(request("x")).await.unwrap())
            .await
            .into_iter()
            .map(|c| c.unwrap().as_text().unwrap_or_default().to_string())
            .collect();
        assert_eq!(received, chunks);
    }

    #[tokio::test]
    async fn test_error_after_chunks() {
        let backend = ScriptedBackend::new(test_logger()).stream_with(ScriptedStream::Error {
            chunks: vec!["partial".to_string()],
            message: "connection reset".to_string(),
        });

        let items = collect(backend.stream(request("x")).await.unwrap()).await;
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert_eq!(
            items[1].clone().unwrap_err(),
            CompletionError::Stream("connection reset".to_string())
        );
    }

    #[test]
    fn test_chunk_splitting() {
        let backend = ScriptedBackend::new(test_logger()).with_chunk_size(5);
        let chunks = backend.split_into_chunks("Hello, world!");

        assert_eq!(chunks, vec!["Hello", ", wor", "ld!"]);
    }
}
