//! ConversationOrchestrator - drives one query end to end

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::try_join_all;
use futures::StreamExt;

use super::turn::{OrchestratorSettings, Turn, TurnState};
use crate::backend::{
    CompletionBackend, CompletionError, CompletionRequest, CompletionResponse, StopReason,
};
use crate::error::RelayResult;
use crate::logging::SharedLogger;
use crate::tools::RegistryHandle;
use crate::types::{ConversationMessage, ToolCallRequest};
use crate::{log_debug, log_info, log_warn};

/// Runs queries against a completion backend and a tool registry.
///
/// Holds no per-query state: each call to [`query`](Self::query) builds its
/// own message log and drops it when the query resolves.
pub struct ConversationOrchestrator {
    backend: Arc<dyn CompletionBackend>,
    settings: OrchestratorSettings,
    logger: SharedLogger,
}

impl ConversationOrchestrator {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        settings: OrchestratorSettings,
        logger: SharedLogger,
    ) -> Self {
        Self {
            backend,
            settings,
            logger,
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Answer one query.
    ///
    /// `on_fragment` receives the answer text as it arrives: once for a
    /// direct answer, chunk by chunk for a streamed follow-up. Any tool,
    /// argument, provider or backend failure aborts the turn and is returned
    /// unchanged. Nothing is retried.
    pub async fn query<F>(
        &self,
        registry: &RegistryHandle,
        query: &str,
        mut on_fragment: F,
    ) -> RelayResult<Turn>
    where
        F: FnMut(&str) + Send,
    {
        let mut path = vec![TurnState::Initiating];
        let mut messages = Vec::new();
        if let Some(prompt) = &self.settings.system_prompt {
            messages.push(ConversationMessage::system(prompt.clone()));
        }
        messages.push(ConversationMessage::user(query));

        log_info!(
            self.logger,
            "[Orchestrator] Query with {} tools available",
            registry.tool_count()
        );

        let initial = CompletionRequest::new(&self.settings.model, messages.clone())
            .with_tools(registry.tools().to_vec());
        let response = self.backend.complete(initial).await?;
        match response.stop_reason() {
            StopReason::Length => log_warn!(
                self.logger,
                "[Orchestrator] Initial completion was cut off at the output limit"
            ),
            reason => log_debug!(self.logger, "[Orchestrator] Initial completion stopped: {:?}", reason),
        }

        let (content, calls) = match response {
            CompletionResponse::ToolCalls { content, calls } if !calls.is_empty() => (content, calls),
            CompletionResponse::ToolCalls { content, .. } => {
                return Ok(self.direct_answer(messages, path, content.unwrap_or_default(), &mut on_fragment))
            }
            CompletionResponse::Final { content, .. } => {
                return Ok(self.direct_answer(messages, path, content, &mut on_fragment))
            }
        };

        path.push(TurnState::Dispatching);
        self.ensure_unique_ids(&calls)?;
        log_info!(
            self.logger,
            "[Orchestrator] Dispatching {} tool calls",
            calls.len()
        );

        messages.push(ConversationMessage::assistant_tool_calls(content, calls.clone()));

        // All calls run concurrently; the first failure drops the rest
        let results = try_join_all(calls.iter().map(|call| registry.dispatch_call(call)))
            .await
            .map_err(|e| {
                log_warn!(self.logger, "[Orchestrator] Turn aborted: {}", e);
                e
            })?;
        let dispatched = results.len();
        messages.extend(results.into_iter().map(ConversationMessage::tool));

        path.push(TurnState::AwaitingFollowUp);
        let follow_up = CompletionRequest::new(&self.settings.model, messages.clone())
            .with_max_output_tokens(self.settings.follow_up_max_tokens)
            .streaming();
        let mut stream = self.backend.stream(follow_up).await?;

        path.push(TurnState::Streaming);
        let mut answer = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if let Some(text) = chunk.as_text() {
                on_fragment(text);
                answer.push_str(text);
            }
        }
        log_debug!(
            self.logger,
            "[Orchestrator] Follow-up streamed {} chars",
            answer.len()
        );

        messages.push(ConversationMessage::assistant(answer.clone()));
        path.push(TurnState::Done);

        Ok(Turn {
            messages,
            answer,
            dispatched,
            path,
        })
    }

    fn direct_answer<F>(
        &self,
        mut messages: Vec<ConversationMessage>,
        mut path: Vec<TurnState>,
        content: String,
        on_fragment: &mut F,
    ) -> Turn
    where
        F: FnMut(&str),
    {
        log_debug!(self.logger, "[Orchestrator] Direct answer, no tools used");
        on_fragment(&content);
        messages.push(ConversationMessage::assistant(content.clone()));
        path.push(TurnState::Done);
        Turn {
            messages,
            answer: content,
            dispatched: 0,
            path,
        }
    }

    /// Tool-call ids only need to be unique within one response
    fn ensure_unique_ids(&self, calls: &[ToolCallRequest]) -> Result<(), CompletionError> {
        let mut seen = HashSet::new();
        for call in calls {
            if !seen.insert(call.id.as_str()) {
                return Err(CompletionError::invalid_response(
                    self.backend.name(),
                    format!("duplicate tool call id {}", call.id),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ScriptedBackend, ScriptedStream};
    use crate::builtin::{ClockProvider, WeatherProvider};
    use crate::error::RelayError;
    use crate::logging::{LogLevel, MemoryLogger, NoOpLogger};
    use crate::protocol::ToolDefinition;
    use crate::server::{ProviderFault, ToolProvider};
    use crate::tools::{ProviderEndpoint, ToolRegistry};
    use crate::types::{ContentBlock, MessageRole};
    use async_trait::async_trait;
    use chrono::{FixedOffset, TimeZone};
    use serde_json::{json, Map, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Barrier;

    fn logger() -> SharedLogger {
        Arc::new(NoOpLogger::new())
    }

    /// Provider whose tools wait on a shared barrier before answering
    struct Gate {
        name: &'static str,
        tools: Vec<&'static str>,
        barrier: Option<Arc<Barrier>>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ToolProvider for Gate {
        fn name(&self) -> &str {
            self.name
        }

        async fn list_tools(&self) -> Vec<ToolDefinition> {
            self.tools
                .iter()
                .map(|t| ToolDefinition::new(*t, "gate", json!({"type": "object"})))
                .collect()
        }

        async fn call_tool(
            &self,
            name: &str,
            _arguments: Map<String, Value>,
        ) -> Result<Vec<ContentBlock>, ProviderFault> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(barrier) = &self.barrier {
                barrier.wait().await;
            }
            Ok(vec![ContentBlock::text(format!("{} via {}", name, self.name))])
        }
    }

    fn gate(
        name: &'static str,
        tools: Vec<&'static str>,
        barrier: Option<Arc<Barrier>>,
    ) -> (ProviderEndpoint, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = Gate {
            name,
            tools,
            barrier,
            calls: calls.clone(),
        };
        (ProviderEndpoint::in_process(provider), calls)
    }

    fn orchestrator(backend: Arc<ScriptedBackend>) -> ConversationOrchestrator {
        ConversationOrchestrator::new(
            backend,
            OrchestratorSettings::new("test-model").with_system_prompt("plain text"),
            logger(),
        )
    }

    fn call(id: &str, name: &str, arguments: &str) -> ToolCallRequest {
        ToolCallRequest::new(id, name, arguments)
    }

    #[tokio::test]
    async fn direct_answer_skips_dispatch() {
        let (endpoint, calls) = gate("a", vec!["alpha"], None);
        let registry = ToolRegistry::new(logger()).register(vec![endpoint]).await.unwrap();
        let backend = Arc::new(ScriptedBackend::new(logger()).respond(CompletionResponse::text("Hi!")));

        let mut fragments = Vec::new();
        let turn = orchestrator(backend.clone())
            .query(&registry, "hello", |f| fragments.push(f.to_string()))
            .await
            .unwrap();

        assert_eq!(fragments, vec!["Hi!"]);
        assert_eq!(turn.answer, "Hi!");
        assert_eq!(turn.path, vec![TurnState::Initiating, TurnState::Done]);
        assert!(!turn.used_tools());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].tools.len(), 1);
        assert!(!requests[0].stream);
        assert_eq!(requests[0].messages[0].role, MessageRole::System);
        assert_eq!(requests[0].messages[1].text(), "hello");
    }

    #[tokio::test]
    async fn truncated_direct_answer_is_forwarded_with_a_warning() {
        let memory = Arc::new(MemoryLogger::new());
        let (endpoint, _) = gate("a", vec!["alpha"], None);
        let registry = ToolRegistry::new(logger()).register(vec![endpoint]).await.unwrap();
        let backend = Arc::new(ScriptedBackend::new(logger()).respond(CompletionResponse::Final {
            content: "The weather in".into(),
            stop_reason: StopReason::Length,
        }));

        let turn = ConversationOrchestrator::new(
            backend,
            OrchestratorSettings::new("test-model"),
            memory.clone(),
        )
        .query(&registry, "weather?", |_| {})
        .await
        .unwrap();

        assert_eq!(turn.answer, "The weather in");
        let warnings = memory.messages(LogLevel::Warn);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("cut off"));
    }

    #[tokio::test]
    async fn fan_out_appends_one_tool_message_per_call_before_follow_up() {
        let (a, a_calls) = gate("a", vec!["alpha", "beta"], None);
        let (b, b_calls) = gate("b", vec!["gamma"], None);
        let registry = ToolRegistry::new(logger()).register(vec![a, b]).await.unwrap();

        let backend = Arc::new(
            ScriptedBackend::new(logger())
                .respond(CompletionResponse::tool_calls(vec![
                    call("c1", "alpha", "{}"),
                    call("c2", "gamma", ""),
                    call("c3", "beta", "{}"),
                ]))
                .stream_with(ScriptedStream::Chunks(vec!["All ".into(), "done".into()])),
        );

        let mut fragments = Vec::new();
        let turn = orchestrator(backend.clone())
            .query(&registry, "do three things", |f| fragments.push(f.to_string()))
            .await
            .unwrap();

        assert_eq!(a_calls.load(Ordering::SeqCst), 2);
        assert_eq!(b_calls.load(Ordering::SeqCst), 1);
        assert_eq!(turn.dispatched, 3);
        assert_eq!(fragments, vec!["All ", "done"]);
        assert_eq!(turn.answer, "All done");
        assert_eq!(
            turn.path,
            vec![
                TurnState::Initiating,
                TurnState::Dispatching,
                TurnState::AwaitingFollowUp,
                TurnState::Streaming,
                TurnState::Done,
            ]
        );

        let requests = backend.requests();
        assert_eq!(requests.len(), 2);
        let follow_up = &requests[1];
        assert!(follow_up.stream);
        assert!(follow_up.tools.is_empty());
        assert_eq!(follow_up.max_output_tokens, Some(512));

        // system, user, assistant tool calls, then the three results
        assert_eq!(follow_up.messages.len(), 6);
        assert_eq!(follow_up.messages[2].tool_calls.len(), 3);
        let tool_messages: Vec<_> = follow_up.messages[3..].iter().collect();
        assert!(tool_messages.iter().all(|m| m.role == MessageRole::Tool));

        let mut by_id: Vec<(String, String)> = tool_messages
            .iter()
            .map(|m| (m.tool_call_id.clone().unwrap(), m.text()))
            .collect();
        by_id.sort();
        assert_eq!(
            by_id,
            vec![
                ("c1".to_string(), "alpha via a".to_string()),
                ("c2".to_string(), "gamma via b".to_string()),
                ("c3".to_string(), "beta via a".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn calls_in_one_response_run_concurrently() {
        // Neither call can finish until both have started
        let barrier = Arc::new(Barrier::new(2));
        let (a, _) = gate("a", vec!["left"], Some(barrier.clone()));
        let (b, _) = gate("b", vec!["right"], Some(barrier));
        let registry = ToolRegistry::new(logger()).register(vec![a, b]).await.unwrap();

        let backend = Arc::new(ScriptedBackend::new(logger()).respond(
            CompletionResponse::tool_calls(vec![call("1", "left", "{}"), call("2", "right", "{}")]),
        ));

        let turn = tokio::time::timeout(
            Duration::from_secs(2),
            orchestrator(backend).query(&registry, "both", |_| {}),
        )
        .await
        .expect("tool calls were serialized")
        .unwrap();
        assert_eq!(turn.dispatched, 2);
    }

    #[tokio::test]
    async fn unknown_tool_aborts_before_follow_up() {
        let (a, a_calls) = gate("a", vec!["alpha"], None);
        let registry = ToolRegistry::new(logger()).register(vec![a]).await.unwrap();
        let backend = Arc::new(ScriptedBackend::new(logger()).respond(
            CompletionResponse::tool_calls(vec![call("1", "alpha", "{}"), call("2", "omega", "{}")]),
        ));

        let mut fragments = 0;
        let err = orchestrator(backend.clone())
            .query(&registry, "q", |_| fragments += 1)
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::ToolNotFound(ref name) if name == "omega"));
        assert_eq!(backend.requests().len(), 1);
        assert_eq!(fragments, 0);
        assert!(a_calls.load(Ordering::SeqCst) <= 1);
    }

    #[tokio::test]
    async fn malformed_arguments_abort_the_turn() {
        let weather = WeatherProvider::demo();
        let registry = ToolRegistry::new(logger())
            .register(vec![ProviderEndpoint::in_process(weather)])
            .await
            .unwrap();
        let backend = Arc::new(ScriptedBackend::new(logger()).respond(
            CompletionResponse::tool_calls(vec![call("1", "get-weather", "{\"city\": ")]),
        ));

        let err = orchestrator(backend.clone())
            .query(&registry, "q", |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::InvalidArguments { .. }));
        assert_eq!(backend.requests().len(), 1);
    }

    #[tokio::test]
    async fn provider_fault_propagates() {
        let registry = ToolRegistry::new(logger())
            .register(vec![ProviderEndpoint::in_process(WeatherProvider::demo())])
            .await
            .unwrap();
        let backend = Arc::new(ScriptedBackend::new(logger()).respond(
            CompletionResponse::tool_calls(vec![call("1", "get-weather", "{\"city\":\"Atlantis\"}")]),
        ));

        let err = orchestrator(backend)
            .query(&registry, "q", |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Provider { ref tool, .. } if tool == "get-weather"));
    }

    #[tokio::test]
    async fn duplicate_call_ids_in_one_response_are_rejected() {
        let (a, a_calls) = gate("a", vec!["alpha"], None);
        let registry = ToolRegistry::new(logger()).register(vec![a]).await.unwrap();
        let backend = Arc::new(ScriptedBackend::new(logger()).respond(
            CompletionResponse::tool_calls(vec![call("x", "alpha", "{}"), call("x", "alpha", "{}")]),
        ));

        let err = orchestrator(backend)
            .query(&registry, "q", |_| {})
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RelayError::Completion(CompletionError::InvalidResponse { .. })
        ));
        assert_eq!(a_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn call_ids_may_repeat_across_queries() {
        let (a, a_calls) = gate("a", vec!["alpha"], None);
        let registry = ToolRegistry::new(logger()).register(vec![a]).await.unwrap();
        let backend = Arc::new(
            ScriptedBackend::new(logger())
                .respond(CompletionResponse::tool_calls(vec![call("call_0", "alpha", "{}")]))
                .respond(CompletionResponse::tool_calls(vec![call("call_0", "alpha", "{}")])),
        );
        let orchestrator = orchestrator(backend);

        orchestrator.query(&registry, "first", |_| {}).await.unwrap();
        orchestrator.query(&registry, "second", |_| {}).await.unwrap();
        assert_eq!(a_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn backend_errors_propagate_unchanged() {
        let registry = ToolRegistry::new(logger()).register(vec![]).await.unwrap();
        let backend = Arc::new(ScriptedBackend::new(logger()).fail_completion("model offline"));

        let err = orchestrator(backend)
            .query(&registry, "q", |_| {})
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RelayError::Completion(CompletionError::Api { ref message, .. }) if message == "model offline"
        ));
    }

    #[tokio::test]
    async fn stream_failure_surfaces_after_forwarded_fragments() {
        let (a, _) = gate("a", vec!["alpha"], None);
        let registry = ToolRegistry::new(logger()).register(vec![a]).await.unwrap();
        let backend = Arc::new(
            ScriptedBackend::new(logger())
                .respond(CompletionResponse::tool_calls(vec![call("1", "alpha", "{}")]))
                .stream_with(ScriptedStream::Error {
                    chunks: vec!["Partial".into()],
                    message: "reset".into(),
                }),
        );

        let mut fragments = Vec::new();
        let err = orchestrator(backend)
            .query(&registry, "q", |f| fragments.push(f.to_string()))
            .await
            .unwrap_err();
        assert_eq!(fragments, vec!["Partial"]);
        assert!(matches!(err, RelayError::Completion(CompletionError::Stream(_))));
    }

    #[tokio::test]
    async fn time_and_weather_in_osaka() {
        let noon = FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 4, 1, 12, 30, 0)
            .unwrap();
        let registry = ToolRegistry::new(logger())
            .register(vec![
                ProviderEndpoint::in_process(ClockProvider::fixed(noon)),
                ProviderEndpoint::in_process(WeatherProvider::demo()),
            ])
            .await
            .unwrap();

        let backend = Arc::new(
            ScriptedBackend::new(logger())
                .respond(CompletionResponse::tool_calls(vec![
                    call("call_time", "get-current-time", "{}"),
                    call("call_weather", "get-weather", "{\"city\":\"Osaka\"}"),
                ]))
                .stream_with(ScriptedStream::Text(
                    "It is 12:30 on Monday, and Osaka is sunny.".into(),
                ))
                .with_chunk_size(7),
        );

        let mut streamed = String::new();
        let turn = orchestrator(backend.clone())
            .query(
                &registry,
                "What time is it, and what's the weather in Osaka?",
                |f| streamed.push_str(f),
            )
            .await
            .unwrap();

        assert_eq!(turn.dispatched, 2);
        assert_eq!(streamed, "It is 12:30 on Monday, and Osaka is sunny.");

        let follow_up = &backend.requests()[1];
        let time = follow_up
            .messages
            .iter()
            .find(|m| m.tool_call_id.as_deref() == Some("call_time"))
            .unwrap();
        assert!(time.text().contains("Monday, April 1, 2024"), "{}", time.text());
        let weather = follow_up
            .messages
            .iter()
            .find(|m| m.tool_call_id.as_deref() == Some("call_weather"))
            .unwrap();
        assert!(weather.text().contains("Osaka"), "{}", weather.text());

        registry.close().await.unwrap();
    }
}
