//! Request loop for a hosted provider

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;

use super::{ProviderFault, ToolProvider};
use crate::logging::SharedLogger;
use crate::protocol::{
    CallToolParams, CallToolResult, Frame, Implementation, InitializeResult, JsonRpcError,
    JsonRpcRequest, JsonRpcResponse, ListToolsResult, RequestId, INTERNAL_ERROR, INVALID_PARAMS,
    METHOD_INITIALIZE, METHOD_NOT_FOUND, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST, PROTOCOL_VERSION,
};
use crate::transport::{on_receive, Transport};
use crate::{log_debug, log_warn};

/// Answer requests arriving on `transport` until it closes.
///
/// Each request is handled on its own task, so a slow tool does not hold up
/// the calls behind it. Responses go back in completion order and are
/// correlated by request id.
pub fn serve(
    provider: Arc<dyn ToolProvider>,
    transport: Arc<dyn Transport>,
    logger: SharedLogger,
) -> JoinHandle<()> {
    let replies = transport.clone();
    on_receive(transport, move |frame| match frame {
        Frame::Request(request) => {
            let provider = provider.clone();
            let transport = replies.clone();
            let logger = logger.clone();
            tokio::spawn(async move {
                let response = handle_request(provider.as_ref(), request, &logger).await;
                if let Err(e) = transport.send(response.into()).await {
                    log_debug!(logger, "[ToolServer] Dropping response: {}", e);
                }
            });
        }
        Frame::Response(response) => {
            log_warn!(
                logger,
                "[ToolServer] Ignoring unexpected response {:?}",
                response.id
            );
        }
    })
}

async fn handle_request(
    provider: &dyn ToolProvider,
    request: JsonRpcRequest,
    logger: &SharedLogger,
) -> JsonRpcResponse {
    let id = request.id.clone();
    log_debug!(
        logger,
        "[ToolServer] {} <- {}",
        provider.name(),
        request.method
    );

    match request.method.as_str() {
        METHOD_INITIALIZE => respond(
            id,
            &InitializeResult {
                protocol_version: PROTOCOL_VERSION.to_string(),
                server_info: Implementation {
                    name: provider.name().to_string(),
                    version: provider.version().to_string(),
                },
            },
        ),
        METHOD_TOOLS_LIST => {
            let tools = provider.list_tools().await;
            respond(id, &ListToolsResult { tools })
        }
        METHOD_TOOLS_CALL => {
            let params = match request
                .params
                .map(serde_json::from_value::<CallToolParams>)
            {
                Some(Ok(params)) => params,
                Some(Err(e)) => {
                    return JsonRpcResponse::failure(
                        id,
                        JsonRpcError::new(INVALID_PARAMS, format!("Invalid params: {e}")),
                    )
                }
                None => {
                    return JsonRpcResponse::failure(
                        id,
                        JsonRpcError::new(INVALID_PARAMS, "Missing params"),
                    )
                }
            };

            let arguments = params.arguments.unwrap_or_default();
            match provider.call_tool(&params.name, arguments).await {
                Ok(content) => respond(id, &CallToolResult::success(content)),
                Err(ProviderFault::UnknownTool(name)) => JsonRpcResponse::failure(
                    id,
                    JsonRpcError::new(INVALID_PARAMS, format!("Unknown tool: {name}")),
                ),
                Err(ProviderFault::Execution(message)) => {
                    log_warn!(
                        logger,
                        "[ToolServer] Tool {} failed: {}",
                        params.name,
                        message
                    );
                    respond(id, &CallToolResult::error(message))
                }
            }
        }
        other => JsonRpcResponse::failure(
            id,
            JsonRpcError::new(METHOD_NOT_FOUND, format!("Method not found: {other}")),
        ),
    }
}

fn respond<T: Serialize>(id: RequestId, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::failure(id, JsonRpcError::new(INTERNAL_ERROR, e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use crate::transport::TransportPair;
    use crate::types::ContentBlock;
    use async_trait::async_trait;
    use serde_json::{json, Map, Value};
    use std::time::Duration;
    use tokio::sync::Barrier;

    struct EchoProvider {
        barrier: Option<Barrier>,
    }

    #[async_trait]
    impl ToolProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn list_tools(&self) -> Vec<crate::protocol::ToolDefinition> {
            vec![crate::protocol::ToolDefinition::new(
                "echo",
                "Echo the input",
                json!({"type": "object"}),
            )]
        }

        async fn call_tool(
            &self,
            name: &str,
            arguments: Map<String, Value>,
        ) -> Result<Vec<ContentBlock>, ProviderFault> {
            if let Some(barrier) = &self.barrier {
                barrier.wait().await;
            }
            match name {
                "echo" => Ok(vec![ContentBlock::text(Value::Object(arguments).to_string())]),
                "fail" => Err(ProviderFault::execution("boom")),
                other => Err(ProviderFault::UnknownTool(other.to_string())),
            }
        }
    }

    fn hosted(provider: EchoProvider) -> (Arc<dyn Transport>, JoinHandle<()>) {
        let pair = TransportPair::new();
        let server: Arc<dyn Transport> = Arc::new(pair.bind().unwrap());
        let client: Arc<dyn Transport> = Arc::new(pair.connect_client().unwrap());
        let handle = serve(Arc::new(provider), server, Arc::new(NoOpLogger::new()));
        (client, handle)
    }

    async fn round_trip(client: &Arc<dyn Transport>, request: JsonRpcRequest) -> JsonRpcResponse {
        client.send(request.into()).await.unwrap();
        match tokio::time::timeout(Duration::from_secs(1), client.recv())
            .await
            .expect("response in time")
        {
            Some(Frame::Response(response)) => response,
            other => panic!("expected response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn initialize_reports_provider_name() {
        let (client, _handle) = hosted(EchoProvider { barrier: None });
        let response = round_trip(&client, JsonRpcRequest::new(1i64, METHOD_INITIALIZE)).await;
        let result: InitializeResult = serde_json::from_value(response.into_result().unwrap()).unwrap();
        assert_eq!(result.server_info.name, "echo");
        assert_eq!(result.server_info.version, "1.0.0");
    }

    #[tokio::test]
    async fn call_and_fault_mapping() {
        let (client, _handle) = hosted(EchoProvider { barrier: None });

        let ok = round_trip(
            &client,
            JsonRpcRequest::new(1i64, METHOD_TOOLS_CALL)
                .with_params(json!({"name": "echo", "arguments": {"x": 1}})),
        )
        .await;
        let result: CallToolResult = serde_json::from_value(ok.into_result().unwrap()).unwrap();
        assert!(!result.is_error);
        assert_eq!(result.content[0].as_text(), Some("{\"x\":1}"));

        let failed = round_trip(
            &client,
            JsonRpcRequest::new(2i64, METHOD_TOOLS_CALL).with_params(json!({"name": "fail"})),
        )
        .await;
        let result: CallToolResult = serde_json::from_value(failed.into_result().unwrap()).unwrap();
        assert!(result.is_error);

        let unknown = round_trip(
            &client,
            JsonRpcRequest::new(3i64, METHOD_TOOLS_CALL).with_params(json!({"name": "nope"})),
        )
        .await;
        assert_eq!(unknown.into_result().unwrap_err().code, INVALID_PARAMS);

        let bad_method = round_trip(&client, JsonRpcRequest::new(4i64, "resources/list")).await;
        assert_eq!(bad_method.into_result().unwrap_err().code, METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn concurrent_calls_overlap() {
        // Both calls must be in flight at once for the barrier to release
        let (client, _handle) = hosted(EchoProvider {
            barrier: Some(Barrier::new(2)),
        });

        for id in 0..2i64 {
            client
                .send(
                    JsonRpcRequest::new(id, METHOD_TOOLS_CALL)
                        .with_params(json!({"name": "echo"}))
                        .into(),
                )
                .await
                .unwrap();
        }

        for _ in 0..2 {
            let frame = tokio::time::timeout(Duration::from_secs(1), client.recv())
                .await
                .expect("calls should not serialize");
            assert!(matches!(frame, Some(Frame::Response(_))));
        }
    }

    #[tokio::test]
    async fn loop_ends_when_transport_closes() {
        let (client, handle) = hosted(EchoProvider { barrier: None });
        client.close().await;
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("serve loop should stop")
            .unwrap();
    }
}
