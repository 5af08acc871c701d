//! Protocol client over a frame transport

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::ToolConnection;
use crate::error::{RelayError, RelayResult};
use crate::logging::SharedLogger;
use crate::protocol::{
    CallToolParams, CallToolResult, Frame, InitializeParams, InitializeResult, JsonRpcRequest,
    JsonRpcResponse, ListToolsResult, RequestId, ToolDefinition, METHOD_INITIALIZE,
    METHOD_TOOLS_CALL, METHOD_TOOLS_LIST,
};
use crate::transport::{on_receive, Transport, TransportError};
use crate::types::ContentBlock;
use crate::{log_debug, log_info, log_warn};

type PendingMap = Arc<Mutex<HashMap<RequestId, oneshot::Sender<JsonRpcResponse>>>>;

/// Talks to a provider hosted on the far end of a [`Transport`].
///
/// Responses are matched to requests by id, so any number of calls can be
/// in flight at once. When the transport closes, every pending request
/// fails with [`TransportError::Closed`].
pub struct PairedConnection {
    provider_name: String,
    transport: Arc<dyn Transport>,
    pending: PendingMap,
    next_id: AtomicI64,
    reader: JoinHandle<()>,
    logger: SharedLogger,
}

impl PairedConnection {
    /// Start reading from `transport` and perform the `initialize` handshake
    pub async fn connect(transport: Arc<dyn Transport>, logger: SharedLogger) -> RelayResult<Self> {
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

        let reader = {
            let pending = pending.clone();
            let logger = logger.clone();
            on_receive(transport.clone(), move |frame| match frame {
                Frame::Response(response) => {
                    let waiter = pending.lock().remove(&response.id);
                    match waiter {
                        Some(tx) => {
                            let _ = tx.send(response);
                        }
                        None => log_debug!(
                            logger,
                            "[PairedConnection] Unmatched response {:?}",
                            response.id
                        ),
                    }
                }
                Frame::Request(request) => log_warn!(
                    logger,
                    "[PairedConnection] Ignoring request from provider: {}",
                    request.method
                ),
            })
        };

        let mut connection = Self {
            provider_name: String::new(),
            transport,
            pending,
            next_id: AtomicI64::new(1),
            reader,
            logger,
        };

        let response = connection
            .round_trip(METHOD_INITIALIZE, InitializeParams::default())
            .await?;
        let result: InitializeResult = decode(response, METHOD_INITIALIZE)?;
        connection.provider_name = result.server_info.name;

        log_info!(
            connection.logger,
            "[PairedConnection] Connected to {} {}",
            connection.provider_name,
            result.server_info.version
        );

        Ok(connection)
    }

    async fn round_trip<P>(&self, method: &str, params: P) -> RelayResult<JsonRpcResponse>
    where
        P: Serialize + Send,
    {
        let id = RequestId::Number(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id.clone(), tx);
        let _entry = PendingEntry {
            pending: &self.pending,
            id: id.clone(),
        };

        let request = JsonRpcRequest::new(id, method).with_params(params);
        self.transport.send(request.into()).await?;

        tokio::select! {
            biased;
            response = rx => response.map_err(|_| RelayError::Connection(TransportError::Closed)),
            _ = self.transport.closed() => Err(RelayError::Connection(TransportError::Closed)),
        }
    }
}

/// Removes a request's waiter however the call ends, including when the
/// caller drops the future before a response arrives.
struct PendingEntry<'a> {
    pending: &'a PendingMap,
    id: RequestId,
}

impl Drop for PendingEntry<'_> {
    fn drop(&mut self) {
        self.pending.lock().remove(&self.id);
    }
}

fn decode<T: serde::de::DeserializeOwned>(response: JsonRpcResponse, method: &str) -> RelayResult<T> {
    let value = response
        .into_result()
        .map_err(|e| RelayError::protocol(format!("{method} failed: {e}")))?;
    serde_json::from_value(value)
        .map_err(|e| RelayError::protocol(format!("{method} returned a malformed result: {e}")))
}

#[async_trait]
impl ToolConnection for PairedConnection {
    fn provider_name(&self) -> &str {
        &self.provider_name
    }

    async fn list_tools(&self) -> RelayResult<Vec<ToolDefinition>> {
        let response = self.round_trip(METHOD_TOOLS_LIST, Value::Object(Map::new())).await?;
        let result: ListToolsResult = decode(response, METHOD_TOOLS_LIST)?;
        Ok(result.tools)
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> RelayResult<Vec<ContentBlock>> {
        let params = CallToolParams {
            name: name.to_string(),
            arguments: Some(arguments),
        };
        let response = self.round_trip(METHOD_TOOLS_CALL, params).await?;

        let value = response
            .into_result()
            .map_err(|e| RelayError::provider(name, e.message))?;
        let result: CallToolResult = serde_json::from_value(value).map_err(|e| {
            RelayError::protocol(format!("{METHOD_TOOLS_CALL} returned a malformed result: {e}"))
        })?;

        if result.is_error {
            let message = result
                .content
                .iter()
                .filter_map(ContentBlock::as_text)
                .collect::<Vec<_>>()
                .join("\n");
            return Err(RelayError::provider(name, message));
        }

        Ok(result.content)
    }

    async fn close(&self) -> RelayResult<()> {
        log_debug!(
            self.logger,
            "[PairedConnection] Closing connection to {}",
            self.provider_name
        );
        self.transport.close().await;
        Ok(())
    }
}

impl Drop for PairedConnection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
