//! Tool registry: discovery, routing and dispatch

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::join_all;

use super::ProviderEndpoint;
use crate::connection::{PairedConnection, ToolConnection};
use crate::error::{RelayError, RelayResult};
use crate::logging::SharedLogger;
use crate::mcp::McpClient;
use crate::server::serve;
use crate::transport::{Transport, TransportPair};
use crate::types::{ContentBlock, ParameterSchema, ToolCallRequest, ToolCallResult, ToolDescriptor};
use crate::{log_debug, log_error, log_info, log_warn};

/// One open provider connection. Closed at most once.
struct ProviderConnection {
    connection: Box<dyn ToolConnection>,
    closed: AtomicBool,
}

impl ProviderConnection {
    fn new(connection: Box<dyn ToolConnection>) -> Self {
        Self {
            connection,
            closed: AtomicBool::new(false),
        }
    }

    fn provider_name(&self) -> &str {
        self.connection.provider_name()
    }

    async fn close(&self) -> RelayResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.connection.close().await
    }
}

struct Route {
    connection: Arc<ProviderConnection>,
    schema: ParameterSchema,
}

/// Builds a [`RegistryHandle`] from a set of provider endpoints
pub struct ToolRegistry {
    logger: SharedLogger,
}

impl ToolRegistry {
    /// Create a new tool registry
    pub fn new(logger: SharedLogger) -> Self {
        Self { logger }
    }

    /// Connect to every provider in order and index its tools.
    ///
    /// Fails on the first provider that cannot be reached, advertises an
    /// unusable schema, or advertises a tool name already taken by an earlier
    /// provider. Every connection opened up to that point is closed before
    /// the error is returned.
    pub async fn register(&self, endpoints: Vec<ProviderEndpoint>) -> RelayResult<RegistryHandle> {
        let mut connections = Vec::new();
        let mut descriptors = Vec::new();
        let mut routes = HashMap::new();

        let outcome = self
            .discover(endpoints, &mut connections, &mut descriptors, &mut routes)
            .await;

        if let Err(e) = outcome {
            log_error!(self.logger, "[ToolRegistry] Registration failed: {}", e);
            if let Err(close_err) = close_all(&connections, &self.logger).await {
                log_warn!(
                    self.logger,
                    "[ToolRegistry] Cleanup after failed registration: {}",
                    close_err
                );
            }
            return Err(e);
        }

        log_info!(
            self.logger,
            "[ToolRegistry] Registered {} tools from {} providers",
            descriptors.len(),
            connections.len()
        );

        Ok(RegistryHandle {
            descriptors,
            routes,
            connections,
            logger: self.logger.clone(),
        })
    }

    async fn discover(
        &self,
        endpoints: Vec<ProviderEndpoint>,
        connections: &mut Vec<Arc<ProviderConnection>>,
        descriptors: &mut Vec<ToolDescriptor>,
        routes: &mut HashMap<String, Route>,
    ) -> RelayResult<()> {
        for endpoint in endpoints {
            log_debug!(self.logger, "[ToolRegistry] Opening {:?}", endpoint);
            let connection = Arc::new(ProviderConnection::new(self.open(endpoint).await?));
            connections.push(connection.clone());

            let tools = connection.connection.list_tools().await?;
            log_info!(
                self.logger,
                "[ToolRegistry] Discovered {} tools from {}",
                tools.len(),
                connection.provider_name()
            );

            for tool in tools {
                if let Some(existing) = routes.get(&tool.name) {
                    return Err(RelayError::DuplicateTool {
                        name: tool.name,
                        first_provider: existing.connection.provider_name().to_string(),
                        second_provider: connection.provider_name().to_string(),
                    });
                }

                let schema = ParameterSchema::new(tool.input_schema).map_err(|reason| {
                    RelayError::InvalidSchema {
                        tool: tool.name.clone(),
                        reason,
                    }
                })?;

                routes.insert(
                    tool.name.clone(),
                    Route {
                        connection: connection.clone(),
                        schema: schema.clone(),
                    },
                );
                descriptors.push(ToolDescriptor::new(
                    tool.name,
                    tool.description.unwrap_or_default(),
                    schema,
                ));
            }
        }
        Ok(())
    }

    async fn open(&self, endpoint: ProviderEndpoint) -> RelayResult<Box<dyn ToolConnection>> {
        match endpoint {
            ProviderEndpoint::InProcess(provider) => {
                let pair = TransportPair::new();
                let server: Arc<dyn Transport> = Arc::new(pair.bind()?);
                serve(provider, server, self.logger.clone());
                Ok(Box::new(connect_over_pair(&pair, self.logger.clone()).await?))
            }
            ProviderEndpoint::Transport(transport) => Ok(Box::new(
                PairedConnection::connect(transport, self.logger.clone()).await?,
            )),
            ProviderEndpoint::Remote(server) => Ok(Box::new(
                McpClient::connect(&server, self.logger.clone()).await?,
            )),
            ProviderEndpoint::Connected(connection) => Ok(connection),
        }
    }
}

/// Connect the client side of a pair whose server side is already served.
/// On failure the pair is closed so the serving task stops.
async fn connect_over_pair(pair: &TransportPair, logger: SharedLogger) -> RelayResult<PairedConnection> {
    let outcome = match pair.connect_client() {
        Ok(client) => PairedConnection::connect(Arc::new(client), logger).await,
        Err(e) => Err(e.into()),
    };
    if outcome.is_err() {
        pair.close();
    }
    outcome
}

/// Close every connection concurrently and report the first failure in
/// registration order. A failure never stops the other closes.
async fn close_all(
    connections: &[Arc<ProviderConnection>],
    logger: &SharedLogger,
) -> RelayResult<()> {
    let results = join_all(connections.iter().map(|c| c.close())).await;

    let mut first = None;
    for (connection, result) in connections.iter().zip(results) {
        if let Err(e) = result {
            log_warn!(
                logger,
                "[ToolRegistry] Failed to close {}: {}",
                connection.provider_name(),
                e
            );
            first.get_or_insert(e);
        }
    }

    match first {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// The registered tool surface: schema list, dispatch and teardown.
///
/// Shared by reference with every query; dispatch takes `&self` so calls can
/// run concurrently.
pub struct RegistryHandle {
    descriptors: Vec<ToolDescriptor>,
    routes: HashMap<String, Route>,
    connections: Vec<Arc<ProviderConnection>>,
    logger: SharedLogger,
}

impl RegistryHandle {
    /// Every registered tool, in registration order
    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    pub fn descriptor(&self, name: &str) -> Option<&ToolDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    /// Name of the provider that owns `name`
    pub fn provider_of(&self, name: &str) -> Option<&str> {
        self.routes.get(name).map(|r| r.connection.provider_name())
    }

    pub fn tool_count(&self) -> usize {
        self.descriptors.len()
    }

    /// Invoke a tool by name with a JSON argument payload.
    ///
    /// The payload is decoded and checked against the tool's schema before
    /// the provider is contacted.
    pub async fn dispatch(&self, name: &str, payload: &str) -> RelayResult<Vec<ContentBlock>> {
        let route = self
            .routes
            .get(name)
            .ok_or_else(|| RelayError::ToolNotFound(name.to_string()))?;

        let arguments = route
            .schema
            .decode_arguments(payload)
            .map_err(|reason| RelayError::invalid_arguments(name, reason))?;

        log_info!(
            self.logger,
            "[ToolRegistry] Calling tool: {} ({})",
            name,
            route.connection.provider_name()
        );

        route.connection.connection.call_tool(name, arguments).await
    }

    /// Dispatch a model-issued call and tag the result with its call id
    pub async fn dispatch_call(&self, call: &ToolCallRequest) -> RelayResult<ToolCallResult> {
        let content = self.dispatch(&call.name, &call.arguments).await?;
        Ok(ToolCallResult::new(call.id.clone(), content))
    }

    /// Close every provider connection, best-effort and in parallel.
    ///
    /// All closes are attempted even when some fail; the first failure in
    /// registration order is returned. Closing again is a no-op.
    pub async fn close(&self) -> RelayResult<()> {
        log_info!(
            self.logger,
            "[ToolRegistry] Closing {} provider connections",
            self.connections.len()
        );
        close_all(&self.connections, &self.logger).await
    }
}
