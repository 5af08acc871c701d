//! MCP client using the official rmcp SDK

use std::path::PathBuf;

use async_trait::async_trait;
use rmcp::{
    model::{CallToolRequestParams, ClientCapabilities, ClientInfo, Implementation, Tool},
    service::RunningService,
    RoleClient, ServiceExt,
};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::RwLock;

#[cfg(unix)]
use tokio::net::UnixStream;

use crate::connection::ToolConnection;
use crate::error::{RelayError, RelayResult};
use crate::logging::SharedLogger;
use crate::protocol::ToolDefinition;
use crate::transport::TransportError;
use crate::types::ContentBlock;
use crate::log_info;

/// MCP client errors
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The client was already closed
    #[error("Connection closed")]
    Closed,
}

pub type McpResult<T> = Result<T, McpError>;

impl From<McpError> for RelayError {
    fn from(err: McpError) -> Self {
        match err {
            McpError::Closed => RelayError::Connection(TransportError::Closed),
            McpError::Io(e) => RelayError::Connection(e.into()),
            McpError::ConnectionFailed(m) | McpError::InitializationFailed(m) => {
                RelayError::Connection(TransportError::Io(m))
            }
            McpError::Protocol(m) => RelayError::Protocol(m),
        }
    }
}

/// Where a remote provider lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteTarget {
    /// Streamable HTTP endpoint
    Url(String),
    /// Unix domain socket
    Socket(PathBuf),
}

/// A named remote provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteServer {
    pub name: String,
    pub target: RemoteTarget,
}

impl RemoteServer {
    pub fn url(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: RemoteTarget::Url(url.into()),
        }
    }

    pub fn socket(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            target: RemoteTarget::Socket(path.into()),
        }
    }
}

/// MCP client for one remote tool provider
pub struct McpClient {
    /// Name used in routing and error messages
    name: String,
    /// The underlying rmcp running service, taken on close
    client: RwLock<Option<RunningService<RoleClient, ClientInfo>>>,
    logger: SharedLogger,
}

fn client_info() -> ClientInfo {
    ClientInfo {
        meta: None,
        protocol_version: Default::default(),
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: "toolrelay-core".to_string(),
            title: Some("ToolRelay".to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),
            website_url: None,
            icons: None,
        },
    }
}

impl McpClient {
    /// Connect to a configured remote provider
    pub async fn connect(server: &RemoteServer, logger: SharedLogger) -> McpResult<Self> {
        let client = match &server.target {
            RemoteTarget::Url(url) => Self::connect_http(url, logger).await?,
            #[cfg(unix)]
            RemoteTarget::Socket(path) => Self::connect_unix(path, logger).await?,
            #[cfg(not(unix))]
            RemoteTarget::Socket(path) => {
                return Err(McpError::ConnectionFailed(format!(
                    "Unix sockets are not supported on this platform: {}",
                    path.display()
                )))
            }
        };
        Ok(client.with_name(server.name.clone()))
    }

    /// Connect to an MCP server over a Unix socket
    #[cfg(unix)]
    pub async fn connect_unix<P: AsRef<std::path::Path>>(
        socket_path: P,
        logger: SharedLogger,
    ) -> McpResult<Self> {
        let path = socket_path.as_ref();
        log_info!(logger, "[McpClient] Connecting to Unix socket: {:?}", path);

        let stream = UnixStream::connect(path)
            .await
            .map_err(|e| McpError::ConnectionFailed(e.to_string()))?;

        let client = client_info()
            .serve(stream)
            .await
            .map_err(|e| McpError::InitializationFailed(e.to_string()))?;

        log_info!(logger, "[McpClient] Connected and initialized successfully");

        Ok(Self::from_service(client, path.display().to_string(), logger))
    }

    /// Connect to an MCP server over HTTP (Streamable HTTP transport)
    pub async fn connect_http(url: &str, logger: SharedLogger) -> McpResult<Self> {
        use rmcp::transport::StreamableHttpClientTransport;

        log_info!(logger, "[McpClient] Connecting to HTTP: {}", url);

        let transport = StreamableHttpClientTransport::from_uri(url);

        let client = client_info()
            .serve(transport)
            .await
            .map_err(|e| McpError::InitializationFailed(e.to_string()))?;

        log_info!(logger, "[McpClient] Connected and initialized successfully");

        Ok(Self::from_service(client, url.to_string(), logger))
    }

    fn from_service(
        client: RunningService<RoleClient, ClientInfo>,
        fallback_name: String,
        logger: SharedLogger,
    ) -> Self {
        let name = client
            .peer_info()
            .map(|info| info.server_info.name.clone())
            .unwrap_or(fallback_name);
        Self {
            name,
            client: RwLock::new(Some(client)),
            logger,
        }
    }

    /// Override the provider name reported by the server
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// List all available tools
    async fn list_raw_tools(&self) -> McpResult<Vec<Tool>> {
        let guard = self.client.read().await;
        let client = guard.as_ref().ok_or(McpError::Closed)?;
        let result = client
            .list_tools(Default::default())
            .await
            .map_err(|e| McpError::Protocol(e.to_string()))?;

        log_info!(
            self.logger,
            "[McpClient] Listed {} tools from {}",
            result.tools.len(),
            self.name
        );

        Ok(result.tools)
    }
}

fn to_definition(tool: Tool) -> ToolDefinition {
    ToolDefinition {
        name: tool.name.to_string(),
        description: tool.description.map(|d| d.to_string()),
        input_schema: Value::Object(tool.input_schema.as_ref().clone()),
    }
}

/// Content kinds without a local counterpart are passed on as their JSON text
fn to_block<T: serde::Serialize>(content: &T) -> ContentBlock {
    let value = serde_json::to_value(content).unwrap_or(Value::Null);
    serde_json::from_value(value.clone()).unwrap_or_else(|_| ContentBlock::text(value.to_string()))
}

#[async_trait]
impl ToolConnection for McpClient {
    fn provider_name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> RelayResult<Vec<ToolDefinition>> {
        let tools = self.list_raw_tools().await?;
        Ok(tools.into_iter().map(to_definition).collect())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> RelayResult<Vec<ContentBlock>> {
        log_info!(self.logger, "[McpClient] Calling tool: {}", name);

        let params = CallToolRequestParams {
            meta: None,
            name: name.to_owned().into(),
            arguments: Some(arguments),
            task: None,
        };

        let guard = self.client.read().await;
        let client = guard.as_ref().ok_or(McpError::Closed)?;
        let result = client
            .call_tool(params)
            .await
            .map_err(|e| RelayError::provider(name, e.to_string()))?;

        let content: Vec<ContentBlock> = result.content.iter().map(to_block).collect();
        if result.is_error.unwrap_or(false) {
            let message = content
                .iter()
                .filter_map(ContentBlock::as_text)
                .collect::<Vec<_>>()
                .join("\n");
            return Err(RelayError::provider(name, message));
        }

        Ok(content)
    }

    /// Close the connection
    async fn close(&self) -> RelayResult<()> {
        let service = self.client.write().await.take();
        if let Some(service) = service {
            log_info!(self.logger, "[McpClient] Closing connection to {}", self.name);
            service
                .cancel()
                .await
                .map_err(|e| McpError::Protocol(e.to_string()))?;
        }
        Ok(())
    }
}
