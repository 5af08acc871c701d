//! How the registry reaches a provider

use std::sync::Arc;

use crate::connection::ToolConnection;
use crate::mcp::RemoteServer;
use crate::server::ToolProvider;
use crate::transport::Transport;

/// A provider to register
pub enum ProviderEndpoint {
    /// Hosted in this process behind a fresh [`TransportPair`](crate::transport::TransportPair)
    InProcess(Arc<dyn ToolProvider>),
    /// Already reachable over a transport, e.g. a [`StreamTransport`](crate::transport::StreamTransport)
    Transport(Arc<dyn Transport>),
    /// A remote MCP server
    Remote(RemoteServer),
    /// An already-open connection
    Connected(Box<dyn ToolConnection>),
}

impl ProviderEndpoint {
    pub fn in_process(provider: impl ToolProvider + 'static) -> Self {
        Self::InProcess(Arc::new(provider))
    }
}

impl std::fmt::Debug for ProviderEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InProcess(provider) => write!(f, "InProcess({})", provider.name()),
            Self::Transport(_) => write!(f, "Transport"),
            Self::Remote(server) => write!(f, "Remote({})", server.name),
            Self::Connected(connection) => write!(f, "Connected({})", connection.provider_name()),
        }
    }
}
