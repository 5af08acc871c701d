//! Remote tool providers over MCP (Model Context Protocol)
//!
//! Uses the official rmcp SDK to reach providers running in other processes.
//! Supports Unix socket and streamable HTTP transports.
//!
//! # Example
//!
//! ```rust,ignore
//! use toolrelay_core::mcp::{McpClient, RemoteServer};
//!
//! let server = RemoteServer::url("weather", "http://localhost:8931/mcp");
//! let client = McpClient::connect(&server, logger).await?;
//! let tools = client.list_tools().await?;
//! ```

mod client;

pub use client::{McpClient, McpError, McpResult, RemoteServer, RemoteTarget};
