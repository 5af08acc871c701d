//! Protocol frames exchanged between a tool provider and its consumer
//!
//! A small JSON-RPC 2.0 dialect covering discovery (`tools/list`) and
//! invocation (`tools/call`), preceded by an `initialize` handshake. The wire
//! shapes follow the Model Context Protocol, so frames produced here are
//! readable by MCP tooling.

mod jsonrpc;
mod messages;

pub use jsonrpc::{
    Frame, JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId, INTERNAL_ERROR,
    INVALID_PARAMS, METHOD_NOT_FOUND,
};
pub use messages::{
    CallToolParams, CallToolResult, Implementation, InitializeParams, InitializeResult,
    ListToolsResult, ToolDefinition, METHOD_INITIALIZE, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST,
    PROTOCOL_VERSION,
};
