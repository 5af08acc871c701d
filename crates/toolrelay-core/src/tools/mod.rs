//! Tool management module
//!
//! The registry connects to every tool provider once, builds the routing
//! table and the schema list handed to the model, and dispatches calls.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  RegistryHandle                             │
//! │                                             │
//! │  - Schema list for the model                │
//! │  - name -> provider connection              │
//! │  - Argument decoding before dispatch        │
//! │  - Parallel best-effort close               │
//! └─────────────────────────────────────────────┘
//!           │
//!           │ tools/list, tools/call
//!           ▼
//! ┌────────────────────┐  ┌────────────────────┐
//! │ In-process provider│  │ Remote MCP server  │
//! │ (TransportPair)    │  │ (socket / HTTP)    │
//! └────────────────────┘  └────────────────────┘
//! ```

mod endpoint;
mod registry;

pub use endpoint::ProviderEndpoint;
pub use registry::{RegistryHandle, ToolRegistry};
