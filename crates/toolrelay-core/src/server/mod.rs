//! Tool provider hosting
//!
//! A [`ToolProvider`] owns a set of tools. [`serve`] exposes it on a
//! [`Transport`](crate::transport::Transport), answering `initialize`,
//! `tools/list` and `tools/call` requests.

mod provider;
mod serve;

pub use provider::{ProviderFault, ToolProvider};
pub use serve::serve;
