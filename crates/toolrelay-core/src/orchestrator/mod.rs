//! Conversation orchestration
//!
//! One query runs through at most one round of tool dispatch:
//!
//! ```text
//! Initiating ──► Done
//!     │
//!     └──► Dispatching ──► AwaitingFollowUp ──► Streaming ──► Done
//! ```
//!
//! Every tool call of the initial response is dispatched concurrently and
//! the turn waits for all of them. The follow-up completion is streamed and
//! never offered tools, so a turn cannot loop.

mod conversation;
mod turn;

pub use conversation::ConversationOrchestrator;
pub use turn::{OrchestratorSettings, Turn, TurnState, DEFAULT_FOLLOW_UP_MAX_TOKENS};
