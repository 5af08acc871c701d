//! Logging abstractions for runtime-agnostic logging
//!
//! Every component receives its logger explicitly as a [`SharedLogger`];
//! there is no process-wide logger.

mod traits;
mod sinks;
mod console;

pub use traits::{Logger, LogLevel, SharedLogger};
pub use sinks::{MemoryLogger, NoOpLogger};
pub use console::ConsoleLogger;
