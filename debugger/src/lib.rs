//! High level controller for a `codeslayer-jdebugger` session
mod commands;
mod debugger;
pub mod ide;
mod internals;
pub(crate) mod state;
mod types;

pub use commands::Command;
pub use debugger::Debugger;
pub use state::Event;
pub use types::{Breakpoint, BreakpointSet};
