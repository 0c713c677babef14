pub mod events;
pub mod process;

pub use events::{parse_event, DebugEvent, DebuggerColumn, SourceLocation};
pub use process::{ChannelEvent, ProcessChannel};
