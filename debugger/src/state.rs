use transport::{DebuggerColumn, SourceLocation};

use crate::ide::Project;

/// Lifecycle of one debuggee session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionState {
    /// No debuggee process exists.
    Idle,
    /// The debuggee was spawned and has not yet signalled readiness.
    Starting,
    /// `<ready/>` was received; commands are accepted.
    Active,
    /// The channel reported closed. Breakpoints are retained for replay.
    Closed,
}

/// Notifications published to the owning IDE.
///
/// These are emitted from the channel watch thread; the host drains the
/// receiver on its main loop before touching any widget state.
#[derive(Debug, Clone)]
pub enum Event {
    Uninitialised,
    /// A debuggee was spawned and is waiting to signal readiness.
    Started,
    /// The debuggee accepted its breakpoints and resumed execution.
    Running,
    /// Execution stopped; the IDE should select this editor location.
    SelectSource {
        location: SourceLocation,
        project: Project,
    },
    /// Variable inspection rows for the debugger pane's table view.
    VariableTable { rows: Vec<Vec<DebuggerColumn>> },
    /// The debuggee went away; a new session must be started explicitly.
    Ended,
}

impl From<SessionState> for Event {
    fn from(value: SessionState) -> Self {
        match value {
            SessionState::Idle => Event::Uninitialised,
            SessionState::Starting => Event::Started,
            SessionState::Active => Event::Running,
            SessionState::Closed => Event::Ended,
        }
    }
}
