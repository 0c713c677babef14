/// User commands accepted while a debuggee is active.
///
/// Each maps to a single protocol line; raw queries are forwarded verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Continue,
    StepOver,
    StepInto,
    StepOut,
    Quit,
    /// Arbitrary query text, e.g. `print widget`.
    Query(String),
}

impl Command {
    pub(crate) fn protocol_line(&self) -> &str {
        match self {
            Command::Continue => "c",
            Command::StepOver => "n",
            Command::StepInto => "s",
            Command::StepOut => "f",
            Command::Quit => "q",
            Command::Query(text) => text,
        }
    }
}
