use eyre::WrapErr;
use transport::{DebugEvent, ProcessChannel, SourceLocation};

use crate::{
    commands::Command,
    ide::{EditorMarks, ProjectResolver},
    state::{Event, SessionState},
    types::{Breakpoint, BreakpointSet},
};

pub(crate) struct DebuggerInternals {
    pub(crate) breakpoints: BreakpointSet,
    channel: ProcessChannel,
    state: SessionState,
    publisher: crossbeam_channel::Sender<Event>,
    resolver: Box<dyn ProjectResolver>,
}

impl DebuggerInternals {
    pub(crate) fn new(
        channel: ProcessChannel,
        publisher: crossbeam_channel::Sender<Event>,
        resolver: Box<dyn ProjectResolver>,
    ) -> Self {
        Self {
            breakpoints: BreakpointSet::new(),
            channel,
            state: SessionState::Idle,
            publisher,
            resolver,
        }
    }

    /// Spawn the debuggee. A session that is still starting or active is
    /// quit first, so at most one debuggee runs per controller.
    pub(crate) fn start(&mut self, launch_command: &[String]) -> eyre::Result<()> {
        if matches!(self.state, SessionState::Starting | SessionState::Active) {
            tracing::debug!("quitting the running debuggee before restart");
            self.send_raw("q");
            self.channel.stop();
        }

        self.channel
            .start(launch_command)
            .wrap_err("spawning debuggee")?;
        self.set_state(SessionState::Starting);
        Ok(())
    }

    /// Handle one line of debuggee output.
    pub(crate) fn on_line(&mut self, line: &str) {
        match transport::parse_event(line) {
            Some(DebugEvent::Ready) => self.on_ready(),
            Some(DebugEvent::HitBreakpoint(location)) | Some(DebugEvent::Step(location)) => {
                self.on_stopped(location)
            }
            Some(DebugEvent::PrintTable { rows }) => self.emit(Event::VariableTable { rows }),
            Some(DebugEvent::Unrecognized) => {
                tracing::debug!(line, "unrecognized debuggee output");
            }
            None => {
                tracing::warn!(line, "malformed debuggee event dropped");
            }
        }
    }

    /// Re-establish every breakpoint against the fresh debuggee, in
    /// insertion order, then resume it.
    fn on_ready(&mut self) {
        let commands: Vec<String> = self
            .breakpoints
            .iter()
            .map(|breakpoint| format!("break {breakpoint}"))
            .collect();
        for command in commands {
            self.send_raw(&command);
        }
        self.send_raw("c");
        self.set_state(SessionState::Active);
    }

    fn on_stopped(&mut self, location: SourceLocation) {
        let Some(project) = self.resolver.resolve_project_for_path(&location.file_path) else {
            tracing::warn!(
                path = %location.file_path.display(),
                "no project resolves the stopped location"
            );
            return;
        };
        self.emit(Event::SelectSource { location, project });
    }

    pub(crate) fn on_channel_closed(&mut self) {
        if self.channel.is_running() {
            // stale notification from a session that a restart superseded
            tracing::debug!("ignoring close notification from a superseded session");
            return;
        }
        if matches!(self.state, SessionState::Starting | SessionState::Active) {
            self.set_state(SessionState::Closed);
        }
    }

    /// Toggle the breakpoint at (class, line), mirroring the editor's
    /// gutter mark. A breakpoint added while the debuggee is active is
    /// pushed live; a removal only takes effect on the next replay.
    pub(crate) fn toggle_breakpoint(
        &mut self,
        editor: &dyn EditorMarks,
        class_name: &str,
        line_number: usize,
    ) {
        match self.breakpoints.find(class_name, line_number) {
            Some(_) => {
                let breakpoint = Breakpoint::new(class_name, line_number);
                self.breakpoints.remove(&breakpoint);
                editor.remove_mark(line_number);
            }
            None => {
                let breakpoint = Breakpoint::new(class_name, line_number);
                editor.add_mark(line_number);
                if self.state == SessionState::Active {
                    self.send_raw(&format!("break {breakpoint}"));
                }
                self.breakpoints.add(breakpoint);
            }
        }
    }

    /// Record a breakpoint without an editor, e.g. when restoring a saved
    /// session. Duplicates are skipped.
    pub(crate) fn restore_breakpoint(&mut self, breakpoint: Breakpoint) {
        if self
            .breakpoints
            .find(&breakpoint.class_name, breakpoint.line_number)
            .is_some()
        {
            return;
        }
        self.breakpoints.add(breakpoint);
    }

    pub(crate) fn attach_editor(&mut self, editor: &dyn EditorMarks, class_name: &str) {
        editor.enable_gutter();
        for breakpoint in self.breakpoints.iter() {
            if breakpoint.class_name == class_name {
                editor.add_mark(breakpoint.line_number);
            }
        }
    }

    pub(crate) fn detach_editor(&mut self, editor: &dyn EditorMarks) {
        editor.disable_gutter();
    }

    /// Issue a user command. Silently ignored unless a debuggee is active.
    pub(crate) fn command(&mut self, command: Command) {
        if self.state != SessionState::Active {
            tracing::debug!(?command, "ignoring command while no debuggee is active");
            return;
        }
        self.send_raw(command.protocol_line());
    }

    /// Fire-and-forget write; a failed send is logged and dropped.
    fn send_raw(&self, line: &str) {
        if let Err(e) = self.channel.send_line(line) {
            tracing::warn!(error = %e, line, "dropping command");
        }
    }

    fn set_state(&mut self, new_state: SessionState) {
        self.state = new_state;
        self.emit(Event::from(new_state));
    }

    fn emit(&self, event: Event) {
        let _ = self.publisher.send(event);
    }
}
