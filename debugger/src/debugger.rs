use std::sync::{Arc, Mutex, Weak};
use std::thread;

use transport::{ChannelEvent, ProcessChannel};

use crate::{
    commands::Command,
    ide::{EditorMarks, ProjectResolver},
    internals::DebuggerInternals,
    types::Breakpoint,
    Event,
};

/// Represents a debugging session against one `codeslayer-jdebugger`.
///
/// The controller reacts to editor gestures on the host's thread and to
/// debuggee output on a background watch thread; subscribers receive
/// [`Event`]s and apply them from the host's main loop.
pub struct Debugger {
    internals: Arc<Mutex<DebuggerInternals>>,
    rx: crossbeam_channel::Receiver<Event>,
}

impl Debugger {
    /// Create an idle controller. No debuggee is spawned until
    /// [`Debugger::start`] is called.
    #[tracing::instrument(skip(resolver))]
    pub fn new(resolver: Box<dyn ProjectResolver>) -> Self {
        // notify our subscribers
        let (tx, rx) = crossbeam_channel::unbounded();
        let _ = tx.send(Event::Uninitialised);

        let channel = ProcessChannel::new();
        let channel_events = channel.events();
        let internals = Arc::new(Mutex::new(DebuggerInternals::new(channel, tx, resolver)));

        // background thread draining the channel watch into our state; it
        // holds only a weak handle so dropping the debugger tears it down
        let background_internals: Weak<Mutex<DebuggerInternals>> = Arc::downgrade(&internals);
        thread::spawn(move || {
            while let Ok(event) = channel_events.recv() {
                let Some(internals) = background_internals.upgrade() else {
                    break;
                };
                let Ok(mut internals) = internals.lock() else {
                    break;
                };
                match event {
                    ChannelEvent::Line(line) => internals.on_line(&line),
                    ChannelEvent::Closed => internals.on_channel_closed(),
                }
            }
            tracing::debug!("channel watch terminated");
        });

        Self { internals, rx }
    }

    /// Return a [`crossbeam_channel::Receiver<Event>`] to subscribe to
    /// debugging events
    pub fn events(&self) -> crossbeam_channel::Receiver<Event> {
        self.rx.clone()
    }

    /// Spawn (or respawn) the debuggee with the given launcher command.
    /// A session that is still running is quit first.
    #[tracing::instrument(skip(self))]
    pub fn start(&self, launch_command: &[String]) -> eyre::Result<()> {
        self.with_internals(|internals| internals.start(launch_command))
    }

    /// Toggle the breakpoint at (class, line) for the given editor.
    #[tracing::instrument(skip(self, editor))]
    pub fn toggle_breakpoint(
        &self,
        editor: &dyn EditorMarks,
        class_name: &str,
        line_number: usize,
    ) {
        if let Err(e) = self.with_internals(|internals| {
            internals.toggle_breakpoint(editor, class_name, line_number);
            Ok(())
        }) {
            tracing::warn!(error = %e, "dropping breakpoint toggle");
        }
    }

    /// Record a breakpoint with no editor attached, e.g. one restored from
    /// a saved session.
    pub fn restore_breakpoint(&self, breakpoint: Breakpoint) {
        if let Err(e) = self.with_internals(|internals| {
            internals.restore_breakpoint(breakpoint);
            Ok(())
        }) {
            tracing::warn!(error = %e, "dropping restored breakpoint");
        }
    }

    /// Enable the breakpoint gutter on a newly opened editor and recreate
    /// the marks for its known breakpoints.
    pub fn attach_editor(&self, editor: &dyn EditorMarks, class_name: &str) {
        if let Err(e) = self.with_internals(|internals| {
            internals.attach_editor(editor, class_name);
            Ok(())
        }) {
            tracing::warn!(error = %e, "attaching editor");
        }
    }

    /// Tear down the gutter affordance; the breakpoints themselves survive.
    pub fn detach_editor(&self, editor: &dyn EditorMarks) {
        if let Err(e) = self.with_internals(|internals| {
            internals.detach_editor(editor);
            Ok(())
        }) {
            tracing::warn!(error = %e, "detaching editor");
        }
    }

    /// Return the list of breakpoints configured
    pub fn breakpoints(&self) -> Vec<Breakpoint> {
        self.with_internals(|internals| Ok(internals.breakpoints.iter().cloned().collect()))
            .unwrap_or_default()
    }

    /// Resume execution of the debuggee
    pub fn r#continue(&self) {
        self.command(Command::Continue);
    }

    /// Step over a statement
    pub fn step_over(&self) {
        self.command(Command::StepOver);
    }

    /// Step into a statement
    pub fn step_into(&self) {
        self.command(Command::StepInto);
    }

    /// Step out of a statement
    pub fn step_out(&self) {
        self.command(Command::StepOut);
    }

    /// Quit/detach the debuggee
    pub fn quit(&self) {
        self.command(Command::Quit);
    }

    /// Forward raw query text to the debuggee, e.g. `print widget`
    pub fn query(&self, text: impl Into<String>) {
        self.command(Command::Query(text.into()));
    }

    /// Issue a user command; silently ignored unless a debuggee is active.
    pub fn command(&self, command: Command) {
        if let Err(e) = self.with_internals(|internals| {
            internals.command(command);
            Ok(())
        }) {
            tracing::warn!(error = %e, "dropping debugger command");
        }
    }

    /// Pause the calling thread waiting for a specific event, where the
    /// predicate returns true
    pub fn wait_for_event<F>(&self, pred: F) -> Event
    where
        F: Fn(&Event) -> bool,
    {
        let mut n = 0;
        loop {
            let evt = self.rx.recv().unwrap();
            if n >= 100 {
                panic!("did not receive event");
            }

            if pred(&evt) {
                tracing::debug!(event = ?evt, "received expected event");
                return evt;
            } else {
                tracing::trace!(event = ?evt, "non-matching event");
            }
            n += 1;
        }
    }

    fn with_internals<F, T>(&self, f: F) -> eyre::Result<T>
    where
        F: FnOnce(&mut DebuggerInternals) -> eyre::Result<T>,
    {
        let mut internals = self
            .internals
            .lock()
            .map_err(|e| eyre::eyre!("debugger mutex poisoned: {e}"))?;
        f(&mut internals)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::HashSet;
    use std::path::{Path, PathBuf};

    use crate::ide::{EditorMarks, Project, ProjectResolver};
    use crate::types::Breakpoint;

    use super::Debugger;

    struct NullResolver;

    impl ProjectResolver for NullResolver {
        fn resolve_project_for_path(&self, _path: &Path) -> Option<Project> {
            None
        }
    }

    struct FakeEditor {
        path: PathBuf,
        marks: RefCell<HashSet<usize>>,
        gutter: Cell<bool>,
    }

    impl FakeEditor {
        fn new(path: impl Into<PathBuf>) -> Self {
            Self {
                path: path.into(),
                marks: RefCell::new(HashSet::new()),
                gutter: Cell::new(false),
            }
        }
    }

    impl EditorMarks for FakeEditor {
        fn file_path(&self) -> &Path {
            &self.path
        }

        fn has_mark(&self, line_number: usize) -> bool {
            self.marks.borrow().contains(&line_number)
        }

        fn add_mark(&self, line_number: usize) {
            self.marks.borrow_mut().insert(line_number);
        }

        fn remove_mark(&self, line_number: usize) {
            self.marks.borrow_mut().remove(&line_number);
        }

        fn enable_gutter(&self) {
            self.gutter.set(true);
        }

        fn disable_gutter(&self) {
            self.gutter.set(false);
        }
    }

    #[test]
    fn toggling_twice_restores_the_original_membership() {
        let debugger = Debugger::new(Box::new(NullResolver));
        let editor = FakeEditor::new("/src/com/acme/Widget.java");

        debugger.toggle_breakpoint(&editor, "com.acme.Widget", 42);
        assert_eq!(debugger.breakpoints(), vec![Breakpoint::new("com.acme.Widget", 42)]);
        assert!(editor.has_mark(42));

        debugger.toggle_breakpoint(&editor, "com.acme.Widget", 42);
        assert!(debugger.breakpoints().is_empty());
        assert!(!editor.has_mark(42));
    }

    #[test]
    fn commands_without_an_active_debuggee_are_ignored() {
        let debugger = Debugger::new(Box::new(NullResolver));
        debugger.r#continue();
        debugger.step_over();
        debugger.step_into();
        debugger.step_out();
        debugger.quit();
        debugger.query("print widget");
        assert!(debugger.breakpoints().is_empty());
    }

    #[test]
    fn attaching_an_editor_recreates_its_marks() {
        let debugger = Debugger::new(Box::new(NullResolver));
        debugger.restore_breakpoint(Breakpoint::new("com.acme.Widget", 7));
        debugger.restore_breakpoint(Breakpoint::new("com.acme.Other", 9));

        let editor = FakeEditor::new("/src/com/acme/Widget.java");
        debugger.attach_editor(&editor, "com.acme.Widget");

        assert!(editor.gutter.get());
        assert!(editor.has_mark(7));
        assert!(!editor.has_mark(9));

        debugger.detach_editor(&editor);
        assert!(!editor.gutter.get());
    }

    #[test]
    fn restoring_an_existing_breakpoint_does_not_duplicate_it() {
        let debugger = Debugger::new(Box::new(NullResolver));
        debugger.restore_breakpoint(Breakpoint::new("com.acme.Widget", 7));
        debugger.restore_breakpoint(Breakpoint::new("com.acme.Widget", 7));
        assert_eq!(debugger.breakpoints().len(), 1);
    }
}
