use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use debugger::ide::{EditorMarks, Project, ProjectResolver};
use debugger::{Breakpoint, Debugger, Event};
use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init() {
    let _ = color_eyre::install();
    if std::io::stderr().is_terminal() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .json()
            .try_init();
    }
}

struct FixedResolver {
    project: Project,
}

impl ProjectResolver for FixedResolver {
    fn resolve_project_for_path(&self, _path: &Path) -> Option<Project> {
        Some(self.project.clone())
    }
}

impl Default for FixedResolver {
    fn default() -> Self {
        Self {
            project: Project {
                name: "acme".to_string(),
                folder_path: PathBuf::from("/src"),
            },
        }
    }
}

struct NoMarks(PathBuf);

impl EditorMarks for NoMarks {
    fn file_path(&self) -> &Path {
        &self.0
    }
    fn has_mark(&self, _line_number: usize) -> bool {
        false
    }
    fn add_mark(&self, _line_number: usize) {}
    fn remove_mark(&self, _line_number: usize) {}
    fn enable_gutter(&self) {}
    fn disable_gutter(&self) {}
}

fn fake_debuggee(script: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), script.to_string()]
}

/// Wait until the scripted debuggee has received the expected stdin.
fn wait_for_file_contents(path: &Path, expected: &str) {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let contents = std::fs::read_to_string(path).unwrap_or_default();
        if contents == expected {
            return;
        }
        if Instant::now() > deadline {
            panic!("debuggee received {contents:?}, expected {expected:?}");
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn breakpoints_replay_in_insertion_order_on_ready() {
    let tdir = tempfile::tempdir().unwrap();
    let received = tdir.path().join("received.txt");

    let debugger = Debugger::new(Box::<FixedResolver>::default());
    debugger.restore_breakpoint(Breakpoint::new("a.B", 1));
    debugger.restore_breakpoint(Breakpoint::new("a.B", 2));
    debugger.restore_breakpoint(Breakpoint::new("c.D", 3));

    let script = format!("echo '<ready/>'; cat > '{}'", received.display());
    debugger.start(&fake_debuggee(&script)).unwrap();
    debugger.wait_for_event(|e| matches!(e, Event::Running));

    wait_for_file_contents(&received, "break a.B:1\nbreak a.B:2\nbreak c.D:3\nc\n");
}

#[test]
fn hitting_a_breakpoint_selects_the_editor_location() {
    let debugger = Debugger::new(Box::<FixedResolver>::default());

    // toggled before the debuggee is ready: recorded but not sent
    let editor = NoMarks(PathBuf::from("/src/com/acme/Widget.java"));
    debugger.toggle_breakpoint(&editor, "com.acme.Widget", 42);
    assert_eq!(debugger.breakpoints(), vec![Breakpoint::new("com.acme.Widget", 42)]);

    let script = r#"
echo '<ready/>'
read _break
read _continue
echo '<hit-breakpoint file_path="/src/com/acme/Widget.java" line_number="42">'
cat > /dev/null
"#;
    debugger.start(&fake_debuggee(script)).unwrap();

    let event = debugger.wait_for_event(|e| matches!(e, Event::SelectSource { .. }));
    let Event::SelectSource { location, project } = event else {
        unreachable!()
    };
    assert_eq!(location.file_path, PathBuf::from("/src/com/acme/Widget.java"));
    assert_eq!(location.line_number, 42);
    assert_eq!(project.name, "acme");
}

#[test]
fn print_table_rows_reach_subscribers() {
    let debugger = Debugger::new(Box::<FixedResolver>::default());

    let script = "echo '<ready/>'; \
        printf '<print-table>\\tprint-column\\tname\\tx\\tprint-column\\tvalue\\t1\\tprint-column\\tname\\ty\\tprint-column\\tvalue\\t2\\n'; \
        cat > /dev/null";
    debugger.start(&fake_debuggee(script)).unwrap();

    let event = debugger.wait_for_event(|e| matches!(e, Event::VariableTable { .. }));
    let Event::VariableTable { rows } = event else {
        unreachable!()
    };
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][0].value, "x");
    assert_eq!(rows[1][1].value, "2");
}

#[test]
fn unknown_debuggee_output_has_no_side_effects() {
    let debugger = Debugger::new(Box::<FixedResolver>::default());
    let events = debugger.events();

    debugger
        .start(&fake_debuggee("echo 'something happened'"))
        .unwrap();

    // the session never becomes active and nothing UI-facing is requested
    let mut seen = Vec::new();
    loop {
        let event = events.recv_timeout(Duration::from_secs(5)).unwrap();
        let ended = matches!(event, Event::Ended);
        seen.push(event);
        if ended {
            break;
        }
    }
    for event in seen {
        assert!(
            matches!(event, Event::Uninitialised | Event::Started | Event::Ended),
            "unexpected event: {event:?}"
        );
    }
    assert!(debugger.breakpoints().is_empty());
}

#[test]
fn breakpoints_survive_the_debuggee_going_away() {
    let debugger = Debugger::new(Box::<FixedResolver>::default());
    debugger.restore_breakpoint(Breakpoint::new("com.acme.Widget", 42));

    debugger.start(&fake_debuggee("echo '<ready/>'")).unwrap();
    debugger.wait_for_event(|e| matches!(e, Event::Ended));

    assert_eq!(debugger.breakpoints(), vec![Breakpoint::new("com.acme.Widget", 42)]);
}

#[test]
fn restarting_quits_the_old_debuggee_and_replays() {
    let tdir = tempfile::tempdir().unwrap();
    let received = tdir.path().join("received.txt");

    let debugger = Debugger::new(Box::<FixedResolver>::default());
    debugger.restore_breakpoint(Breakpoint::new("com.acme.Widget", 42));

    debugger
        .start(&fake_debuggee("echo '<ready/>'; cat > /dev/null"))
        .unwrap();
    debugger.wait_for_event(|e| matches!(e, Event::Running));

    let script = format!("echo '<ready/>'; cat > '{}'", received.display());
    debugger.start(&fake_debuggee(&script)).unwrap();
    debugger.wait_for_event(|e| matches!(e, Event::Running));

    wait_for_file_contents(&received, "break com.acme.Widget:42\nc\n");
}
