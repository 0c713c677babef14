//! Pipe-based channel to an external debuggee process.
//!
//! The channel owns the child's stdin/stdout pipes and presents them as a
//! line-oriented duplex: writes are synchronous, reads arrive as
//! [`ChannelEvent`]s on a [`crossbeam_channel`] the caller watches from its
//! own event loop.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;

use eyre::WrapErr;

/// Notifications from the channel's read watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// One complete line of debuggee output, without the trailing newline.
    Line(String),
    /// The read side reached EOF/HUP or failed. Fired at most once per
    /// debuggee session.
    Closed,
}

struct ChannelInner {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    read_open: bool,
    // bumped on every start; a reader may only close its own session
    generation: u64,
}

impl ChannelInner {
    fn is_running(&self) -> bool {
        self.stdin.is_some() && self.read_open
    }

    /// Clear both pipe handles and reap the child. Returns whether this call
    /// performed the close; a second call is a no-op.
    fn close(&mut self) -> bool {
        if self.stdin.is_none() && !self.read_open {
            return false;
        }
        self.stdin = None;
        self.read_open = false;
        if let Some(mut child) = self.child.take() {
            match child.try_wait() {
                Ok(Some(status)) => {
                    tracing::debug!(%status, "debuggee already exited");
                }
                _ => {
                    if let Err(e) = child.kill() {
                        tracing::warn!(error = %e, "could not terminate debuggee process");
                    }
                    let _ = child.wait();
                }
            }
        }
        true
    }
}

/// One external debuggee's stdio pipes.
///
/// Lifecycle: not-started until [`ProcessChannel::start`] succeeds, running
/// while both pipe handles are present, closed once EOF/HUP is seen or
/// [`ProcessChannel::stop`] is called. A closed channel may be started again
/// for a fresh debuggee; the event stream is shared across sessions.
pub struct ProcessChannel {
    inner: Arc<Mutex<ChannelInner>>,
    events_tx: crossbeam_channel::Sender<ChannelEvent>,
    events_rx: crossbeam_channel::Receiver<ChannelEvent>,
}

impl ProcessChannel {
    pub fn new() -> Self {
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        Self {
            inner: Arc::new(Mutex::new(ChannelInner {
                child: None,
                stdin: None,
                read_open: false,
                generation: 0,
            })),
            events_tx,
            events_rx,
        }
    }

    /// Subscribe to the channel's line/closed notifications.
    pub fn events(&self) -> crossbeam_channel::Receiver<ChannelEvent> {
        self.events_rx.clone()
    }

    /// Spawn the debuggee with stdin/stdout piped. stderr is inherited.
    ///
    /// On failure the channel is left not-started and the call may simply be
    /// retried. Starting while a debuggee is already running is an error;
    /// the caller quits the old session first.
    pub fn start(&self, command_argv: &[String]) -> eyre::Result<()> {
        let (program, args) = command_argv
            .split_first()
            .ok_or_else(|| eyre::eyre!("empty debuggee command"))?;

        let mut inner = lock(&self.inner)?;
        eyre::ensure!(!inner.is_running(), "debuggee is already running");

        tracing::debug!(%program, "starting debuggee process");
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .wrap_err_with(|| format!("spawning debuggee {program}"))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| eyre::eyre!("debuggee stdin was not captured"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| eyre::eyre!("debuggee stdout was not captured"))?;

        inner.stdin = Some(stdin);
        inner.read_open = true;
        inner.child = Some(child);
        inner.generation += 1;
        let generation = inner.generation;
        drop(inner);

        let reader_inner = Arc::clone(&self.inner);
        let reader_tx = self.events_tx.clone();
        thread::spawn(move || read_lines(stdout, reader_inner, reader_tx, generation));

        Ok(())
    }

    /// Write one line to the debuggee's stdin and flush. A trailing newline
    /// is appended if missing. Fails when the channel is not running; the
    /// caller treats that as fire-and-forget and drops the command.
    pub fn send_line(&self, text: &str) -> eyre::Result<()> {
        let mut inner = lock(&self.inner)?;
        let stdin = inner
            .stdin
            .as_mut()
            .ok_or_else(|| eyre::eyre!("channel is not running"))?;
        let written = if text.ends_with('\n') {
            stdin.write_all(text.as_bytes())
        } else {
            writeln!(stdin, "{text}")
        };
        written.wrap_err("writing to debuggee")?;
        stdin.flush().wrap_err("flushing debuggee stdin")?;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        lock(&self.inner).map(|inner| inner.is_running()).unwrap_or(false)
    }

    /// Tear the session down locally: clear both pipe handles, terminate the
    /// child and fire [`ChannelEvent::Closed`]. Idempotent.
    pub fn stop(&self) {
        let closed = match lock(&self.inner) {
            Ok(mut inner) => inner.close(),
            Err(e) => {
                tracing::warn!(error = %e, "stopping channel");
                return;
            }
        };
        if closed {
            let _ = self.events_tx.send(ChannelEvent::Closed);
        }
    }
}

impl Default for ProcessChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProcessChannel {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock(inner: &Arc<Mutex<ChannelInner>>) -> eyre::Result<std::sync::MutexGuard<'_, ChannelInner>> {
    inner
        .lock()
        .map_err(|e| eyre::eyre!("channel mutex poisoned: {e}"))
}

fn read_lines(
    stdout: ChildStdout,
    inner: Arc<Mutex<ChannelInner>>,
    events_tx: crossbeam_channel::Sender<ChannelEvent>,
    generation: u64,
) {
    let mut reader = BufReader::new(stdout);
    let mut buffer = String::new();
    loop {
        buffer.clear();
        match reader.read_line(&mut buffer) {
            Ok(0) => break,
            Ok(_) => {
                let line = buffer.trim_end_matches(['\n', '\r']);
                let _ = events_tx.send(ChannelEvent::Line(line.to_string()));
            }
            Err(e) => {
                tracing::warn!(error = %e, "reading from debuggee");
                break;
            }
        }
    }

    let closed = match inner.lock() {
        // a restart may have superseded this session already
        Ok(mut guard) if guard.generation == generation => guard.close(),
        _ => false,
    };
    if closed {
        let _ = events_tx.send(ChannelEvent::Closed);
    }
    tracing::debug!("debuggee read watch terminated");
}
