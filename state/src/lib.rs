//! The state module handles persisting breakpoints between debugging sessions.

use std::{
    io::Read,
    io::Write,
    path::{Path, PathBuf},
};

use eyre::WrapErr;
use serde::{Deserialize, Serialize};

pub const STATE_VERSION: &str = "1";

pub struct StateManager {
    save_path: PathBuf,
    current: Persistence,
}

impl StateManager {
    pub fn new(path: impl Into<PathBuf>) -> eyre::Result<Self> {
        let path = path.into();
        let span = tracing::debug_span!("StateManager", state_path = %path.display());
        let _guard = span.enter();

        tracing::debug!("attempting to load state");
        match crate::load_from(&path) {
            Ok(state) => {
                tracing::debug!("state loaded");
                Ok(Self {
                    save_path: path,
                    current: state,
                })
            }
            Err(e) => {
                // TODO: assume the file does not exist for now
                tracing::debug!(error = %e, "loading state file");
                let state = Persistence::default();
                crate::save_to(&state, &path).wrap_err("saving state file")?;

                Ok(Self {
                    save_path: path,
                    current: state,
                })
            }
        }
    }

    pub fn load(mut self) -> eyre::Result<Self> {
        let state = crate::load_from(&self.save_path).wrap_err("loading state")?;
        self.current = state;
        Ok(self)
    }

    pub fn save(self) -> eyre::Result<Self> {
        crate::save_to(&self.current, &self.save_path).wrap_err("saving state")?;
        Ok(self)
    }

    pub fn current(&self) -> &Persistence {
        &self.current
    }

    pub fn set_breakpoints(&mut self, breakpoints: Vec<debugger::Breakpoint>) {
        self.current.breakpoints = breakpoints;
        self.current.version = STATE_VERSION.to_string();
    }
}

/// State that is persisted
#[derive(Default, Serialize, Deserialize, Debug)]
pub struct Persistence {
    pub breakpoints: Vec<debugger::Breakpoint>,
    pub version: String,
}

/// Where the state file lives unless the host says otherwise.
pub fn default_save_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("codeslayer").join("java-breakpoints.json"))
}

pub fn save(state: &Persistence, writer: impl Write) -> eyre::Result<()> {
    serde_json::to_writer(writer, state).context("saving debugger state")?;
    Ok(())
}

pub fn save_to(state: &Persistence, path: impl AsRef<Path>) -> eyre::Result<()> {
    let f = std::fs::File::create(path).context("creating file for saving")?;
    save(state, &f).context("saving state")?;
    Ok(())
}

pub fn load(reader: impl Read) -> eyre::Result<Persistence> {
    let st = serde_json::from_reader(reader).context("reading debugger state")?;
    Ok(st)
}

pub fn load_from(path: impl AsRef<Path>) -> eyre::Result<Persistence> {
    let path = path.as_ref();
    let f = std::fs::File::open(path)
        .with_context(|| format!("opening save state {}", path.display()))?;
    let state = load(f).context("reading from state file")?;
    Ok(state)
}
