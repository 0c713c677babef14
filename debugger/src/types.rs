use std::fmt;
use std::str::FromStr;

use eyre::WrapErr;
use serde::{Deserialize, Serialize};

// Serialize/Deserialize are required for persisting
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Breakpoint {
    /// Fully qualified class name, e.g. `com.acme.Widget`.
    pub class_name: String,
    /// 1-based source line.
    pub line_number: usize,
}

impl Breakpoint {
    pub fn new(class_name: impl Into<String>, line_number: usize) -> Self {
        Self {
            class_name: class_name.into(),
            line_number,
        }
    }
}

impl fmt::Display for Breakpoint {
    /// The `class:line` form used as the argument of the `break` command.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.class_name, self.line_number)
    }
}

impl FromStr for Breakpoint {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (class_name, lineno_str) = s
            .split_once(':')
            .ok_or_else(|| eyre::eyre!("breakpoint specification '{s}' has no colon"))?;

        eyre::ensure!(!class_name.is_empty(), "breakpoint has an empty class name");
        let line_number = lineno_str.parse().wrap_err("invalid line number")?;

        Ok(Self {
            class_name: class_name.to_string(),
            line_number,
        })
    }
}

/// Insertion-ordered collection of breakpoints, at most one per
/// (class name, line number) pair.
///
/// The set itself does not deduplicate; the controller checks membership
/// with [`BreakpointSet::find`] before deciding to add.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct BreakpointSet {
    breakpoints: Vec<Breakpoint>,
}

impl BreakpointSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append unconditionally.
    pub fn add(&mut self, breakpoint: Breakpoint) {
        self.breakpoints.push(breakpoint);
    }

    /// Remove the first entry equal to `breakpoint`; no-op if absent.
    pub fn remove(&mut self, breakpoint: &Breakpoint) {
        if let Some(index) = self.breakpoints.iter().position(|b| b == breakpoint) {
            self.breakpoints.remove(index);
        }
    }

    /// Linear scan for the first structurally equal match.
    pub fn find(&self, class_name: &str, line_number: usize) -> Option<&Breakpoint> {
        self.breakpoints
            .iter()
            .find(|b| b.class_name == class_name && b.line_number == line_number)
    }

    /// Stable insertion order; used to replay breakpoints on debuggee restart.
    pub fn iter(&self) -> impl Iterator<Item = &Breakpoint> {
        self.breakpoints.iter()
    }

    pub fn len(&self) -> usize {
        self.breakpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakpoints.is_empty()
    }
}
