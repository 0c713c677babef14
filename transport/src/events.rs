//! Events emitted by the debuggee, one tagged line each.
//!
//! Classification is by literal prefix, first match wins. Location events
//! carry `key="value"` attribute records; variable tables carry a sequence
//! of tag-delimited `print-column` records grouped into rows by the first
//! column name.

use std::path::PathBuf;

/// Where the debuggee stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file_path: PathBuf,
    /// 1-based.
    pub line_number: usize,
}

/// One cell of a variable-inspection row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebuggerColumn {
    pub name: String,
    pub value: String,
}

/// One parsed line of debuggee output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugEvent {
    /// The debuggee is initialized and accepts breakpoints.
    Ready,
    /// Execution stopped at a breakpoint.
    HitBreakpoint(SourceLocation),
    /// Execution stopped after a step command.
    Step(SourceLocation),
    /// Variable inspection result.
    PrintTable { rows: Vec<Vec<DebuggerColumn>> },
    /// Anything not matching a known tag; the controller ignores it.
    Unrecognized,
}

/// Classify one line of debuggee output.
///
/// Returns `None` for a recognized tag whose record is malformed — the line
/// is dropped, producing no event at all.
pub fn parse_event(line: &str) -> Option<DebugEvent> {
    if line.starts_with("<ready/>") {
        return Some(DebugEvent::Ready);
    }
    if let Some(record) = line.strip_prefix("<hit-breakpoint") {
        return parse_location(record).map(DebugEvent::HitBreakpoint);
    }
    if let Some(record) = line.strip_prefix("<step") {
        return parse_location(record).map(DebugEvent::Step);
    }
    if let Some(record) = line.strip_prefix("<print-table") {
        return Some(DebugEvent::PrintTable {
            rows: group_rows(parse_columns(record)),
        });
    }
    Some(DebugEvent::Unrecognized)
}

fn parse_location(record: &str) -> Option<SourceLocation> {
    let file_path = attribute(record, "file_path")?;
    let line_number = attribute(record, "line_number")?.parse().ok()?;
    Some(SourceLocation {
        file_path: PathBuf::from(file_path),
        line_number,
    })
}

/// Extract the value of a `key="value"` attribute from a tag body.
fn attribute<'a>(record: &'a str, key: &str) -> Option<&'a str> {
    let needle = format!("{key}=\"");
    let start = record.find(&needle)? + needle.len();
    let rest = &record[start..];
    let end = rest.find('"')?;
    Some(&rest[..end])
}

/// Scan a `print-table` payload for `print-column <name> <value>` records.
/// Fields are tab-delimited; tab and newline both act as record separators.
fn parse_columns(text: &str) -> Vec<DebuggerColumn> {
    let mut columns = Vec::new();
    let mut fields = text.split(['\t', '\n']);
    while let Some(field) = fields.next() {
        if field != "print-column" {
            continue;
        }
        let (Some(name), Some(value)) = (fields.next(), fields.next()) else {
            tracing::debug!("truncated print-column record");
            break;
        };
        columns.push(DebuggerColumn {
            name: name.to_string(),
            value: value.to_string(),
        });
    }
    columns
}

/// Group a flat column sequence into rows. A new row begins whenever a
/// column's name equals the first column name seen in the sequence.
fn group_rows(columns: Vec<DebuggerColumn>) -> Vec<Vec<DebuggerColumn>> {
    let mut rows = Vec::new();
    let mut current: Vec<DebuggerColumn> = Vec::new();
    let mut first_name: Option<String> = None;

    for column in columns {
        match &first_name {
            None => first_name = Some(column.name.clone()),
            Some(first) if *first == column.name && !current.is_empty() => {
                rows.push(std::mem::take(&mut current));
            }
            Some(_) => {}
        }
        current.push(column);
    }
    if !current.is_empty() {
        rows.push(current);
    }
    rows
}
