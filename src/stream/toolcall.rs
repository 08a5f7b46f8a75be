//! Reassembly of tool calls streamed as partial-JSON deltas.
//!
//! Each content block index moves through `Absent -> Accumulating ->
//! Completed (removed)`. Completion parses the accumulated input once and
//! derives a short label plus a longer preview for detail views.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::decode::NormalizedEvent;
use crate::display::{truncate, truncate_start};

/// Maximum characters in a tool-call label.
pub const LABEL_MAX_CHARS: usize = 60;

/// Maximum characters in a tool-call preview body.
pub const PREVIEW_MAX_CHARS: usize = 400;

/// Input fields that name a file, in priority order.
const FILE_FIELDS: &[&str] = &["file_path", "notebook_path", "path", "file", "filename"];

/// Input fields that carry a shell command.
const COMMAND_FIELDS: &[&str] = &["command", "cmd"];

/// Free-text fields used for labels of other tools, in priority order.
const TEXT_FIELDS: &[&str] = &[
    "description",
    "pattern",
    "query",
    "url",
    "prompt",
    "subject",
    "content",
];

/// A completed tool call ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Tool name as reported by the assistant.
    pub name: String,
    /// Short one-line label.
    pub label: String,
    /// Extended preview body.
    pub preview: String,
}

impl ToolCallRecord {
    /// Build a record from a tool name and its parsed input.
    #[must_use]
    pub fn from_input(name: impl Into<String>, input: &Value) -> Self {
        let (label, preview) = describe(input);
        Self {
            name: name.into(),
            label,
            preview,
        }
    }

    /// Name-only record used when the input could not be parsed.
    #[must_use]
    pub fn name_only(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: String::new(),
            preview: String::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct Accumulator {
    name: String,
    input: String,
}

/// Per-run tool-call state keyed by content block index.
#[derive(Debug, Default)]
pub struct ToolCallReassembler {
    pending: HashMap<u64, Accumulator>,
}

impl ToolCallReassembler {
    /// Create an empty reassembler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or reopen) the block at `index`.
    pub fn start(&mut self, index: u64, name: impl Into<String>) {
        let name = name.into();
        tracing::debug!(index, tool = %name, "Tool call started");
        self.pending.insert(
            index,
            Accumulator {
                name,
                input: String::new(),
            },
        );
    }

    /// Append a partial-JSON fragment. Returns false when no block is open.
    pub fn append(&mut self, index: u64, fragment: &str) -> bool {
        match self.pending.get_mut(&index) {
            Some(acc) => {
                acc.input.push_str(fragment);
                true
            }
            None => {
                tracing::debug!(index, "Input delta for unknown block ignored");
                false
            }
        }
    }

    /// Close the block at `index`, producing its record.
    ///
    /// Returns `None` when no block is open at that index (for example a
    /// text block closing). Unparseable input yields a name-only record.
    pub fn complete(&mut self, index: u64) -> Option<ToolCallRecord> {
        let acc = self.pending.remove(&index)?;
        let record = if acc.input.trim().is_empty() {
            ToolCallRecord::from_input(acc.name, &Value::Object(serde_json::Map::new()))
        } else {
            match serde_json::from_str::<Value>(&acc.input) {
                Ok(input) => ToolCallRecord::from_input(acc.name, &input),
                Err(e) => {
                    tracing::debug!(index, error = %e, "Tool input is not valid JSON");
                    ToolCallRecord::name_only(acc.name)
                }
            }
        };
        Some(record)
    }

    /// Route a normalized event; only completions produce a record.
    pub fn apply(&mut self, event: &NormalizedEvent) -> Option<ToolCallRecord> {
        match event {
            NormalizedEvent::ToolCallStarted { index, name } => {
                self.start(*index, name.clone());
                None
            }
            NormalizedEvent::ToolCallInputDelta { index, fragment } => {
                self.append(*index, fragment);
                None
            }
            NormalizedEvent::ToolCallCompleted { index } => self.complete(*index),
            _ => None,
        }
    }

    /// Number of blocks still accumulating.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Drop every in-flight block.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// First string-ish field among `fields`. Arrays of strings are joined
/// with spaces, which covers argv-style commands.
fn field(input: &Value, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|key| match input.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            (!parts.is_empty()).then(|| parts.join(" "))
        }
        _ => None,
    })
}

fn first_string(input: &Value) -> Option<String> {
    input
        .as_object()?
        .values()
        .find_map(|v| v.as_str().filter(|s| !s.trim().is_empty()))
        .map(str::to_string)
}

fn one_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn pretty(input: &Value) -> String {
    match input {
        Value::Object(map) if map.is_empty() => String::new(),
        other => serde_json::to_string_pretty(other).unwrap_or_default(),
    }
}

/// Derive `(label, preview)` from a parsed tool input.
fn describe(input: &Value) -> (String, String) {
    if let Some(path) = field(input, FILE_FIELDS) {
        let label = truncate_start(&path, LABEL_MAX_CHARS);
        let preview = match (
            field(input, &["old_string"]),
            field(input, &["new_string"]),
            field(input, &["content"]),
        ) {
            (Some(old), Some(new), _) => format!("- {old}\n+ {new}"),
            (_, _, Some(content)) => content,
            _ => pretty(input),
        };
        return (label, truncate(&preview, PREVIEW_MAX_CHARS, false));
    }

    if let Some(command) = field(input, COMMAND_FIELDS) {
        return (
            truncate(&one_line(&command), LABEL_MAX_CHARS, false),
            truncate(&command, PREVIEW_MAX_CHARS, false),
        );
    }

    let label = field(input, TEXT_FIELDS)
        .or_else(|| first_string(input))
        .map(|text| truncate(&one_line(&text), LABEL_MAX_CHARS, false))
        .unwrap_or_default();
    (label, truncate(&pretty(input), PREVIEW_MAX_CHARS, false))
}
