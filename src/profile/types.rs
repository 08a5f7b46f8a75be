//! Tool profile types.

use serde::{Deserialize, Serialize};

use crate::decode::{NormalizedEvent, OutputGrammar};

fn default_model_selector() -> Vec<String> {
    vec!["--model".to_string()]
}

/// Argument groups contributed to a command line, by role.
///
/// Every group may be empty, in which case the builder skips the step
/// that would use it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArgGroups {
    /// Always placed right after the command (e.g. a subcommand).
    pub default: Vec<String>,
    /// Non-interactive print mode.
    pub print_mode: Vec<String>,
    /// Skip interactive confirmations.
    pub skip_confirm: Vec<String>,
    /// Continue the most recent conversation.
    #[serde(rename = "continue")]
    pub continue_session: Vec<String>,
    /// Resume a conversation by native session id.
    pub resume: Vec<String>,
    /// Structured output format.
    pub output_format: Vec<String>,
    /// Structured stdin format, enabling piped image input.
    pub input_format: Vec<String>,
    /// Model override flag.
    pub model_selector: Vec<String>,
    /// Flag preceding each attached image path.
    pub image_path: Vec<String>,
    /// Extended thinking flag.
    pub thinking: Vec<String>,
}

impl Default for ArgGroups {
    fn default() -> Self {
        Self {
            default: Vec::new(),
            print_mode: Vec::new(),
            skip_confirm: Vec::new(),
            continue_session: Vec::new(),
            resume: Vec::new(),
            output_format: Vec::new(),
            input_format: Vec::new(),
            model_selector: default_model_selector(),
            image_path: Vec::new(),
            thinking: Vec::new(),
        }
    }
}

/// Declarative description of one coding-assistant CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolProfile {
    /// Stable identifier used for lookup.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Executable invoked for each turn.
    pub command: String,
    /// Command printing the tool version, `<command> --version` when unset.
    #[serde(default)]
    pub detect_command: Option<String>,
    /// Argument groups.
    #[serde(default)]
    pub args: ArgGroups,
    /// Place resume arguments before the message instead of at the end.
    #[serde(default)]
    pub resume_before_message: bool,
    /// Output grammar.
    #[serde(default)]
    pub grammar: OutputGrammar,
}

impl ToolProfile {
    /// Create a plain-output profile with no argument groups.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            command: command.into(),
            detect_command: None,
            args: ArgGroups::default(),
            resume_before_message: false,
            grammar: OutputGrammar::Plain,
        }
    }

    /// Set the argument groups.
    #[must_use]
    pub fn with_args(mut self, args: ArgGroups) -> Self {
        self.args = args;
        self
    }

    /// Set the output grammar.
    #[must_use]
    pub fn with_grammar(mut self, grammar: OutputGrammar) -> Self {
        self.grammar = grammar;
        self
    }

    /// Place resume arguments before the message.
    #[must_use]
    pub fn resume_before_message(mut self) -> Self {
        self.resume_before_message = true;
        self
    }

    /// Whether output is decoded into structured events line by line.
    #[must_use]
    pub fn uses_structured_events(&self) -> bool {
        self.grammar.is_structured()
    }

    /// The command used to probe whether the tool is installed.
    #[must_use]
    pub fn detect_command(&self) -> String {
        self.detect_command
            .clone()
            .unwrap_or_else(|| format!("{} --version", self.command))
    }

    /// Decode one complete output line with this profile's grammar.
    #[must_use]
    pub fn decode_line(&self, line: &str) -> Option<NormalizedEvent> {
        self.grammar.decode_line(line)
    }
}
