//! Normalized event types shared by every tool decoder.

use serde::{Deserialize, Serialize};

/// Token accounting reported at the end of a turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageReport {
    /// Prompt tokens billed.
    pub input_tokens: u64,
    /// Completion tokens billed.
    pub output_tokens: u64,
    /// Tokens written to the prompt cache.
    pub cache_creation_input_tokens: u64,
    /// Tokens served from the prompt cache.
    pub cache_read_input_tokens: u64,
}

impl UsageReport {
    /// Sum of every counter.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.input_tokens
            .saturating_add(self.output_tokens)
            .saturating_add(self.cache_creation_input_tokens)
            .saturating_add(self.cache_read_input_tokens)
    }
}

/// One decoded fact from a single line of tool output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedEvent {
    /// A fragment of assistant reply text.
    TextFragment(String),
    /// The complete text of one assistant message. Repeats what the
    /// fragments already carried when the tool also streams deltas.
    MessageText(String),
    /// The tool's own conversation identifier.
    NativeSessionId(String),
    /// A tool-call content block opened at `index`.
    ToolCallStarted {
        /// Block index.
        index: u64,
        /// Tool name.
        name: String,
    },
    /// A partial-JSON fragment of a tool call's input.
    ToolCallInputDelta {
        /// Block index.
        index: u64,
        /// Partial JSON text.
        fragment: String,
    },
    /// The content block at `index` closed.
    ToolCallCompleted {
        /// Block index.
        index: u64,
    },
    /// Token usage for the turn.
    Usage(UsageReport),
}

impl NormalizedEvent {
    /// Returns true for the three tool-call lifecycle variants.
    #[must_use]
    pub fn is_tool_call(&self) -> bool {
        matches!(
            self,
            Self::ToolCallStarted { .. }
                | Self::ToolCallInputDelta { .. }
                | Self::ToolCallCompleted { .. }
        )
    }
}

/// Decodes one non-blank line of a tool's structured output.
///
/// Returning `None` means the line is not part of this tool's grammar or
/// carries nothing of interest; it is never an error.
pub trait LineDecoder {
    /// Decode a single line.
    fn decode(&self, line: &str) -> Option<NormalizedEvent>;
}
