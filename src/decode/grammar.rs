//! Output grammar selection per tool profile.

use serde::{Deserialize, Serialize};

use super::{ClaudeDecoder, CodexDecoder, GeminiDecoder, LineDecoder, NormalizedEvent};

/// The output grammar a tool speaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputGrammar {
    /// Claude Code stream-json.
    Claude,
    /// Gemini CLI stream-json.
    Gemini,
    /// Codex JSONL events.
    Codex,
    /// Unstructured text; `<thinking>` spans are filtered out.
    #[default]
    Plain,
}

impl OutputGrammar {
    /// Whether output is decoded line by line into structured events.
    #[must_use]
    pub fn is_structured(self) -> bool {
        !matches!(self, Self::Plain)
    }

    /// Decode one line. Plain grammar never yields events per line.
    #[must_use]
    pub fn decode_line(self, line: &str) -> Option<NormalizedEvent> {
        match self {
            Self::Claude => ClaudeDecoder.decode(line),
            Self::Gemini => GeminiDecoder.decode(line),
            Self::Codex => CodexDecoder.decode(line),
            Self::Plain => None,
        }
    }
}
