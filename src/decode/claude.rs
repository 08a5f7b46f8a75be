//! Decoder for Claude Code `--output-format stream-json` output.
//!
//! Every record carries a `type` discriminator. Records with partial
//! messages enabled arrive wrapped as `{"type":"stream_event","event":{..}}`
//! and are unwrapped before decoding.

use serde::Deserialize;

use super::{LineDecoder, NormalizedEvent, UsageReport};

/// Content delta types for streaming.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentDelta {
    /// Text content delta.
    TextDelta {
        #[serde(default)]
        text: String,
    },
    /// JSON input delta (for tool inputs).
    InputJsonDelta {
        #[serde(default)]
        partial_json: String,
    },
    #[serde(other)]
    Unknown,
}

/// Metadata of an opened content block.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    ToolUse {
        #[serde(default)]
        name: String,
    },
    #[serde(other)]
    Other,
}

/// A block inside a complete assistant message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum MessageBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Vec<MessageBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
struct ClaudeUsage {
    #[serde(default)]
    input_tokens: Option<u64>,
    #[serde(default)]
    output_tokens: Option<u64>,
    #[serde(default)]
    cache_creation_input_tokens: Option<u64>,
    #[serde(default)]
    cache_read_input_tokens: Option<u64>,
}

impl From<ClaudeUsage> for UsageReport {
    fn from(usage: ClaudeUsage) -> Self {
        Self {
            input_tokens: usage.input_tokens.unwrap_or(0),
            output_tokens: usage.output_tokens.unwrap_or(0),
            cache_creation_input_tokens: usage.cache_creation_input_tokens.unwrap_or(0),
            cache_read_input_tokens: usage.cache_read_input_tokens.unwrap_or(0),
        }
    }
}

/// Records Claude Code emits in stream-json mode, reduced to the fields
/// the relay consumes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClaudeRecord {
    Assistant {
        #[serde(default)]
        message: Option<AssistantMessage>,
    },
    ContentBlockStart {
        #[serde(default)]
        index: u64,
        content_block: ContentBlock,
    },
    ContentBlockDelta {
        #[serde(default)]
        index: u64,
        delta: ContentDelta,
    },
    ContentBlockStop {
        index: u64,
    },
    Result {
        #[serde(default)]
        usage: Option<ClaudeUsage>,
    },
    StreamEvent {
        event: serde_json::Value,
    },
    #[serde(other)]
    Unknown,
}

impl ClaudeRecord {
    /// The content event carried by this record, if any.
    fn into_event(self) -> Option<NormalizedEvent> {
        match self {
            Self::Assistant { message } => {
                let text: String = message?
                    .content
                    .into_iter()
                    .filter_map(|block| match block {
                        MessageBlock::Text { text } => Some(text),
                        MessageBlock::Other => None,
                    })
                    .collect();
                (!text.is_empty()).then_some(NormalizedEvent::MessageText(text))
            }
            Self::ContentBlockDelta { index, delta } => match delta {
                ContentDelta::TextDelta { text } if !text.is_empty() => {
                    Some(NormalizedEvent::TextFragment(text))
                }
                ContentDelta::InputJsonDelta { partial_json } => {
                    Some(NormalizedEvent::ToolCallInputDelta {
                        index,
                        fragment: partial_json,
                    })
                }
                _ => None,
            },
            Self::ContentBlockStart {
                index,
                content_block: ContentBlock::ToolUse { name },
            } => Some(NormalizedEvent::ToolCallStarted { index, name }),
            Self::ContentBlockStop { index } => Some(NormalizedEvent::ToolCallCompleted { index }),
            Self::Result { usage } => usage.map(|u| NormalizedEvent::Usage(u.into())),
            Self::StreamEvent { event } => decode_value(event),
            Self::ContentBlockStart { .. } | Self::Unknown => None,
        }
    }
}

/// Decoder for Claude Code.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaudeDecoder;

impl LineDecoder for ClaudeDecoder {
    fn decode(&self, line: &str) -> Option<NormalizedEvent> {
        let value: serde_json::Value = serde_json::from_str(line.trim()).ok()?;
        decode_value(value)
    }
}

/// Decode an already-parsed record. Content wins over the session id when a
/// record carries both; the id is also present on the earlier init record.
fn decode_value(value: serde_json::Value) -> Option<NormalizedEvent> {
    let session_id = value
        .get("session_id")
        .and_then(serde_json::Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string);

    let content = match serde_json::from_value::<ClaudeRecord>(value) {
        Ok(record) => record.into_event(),
        Err(e) => {
            tracing::debug!(error = %e, "Unrecognized Claude record shape");
            None
        }
    };

    content.or_else(|| session_id.map(NormalizedEvent::NativeSessionId))
}
