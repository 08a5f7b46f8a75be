//! Decoder for Codex `exec --json` JSONL output.
//!
//! ```text
//! {"type":"thread.started","thread_id":"xxx"}
//! {"type":"message.output_text.delta","delta":"text"}
//! {"type":"item.completed","item":{"id":"item_1","type":"agent_message","text":"..."}}
//! {"type":"turn.completed","usage":{"input_tokens":1,"cached_input_tokens":0,"output_tokens":2}}
//! ```

use serde::Deserialize;

use super::{LineDecoder, NormalizedEvent, UsageReport};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
struct CodexItem {
    #[serde(default, rename = "type", alias = "item_type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
struct CodexUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    cached_input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
enum CodexRecord {
    #[serde(rename = "thread.started")]
    ThreadStarted {
        #[serde(default)]
        thread_id: Option<String>,
    },
    #[serde(rename = "message.output_text.delta")]
    OutputTextDelta {
        #[serde(default)]
        delta: Option<String>,
    },
    #[serde(rename = "item.completed")]
    ItemCompleted {
        #[serde(default)]
        item: CodexItem,
    },
    #[serde(rename = "turn.completed")]
    TurnCompleted {
        #[serde(default)]
        usage: Option<CodexUsage>,
    },
    #[serde(other)]
    Unknown,
}

/// Decoder for Codex.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodexDecoder;

impl LineDecoder for CodexDecoder {
    fn decode(&self, line: &str) -> Option<NormalizedEvent> {
        let record: CodexRecord = serde_json::from_str(line.trim()).ok()?;
        match record {
            CodexRecord::ThreadStarted { thread_id } => thread_id
                .filter(|id| !id.is_empty())
                .map(NormalizedEvent::NativeSessionId),
            CodexRecord::OutputTextDelta { delta } => delta
                .filter(|text| !text.is_empty())
                .map(NormalizedEvent::TextFragment),
            CodexRecord::ItemCompleted { item } if item.kind == "agent_message" => item
                .text
                .filter(|text| !text.is_empty())
                .map(NormalizedEvent::MessageText),
            CodexRecord::TurnCompleted { usage } => usage.map(|u| {
                NormalizedEvent::Usage(UsageReport {
                    input_tokens: u.input_tokens,
                    output_tokens: u.output_tokens,
                    cache_creation_input_tokens: 0,
                    cache_read_input_tokens: u.cached_input_tokens,
                })
            }),
            CodexRecord::ItemCompleted { .. } | CodexRecord::Unknown => None,
        }
    }
}
