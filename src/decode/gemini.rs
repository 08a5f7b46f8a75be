//! Decoder for Gemini CLI `-o stream-json` output.
//!
//! ```text
//! {"type":"init","session_id":"xxx","model":"auto"}
//! {"type":"message","role":"assistant","content":"...","delta":true}
//! {"type":"result","status":"success","stats":{...}}
//! ```

use serde::Deserialize;

use super::{LineDecoder, NormalizedEvent, UsageReport};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
struct GeminiStats {
    #[serde(default)]
    input_tokens: Option<u64>,
    #[serde(default)]
    output_tokens: Option<u64>,
    #[serde(default, alias = "cached_tokens")]
    cached: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum GeminiRecord {
    Init {
        #[serde(default)]
        session_id: Option<String>,
    },
    Message {
        #[serde(default)]
        role: Option<String>,
        #[serde(default)]
        content: Option<String>,
    },
    Result {
        #[serde(default)]
        stats: Option<GeminiStats>,
    },
    #[serde(other)]
    Unknown,
}

/// Decoder for Gemini CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeminiDecoder;

impl LineDecoder for GeminiDecoder {
    fn decode(&self, line: &str) -> Option<NormalizedEvent> {
        let record: GeminiRecord = serde_json::from_str(line.trim()).ok()?;
        match record {
            GeminiRecord::Init { session_id } => session_id
                .filter(|id| !id.is_empty())
                .map(NormalizedEvent::NativeSessionId),
            GeminiRecord::Message { role, content } => {
                if role.as_deref() != Some("assistant") {
                    return None;
                }
                content
                    .filter(|text| !text.is_empty())
                    .map(NormalizedEvent::TextFragment)
            }
            GeminiRecord::Result { stats } => {
                let stats = stats?;
                if stats.input_tokens.is_none() && stats.output_tokens.is_none() {
                    return None;
                }
                Some(NormalizedEvent::Usage(UsageReport {
                    input_tokens: stats.input_tokens.unwrap_or(0),
                    output_tokens: stats.output_tokens.unwrap_or(0),
                    cache_creation_input_tokens: 0,
                    cache_read_input_tokens: stats.cached.unwrap_or(0),
                }))
            }
            GeminiRecord::Unknown => None,
        }
    }
}
