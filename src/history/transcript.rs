//! Reading native Claude Code session transcripts.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{claude_projects_dir, project_sessions_dir, session_files_newest_first};

/// The only tool whose transcripts can be read.
pub const CLAUDE_TOOL_ID: &str = "claude-code";

/// Records scanned per file when listing sessions.
pub const HEADER_RECORDS: usize = 10;

/// Maximum characters in a session title.
pub const TITLE_MAX_CHARS: usize = 80;

const UNTITLED: &str = "Untitled";

/// A native session found on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeSession {
    pub session_id: String,
    pub title: String,
    /// Timestamp of the first record carrying one, as written by the tool.
    pub timestamp: String,
    pub tool_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One message of a native transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: String,
}

#[derive(Debug, Default, Deserialize)]
struct RecordMessage {
    #[serde(default)]
    content: Option<Value>,
}

/// The transcript record fields read here.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Record {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    message: Option<RecordMessage>,
}

impl Record {
    fn content(&self) -> Option<&Value> {
        self.message.as_ref()?.content.as_ref()
    }
}

fn thinking_span() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?s)<thinking>.*?</thinking>\s*").ok())
        .as_ref()
}

fn strip_thinking(text: &str) -> String {
    match thinking_span() {
        Some(re) => re.replace_all(text, "").trim().to_string(),
        None => text.trim().to_string(),
    }
}

async fn read_records(path: &Path, limit: Option<usize>) -> Vec<Record> {
    let file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Cannot open transcript");
            return Vec::new();
        }
    };

    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    let mut records = Vec::new();
    let mut seen = 0;
    loop {
        if limit.is_some_and(|max| seen >= max) {
            break;
        }
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Transcript read failed");
                break;
            }
        }
        seen += 1;
        let line = String::from_utf8_lossy(&buf);
        match serde_json::from_str::<Record>(line.trim_end()) {
            Ok(record) => records.push(record),
            Err(e) => tracing::trace!(error = %e, "Skipping unreadable transcript line"),
        }
    }
    records
}

fn session_header(records: &[Record], tool_id: &str) -> Option<NativeSession> {
    let mut session_id = None;
    let mut timestamp = None;
    let mut title = None;

    for record in records {
        if session_id.is_none() {
            session_id.clone_from(&record.session_id);
        }
        if timestamp.is_none() {
            timestamp.clone_from(&record.timestamp);
        }
        if record.kind.as_deref() == Some("user") {
            let text = match record.content() {
                Some(Value::String(s)) => Some(s.clone()),
                Some(other) if !other.is_null() => Some(other.to_string()),
                _ => None,
            };
            if let Some(text) = text.filter(|t| !t.is_empty()) {
                title = Some(text.chars().take(TITLE_MAX_CHARS).collect::<String>());
                break;
            }
        }
    }

    Some(NativeSession {
        session_id: session_id?,
        title: title.unwrap_or_else(|| UNTITLED.to_string()),
        timestamp: timestamp.unwrap_or_default(),
        tool_id: tool_id.to_string(),
    })
}

fn to_message(record: Record) -> Option<NativeMessage> {
    let timestamp = record.timestamp.clone().unwrap_or_default();
    match record.kind.as_deref()? {
        "user" => match record.content()? {
            Value::String(text) => Some(NativeMessage {
                role: Role::User,
                content: text.clone(),
                timestamp,
            }),
            _ => None,
        },
        "assistant" => {
            let blocks = record.content()?.as_array()?;
            let parts: Vec<String> = blocks
                .iter()
                .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|block| block.get("text").and_then(Value::as_str))
                .map(strip_thinking)
                .filter(|text| !text.is_empty())
                .collect();
            (!parts.is_empty()).then(|| NativeMessage {
                role: Role::Assistant,
                content: parts.join("\n"),
                timestamp,
            })
        }
        _ => None,
    }
}

/// List sessions of `project` under an explicit projects root.
pub async fn list_sessions_in(
    projects_root: &Path,
    tool_id: &str,
    project: &Path,
) -> Vec<NativeSession> {
    let dir = project_sessions_dir(projects_root, project);
    let mut sessions = Vec::new();
    for path in session_files_newest_first(&dir).await {
        let records = read_records(&path, Some(HEADER_RECORDS)).await;
        match session_header(&records, tool_id) {
            Some(session) => sessions.push(session),
            None => tracing::debug!(path = %path.display(), "Transcript has no session id"),
        }
    }
    sessions
}

/// Load the messages of one session under an explicit projects root.
pub async fn load_messages_in(
    projects_root: &Path,
    project: &Path,
    session_id: &str,
) -> Vec<NativeMessage> {
    let path = project_sessions_dir(projects_root, project).join(format!("{session_id}.jsonl"));
    read_records(&path, None)
        .await
        .into_iter()
        .filter_map(to_message)
        .collect()
}

/// Native sessions of `tool_id` for `project`, newest first.
///
/// Only Claude Code transcripts are readable; other tools yield nothing.
pub async fn list_native_sessions(tool_id: &str, project: &Path) -> Vec<NativeSession> {
    if tool_id != CLAUDE_TOOL_ID {
        return Vec::new();
    }
    let Some(root) = claude_projects_dir() else {
        tracing::debug!("Could not determine home directory");
        return Vec::new();
    };
    list_sessions_in(&root, tool_id, project).await
}

/// Messages of one native session, in transcript order.
pub async fn load_native_messages(
    tool_id: &str,
    project: &Path,
    session_id: &str,
) -> Vec<NativeMessage> {
    if tool_id != CLAUDE_TOOL_ID {
        return Vec::new();
    }
    let Some(root) = claude_projects_dir() else {
        tracing::debug!("Could not determine home directory");
        return Vec::new();
    };
    load_messages_in(&root, project, session_id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(json: &str) -> Record {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn strip_thinking_removes_spans_and_trailing_space() {
        assert_eq!(
            strip_thinking("<thinking>plan\nmore</thinking>\n\nAnswer"),
            "Answer"
        );
        assert_eq!(strip_thinking("a <thinking>x</thinking> b"), "a b");
    }

    #[test]
    fn header_uses_first_user_message_as_title() {
        let records = vec![
            record(r#"{"type":"queue-operation","sessionId":"s1","timestamp":"t0"}"#),
            record(r#"{"type":"user","message":{"content":"fix the build"}}"#),
        ];
        let session = session_header(&records, CLAUDE_TOOL_ID).unwrap();
        assert_eq!(session.session_id, "s1");
        assert_eq!(session.timestamp, "t0");
        assert_eq!(session.title, "fix the build");
    }

    #[test]
    fn header_truncates_title_and_defaults_to_untitled() {
        let long = "é".repeat(200);
        let records = vec![record(&format!(
            r#"{{"type":"user","sessionId":"s","message":{{"content":"{long}"}}}}"#
        ))];
        let session = session_header(&records, CLAUDE_TOOL_ID).unwrap();
        assert_eq!(session.title.chars().count(), TITLE_MAX_CHARS);

        let records = vec![record(r#"{"type":"system","sessionId":"s"}"#)];
        assert_eq!(session_header(&records, CLAUDE_TOOL_ID).unwrap().title, "Untitled");
    }

    #[test]
    fn header_without_session_id_is_skipped() {
        let records = vec![record(r#"{"type":"user","message":{"content":"hi"}}"#)];
        assert!(session_header(&records, CLAUDE_TOOL_ID).is_none());
    }

    #[test]
    fn tool_results_are_not_user_messages() {
        let r = record(r#"{"type":"user","message":{"content":[{"type":"tool_result"}]}}"#);
        assert!(to_message(r).is_none());
    }

    #[test]
    fn assistant_text_blocks_are_joined() {
        let r = record(
            r#"{"type":"assistant","timestamp":"t","message":{"content":[
                {"type":"text","text":"<thinking>hmm</thinking>One"},
                {"type":"tool_use","name":"Read"},
                {"type":"text","text":"Two"}
            ]}}"#,
        );
        let message = to_message(r).unwrap();
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.content, "One\nTwo");
        assert_eq!(message.timestamp, "t");
    }

    #[tokio::test]
    async fn other_tools_have_no_history() {
        assert!(list_native_sessions("codex", Path::new("/tmp")).await.is_empty());
        assert!(load_native_messages("gemini-cli", Path::new("/tmp"), "x")
            .await
            .is_empty());
    }
}
