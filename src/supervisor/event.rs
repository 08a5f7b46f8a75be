//! Events delivered to the consumer of one run.

use serde::{Deserialize, Serialize};

use crate::decode::UsageReport;
use crate::stream::ToolCallRecord;

/// One notification from a running turn.
///
/// A run that is not cancelled ends with exactly one `Done` or, when the
/// process could not be spawned, one `Error`. Cancelled and superseded runs
/// end without either.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// A decoded text fragment.
    Text { text: String },
    /// Re-render the whole accumulated reply.
    Render { text: String, is_final: bool },
    /// The tool's own session id, at most once per run.
    NativeSessionId { session_id: String },
    /// A completed tool call.
    ToolCall { record: ToolCallRecord },
    /// Token usage.
    Usage { usage: UsageReport },
    /// The process exited.
    Done { exit_code: i32 },
    /// The process could not be started.
    Error { message: String },
}

impl TurnEvent {
    /// Whether this event ends the run.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}
