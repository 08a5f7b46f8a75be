//! Per-session run state.

use serde::{Deserialize, Serialize};

/// Lifecycle of the latest run of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    /// No run yet, or the last run failed to spawn.
    #[default]
    Idle,
    /// A subprocess is live.
    Running,
    /// The subprocess exited on its own.
    Exited,
    /// The run was cancelled or superseded.
    Cancelled,
}

impl RunState {
    #[must_use]
    pub fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}
