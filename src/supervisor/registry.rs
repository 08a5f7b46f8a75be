//! Session registry: at most one live run per session.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

use super::{kill_process_group, RunState};

#[derive(Debug)]
struct SessionEntry {
    generation: u64,
    state: RunState,
    cancel: CancellationToken,
    pid: Option<u32>,
}

impl SessionEntry {
    fn transition(&mut self, session: &str, to: RunState) {
        tracing::debug!(
            session,
            generation = self.generation,
            from = ?self.state,
            to = ?to,
            "State transition"
        );
        self.state = to;
    }

    /// Signal the run to stop and kill its process group.
    fn stop(&mut self, session: &str) {
        self.cancel.cancel();
        if let Some(pid) = self.pid.take() {
            kill_process_group(pid);
        }
        self.transition(session, RunState::Cancelled);
    }
}

/// Tracks the latest run of every session.
///
/// Each run is identified by a generation drawn from a registry-wide
/// counter. Completion is only accepted from the generation that is still
/// current and still running, so exits of cancelled or superseded runs are
/// dropped.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SessionEntry>>,
    next_generation: AtomicU64,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new run for `session`, superseding any running one.
    ///
    /// Returns the new generation and the run's cancellation token.
    pub fn begin(&self, session: &str) -> (u64, CancellationToken) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        let cancel = CancellationToken::new();
        let mut sessions = self.lock();

        if let Some(entry) = sessions.get_mut(session) {
            if entry.state.is_running() {
                tracing::info!(
                    session,
                    superseded = entry.generation,
                    generation,
                    "Superseding running turn"
                );
                entry.stop(session);
            }
        }

        let mut entry = SessionEntry {
            generation,
            state: RunState::Idle,
            cancel: cancel.clone(),
            pid: None,
        };
        entry.transition(session, RunState::Running);
        sessions.insert(session.to_string(), entry);
        (generation, cancel)
    }

    /// Record the process id of a run so cancellation can kill it directly.
    pub fn attach_pid(&self, session: &str, generation: u64, pid: u32) {
        if let Some(entry) = self.lock().get_mut(session) {
            if entry.generation == generation && entry.state.is_running() {
                entry.pid = Some(pid);
            }
        }
    }

    /// Forget the process id of a run whose process has been reaped.
    ///
    /// The run stays current until `finish`; a cancel in between only
    /// signals its token.
    pub fn detach_pid(&self, session: &str, generation: u64) {
        if let Some(entry) = self.lock().get_mut(session) {
            if entry.generation == generation {
                entry.pid = None;
            }
        }
    }

    /// Process id recorded for the current run of `session`.
    #[must_use]
    pub fn pid(&self, session: &str) -> Option<u32> {
        self.lock().get(session).and_then(|entry| entry.pid)
    }

    /// Finish a run with `outcome`.
    ///
    /// Returns true when `generation` is the session's current, running
    /// generation; only then may the caller report completion.
    pub fn finish(&self, session: &str, generation: u64, outcome: RunState) -> bool {
        let mut sessions = self.lock();
        match sessions.get_mut(session) {
            Some(entry) if entry.generation == generation && entry.state.is_running() => {
                entry.pid = None;
                entry.transition(session, outcome);
                true
            }
            _ => {
                tracing::debug!(session, generation, "Ignoring stale completion");
                false
            }
        }
    }

    /// Cancel the running turn of `session`. Returns false if none was running.
    pub fn cancel(&self, session: &str) -> bool {
        match self.lock().get_mut(session) {
            Some(entry) if entry.state.is_running() => {
                tracing::info!(session, generation = entry.generation, "Cancelling turn");
                entry.stop(session);
                true
            }
            _ => false,
        }
    }

    /// Cancel every running turn. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let mut sessions = self.lock();
        let mut cancelled = 0;
        for (session, entry) in sessions.iter_mut() {
            if entry.state.is_running() {
                entry.stop(session);
                cancelled += 1;
            }
        }
        cancelled
    }

    #[must_use]
    pub fn is_running(&self, session: &str) -> bool {
        self.state(session).is_running()
    }

    /// State of the latest run, `Idle` for unknown sessions.
    #[must_use]
    pub fn state(&self, session: &str) -> RunState {
        self.lock()
            .get(session)
            .map_or(RunState::Idle, |entry| entry.state)
    }

    /// Current generation of `session`, if it ever ran.
    #[must_use]
    pub fn generation(&self, session: &str) -> Option<u64> {
        self.lock().get(session).map(|entry| entry.generation)
    }

    /// Number of sessions with a live run.
    #[must_use]
    pub fn running_count(&self) -> usize {
        self.lock().values().filter(|e| e.state.is_running()).count()
    }
}
