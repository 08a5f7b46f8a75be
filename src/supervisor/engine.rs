//! Session supervisor: the public face of the engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::command::{BuildError, BuiltCommand, CommandBuilder, TurnOptions};
use crate::config::{RelayConfig, ShellConfig, ThrottleConfig};
use crate::profile::{ToolProfile, ToolRegistry};

use super::runner::TurnRun;
use super::{RunState, SessionRegistry, TurnEvent, TurnProcess};

/// Error type for engine operations.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// No profile is registered under the requested id.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    /// The command could not be built.
    #[error("Failed to build command: {0}")]
    Build(#[from] BuildError),
}

/// One turn to run.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    /// Engine-side session identifier.
    pub session_id: String,
    /// Tool profile id.
    pub tool_id: String,
    /// User message.
    pub message: String,
    /// Working directory of the subprocess.
    pub cwd: PathBuf,
    pub options: TurnOptions,
}

impl TurnRequest {
    #[must_use]
    pub fn new(
        session_id: impl Into<String>,
        tool_id: impl Into<String>,
        message: impl Into<String>,
        cwd: impl Into<PathBuf>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            tool_id: tool_id.into(),
            message: message.into(),
            cwd: cwd.into(),
            options: TurnOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: TurnOptions) -> Self {
        self.options = options;
        self
    }
}

/// Receiving end of one run.
///
/// The channel closes when the run ends. Cancelled or superseded runs
/// close it without a terminal event.
#[derive(Debug)]
pub struct TurnHandle {
    session_id: String,
    generation: u64,
    events: UnboundedReceiver<TurnEvent>,
}

impl TurnHandle {
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Generation of the run within the engine.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Next event, `None` once the run is over.
    pub async fn recv(&mut self) -> Option<TurnEvent> {
        self.events.recv().await
    }

    /// Wait for the run to end and return every event.
    pub async fn collect(mut self) -> Vec<TurnEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.events.recv().await {
            events.push(event);
        }
        events
    }
}

#[derive(Debug)]
struct Inner {
    tools: ToolRegistry,
    shell: ShellConfig,
    throttle: ThrottleConfig,
    registry: Arc<SessionRegistry>,
}

/// Runs turns, keeping at most one live subprocess per session.
///
/// Cheap to clone; clones share sessions.
#[derive(Debug, Clone)]
pub struct SessionSupervisor {
    inner: Arc<Inner>,
}

impl SessionSupervisor {
    #[must_use]
    pub fn new(tools: ToolRegistry, config: &RelayConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                tools,
                shell: config.shell.clone(),
                throttle: config.throttle.clone(),
                registry: Arc::new(SessionRegistry::new()),
            }),
        }
    }

    /// Engine with the built-in profiles overlaid by the configured ones.
    #[must_use]
    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(ToolRegistry::from_config(&config.tools), config)
    }

    #[must_use]
    pub fn tools(&self) -> &ToolRegistry {
        &self.inner.tools
    }

    /// Build and run a turn, superseding any running turn of the session.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::UnknownTool` for unregistered tool ids and
    /// `EngineError::Build` if the command cannot be built. Spawn failures
    /// are reported on the returned handle.
    pub fn send(&self, request: TurnRequest) -> Result<TurnHandle, EngineError> {
        let profile = self
            .inner
            .tools
            .lookup(&request.tool_id)
            .ok_or_else(|| EngineError::UnknownTool(request.tool_id.clone()))?;
        let built = CommandBuilder::new(profile).build(&request.message, &request.options)?;
        tracing::debug!(
            session = %request.session_id,
            tool = %profile.id,
            command = %built.command,
            "Built command"
        );
        Ok(self.send_command(&request.session_id, profile, built, &request.cwd))
    }

    /// Run an already built command for `session_id`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn send_command(
        &self,
        session_id: &str,
        profile: &ToolProfile,
        built: BuiltCommand,
        cwd: &Path,
    ) -> TurnHandle {
        let registry = Arc::clone(&self.inner.registry);
        let (generation, cancel) = registry.begin(session_id);
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = TurnHandle {
            session_id: session_id.to_string(),
            generation,
            events: rx,
        };

        let process = match TurnProcess::spawn(&self.inner.shell, &built.command, cwd) {
            Ok(process) => process,
            Err(e) => {
                tracing::warn!(session = session_id, tool = %profile.id, error = %e, "Spawn failed");
                built.remove_temp_file();
                if registry.finish(session_id, generation, RunState::Idle)
                    && tx
                        .send(TurnEvent::Error {
                            message: e.to_string(),
                        })
                        .is_err()
                {
                    tracing::trace!(session = session_id, "Turn consumer dropped");
                }
                return handle;
            }
        };

        if let Some(pid) = process.id() {
            registry.attach_pid(session_id, generation, pid);
        }
        tracing::info!(
            session = session_id,
            generation,
            tool = %profile.id,
            pid = ?process.id(),
            cwd = %cwd.display(),
            "Turn started"
        );

        let run = TurnRun {
            session_id: session_id.to_string(),
            generation,
            grammar: profile.grammar,
            throttle: self.inner.throttle.clone(),
            built,
            registry,
            cancel,
            events: tx,
        };
        tokio::spawn(run.run(process));
        handle
    }

    /// Cancel the running turn of `session_id`. Returns false if none was running.
    pub fn cancel(&self, session_id: &str) -> bool {
        self.inner.registry.cancel(session_id)
    }

    /// Cancel every running turn. Used at shutdown.
    pub fn destroy_all(&self) -> usize {
        let cancelled = self.inner.registry.cancel_all();
        if cancelled > 0 {
            tracing::info!(cancelled, "Cancelled all running turns");
        }
        cancelled
    }

    #[must_use]
    pub fn is_running(&self, session_id: &str) -> bool {
        self.inner.registry.is_running(session_id)
    }

    #[must_use]
    pub fn state(&self, session_id: &str) -> RunState {
        self.inner.registry.state(session_id)
    }
}
