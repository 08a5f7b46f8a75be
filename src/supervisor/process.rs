//! Turn subprocess spawning and control.

use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, ChildStderr, ChildStdout};

use crate::config::ShellConfig;

/// Error type for process spawning operations.
#[derive(thiserror::Error, Debug)]
pub enum SpawnError {
    /// The shell or the working directory was not found.
    #[error("Shell or working directory not found: {0}")]
    NotFound(std::io::Error),
    /// Permission denied when spawning.
    #[error("Permission denied: {0}")]
    PermissionDenied(std::io::Error),
    /// Other I/O error.
    #[error("I/O error: {0}")]
    Io(std::io::Error),
}

impl SpawnError {
    /// Create a `SpawnError` from an I/O error, classifying common cases.
    #[must_use]
    pub fn from_io(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(err),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(err),
            _ => Self::Io(err),
        }
    }
}

/// Send `SIGKILL` to the process group led by `pid`.
///
/// Turn processes lead their own group, so this also reaches the tool the
/// shell started and anything piped into it.
#[cfg(unix)]
pub fn kill_process_group(pid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        tracing::debug!(pid, error = %e, "killpg failed");
    }
}

#[cfg(not(unix))]
pub fn kill_process_group(_pid: u32) {}

/// A running turn subprocess: `<shell> [-l] -c <command>`.
#[derive(Debug)]
pub struct TurnProcess {
    child: Child,
}

impl TurnProcess {
    /// Spawn `command` through `shell` inside `cwd`.
    ///
    /// # Errors
    ///
    /// Returns `SpawnError` if the process fails to spawn.
    pub fn spawn(shell: &ShellConfig, command: &str, cwd: &Path) -> Result<Self, SpawnError> {
        let mut cmd = shell.command(command);
        cmd.current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn().map_err(SpawnError::from_io)?;
        Ok(Self { child })
    }

    /// Take ownership of the stdout handle.
    ///
    /// This can only be called once; subsequent calls return `None`.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Take ownership of the stderr handle.
    ///
    /// This can only be called once; subsequent calls return `None`.
    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.child.stderr.take()
    }

    /// Get the process ID, if still running.
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Wait for the process to exit.
    ///
    /// # Errors
    ///
    /// Returns an error if waiting fails.
    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// Kill the whole process group without waiting.
    pub fn kill(&mut self) {
        if let Some(pid) = self.id() {
            kill_process_group(pid);
        }
        if let Err(e) = self.child.start_kill() {
            tracing::debug!(error = %e, "start_kill failed");
        }
    }
}

/// Exit code of a finished process, `-1` when killed by a signal.
#[must_use]
pub fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}
