//! Installation probing for tool profiles.

use std::process::Stdio;
use std::time::Duration;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};

use crate::config::ShellConfig;

use super::ToolProfile;

/// Time allowed for a version probe before the tool counts as missing.
pub const DETECT_TIMEOUT: Duration = Duration::from_secs(8);

/// Result of probing one tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    /// Profile id.
    pub tool_id: String,
    /// Whether the probe succeeded.
    pub installed: bool,
    /// Trimmed probe output, empty when not installed.
    pub version: String,
}

impl Detection {
    fn missing(tool_id: &str) -> Self {
        Self {
            tool_id: tool_id.to_string(),
            installed: false,
            version: String::new(),
        }
    }
}

/// Probe one tool by running its detect command through the shell.
///
/// Any failure (spawn error, non-zero exit, timeout) reports the tool as
/// not installed.
pub async fn detect(profile: &ToolProfile, shell: &ShellConfig) -> Detection {
    let script = profile.detect_command();
    let mut cmd = shell.command(&script);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(DETECT_TIMEOUT, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            tracing::debug!(tool = %profile.id, error = %e, "Detect command failed to run");
            return Detection::missing(&profile.id);
        }
        Err(_) => {
            tracing::debug!(tool = %profile.id, "Detect command timed out");
            return Detection::missing(&profile.id);
        }
    };

    if !output.status.success() {
        tracing::debug!(tool = %profile.id, status = ?output.status, "Tool not installed");
        return Detection::missing(&profile.id);
    }

    let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
    tracing::debug!(tool = %profile.id, version = %version, "Tool detected");
    Detection {
        tool_id: profile.id.clone(),
        installed: true,
        version,
    }
}

/// Probe every profile concurrently, preserving input order.
pub async fn detect_all<'a, I>(profiles: I, shell: &ShellConfig) -> Vec<Detection>
where
    I: IntoIterator<Item = &'a ToolProfile>,
{
    join_all(profiles.into_iter().map(|p| detect(p, shell))).await
}
