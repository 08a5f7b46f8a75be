//! Configuration types.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::profile::ToolProfile;

fn default_shell_program() -> String {
    std::env::var("SHELL")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "/bin/sh".to_string())
}

fn default_login() -> bool {
    true
}

/// Shell used to run built commands and detect probes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Shell executable.
    #[serde(default = "default_shell_program")]
    pub program: String,
    /// Start a login shell so the user's PATH is loaded.
    #[serde(default = "default_login")]
    pub login: bool,
}

impl ShellConfig {
    #[must_use]
    pub fn new(program: impl Into<String>, login: bool) -> Self {
        Self {
            program: program.into(),
            login,
        }
    }

    /// A command running `script` through this shell.
    #[must_use]
    pub fn command(&self, script: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        if self.login {
            cmd.arg("-l");
        }
        cmd.arg("-c").arg(script);
        cmd
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            program: default_shell_program(),
            login: default_login(),
        }
    }
}

/// One throttle step: accumulations shorter than `max_chars` wait `delay_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleStep {
    pub max_chars: usize,
    pub delay_ms: u64,
}

impl ThrottleStep {
    #[must_use]
    pub const fn new(max_chars: usize, delay_ms: u64) -> Self {
        Self {
            max_chars,
            delay_ms,
        }
    }
}

fn default_steps() -> Vec<ThrottleStep> {
    vec![
        ThrottleStep::new(2_000, 100),
        ThrottleStep::new(8_000, 200),
        ThrottleStep::new(20_000, 300),
        ThrottleStep::new(50_000, 400),
    ]
}

fn default_max_delay_ms() -> u64 {
    500
}

/// Render pacing for streamed text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Steps in ascending `max_chars` order.
    #[serde(default = "default_steps")]
    pub steps: Vec<ThrottleStep>,
    /// Delay once the accumulation exceeds every step.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl ThrottleConfig {
    /// Delay before the next render for an accumulation of `len` characters.
    #[must_use]
    pub fn delay_for(&self, len: usize) -> Duration {
        let ms = self
            .steps
            .iter()
            .find(|step| len < step.max_chars)
            .map_or(self.max_delay_ms, |step| step.delay_ms);
        Duration::from_millis(ms)
    }

    /// Shortest configured delay.
    #[must_use]
    pub fn min_delay(&self) -> Duration {
        self.delay_for(0)
    }

    /// Longest configured delay.
    #[must_use]
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            steps: default_steps(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub shell: ShellConfig,
    pub throttle: ThrottleConfig,
    /// Additional or overriding tool profiles.
    pub tools: Vec<ToolProfile>,
}
