//! Registry of known tool profiles.

use crate::decode::OutputGrammar;

use super::{ArgGroups, ToolProfile};

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn claude_code() -> ToolProfile {
    ToolProfile::new("claude-code", "Claude Code", "claude")
        .with_args(ArgGroups {
            print_mode: args(&["-p"]),
            continue_session: args(&["-c"]),
            skip_confirm: args(&["--dangerously-skip-permissions"]),
            resume: args(&["--resume"]),
            output_format: args(&["--output-format", "stream-json", "--verbose"]),
            input_format: args(&["--input-format", "stream-json"]),
            ..ArgGroups::default()
        })
        .with_grammar(OutputGrammar::Claude)
}

fn gemini_cli() -> ToolProfile {
    ToolProfile::new("gemini-cli", "Gemini CLI", "gemini")
        .with_args(ArgGroups {
            skip_confirm: args(&["-y"]),
            resume: args(&["-r"]),
            model_selector: args(&["-m"]),
            output_format: args(&["-o", "stream-json"]),
            ..ArgGroups::default()
        })
        .with_grammar(OutputGrammar::Gemini)
}

fn codex() -> ToolProfile {
    ToolProfile::new("codex", "Codex", "codex")
        .with_args(ArgGroups {
            default: args(&["exec"]),
            skip_confirm: args(&["--full-auto", "--skip-git-repo-check"]),
            resume: args(&["resume"]),
            model_selector: args(&["-m"]),
            image_path: args(&["-i"]),
            output_format: args(&["--json"]),
            ..ArgGroups::default()
        })
        .resume_before_message()
        .with_grammar(OutputGrammar::Codex)
}

fn qwen_code() -> ToolProfile {
    ToolProfile::new("qwen-code", "Qwen Code", "qwen-code").with_args(ArgGroups {
        print_mode: args(&["-p"]),
        continue_session: args(&["-c"]),
        skip_confirm: args(&["--yes"]),
        ..ArgGroups::default()
    })
}

fn kimi_code() -> ToolProfile {
    ToolProfile::new("kimi-code", "Kimi Code", "kimi").with_args(ArgGroups {
        print_mode: args(&["-p"]),
        continue_session: args(&["-c"]),
        skip_confirm: args(&["--yes"]),
        ..ArgGroups::default()
    })
}

fn copilot() -> ToolProfile {
    ToolProfile::new("copilot", "GitHub Copilot", "copilot").with_args(ArgGroups {
        print_mode: args(&["-p"]),
        continue_session: args(&["--continue"]),
        skip_confirm: args(&["--yolo"]),
        resume: args(&["--resume"]),
        ..ArgGroups::default()
    })
}

/// Ordered set of tool profiles, looked up by id.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    profiles: Vec<ToolProfile>,
}

impl ToolRegistry {
    /// Registry with the built-in profiles.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            profiles: vec![
                claude_code(),
                gemini_cli(),
                codex(),
                qwen_code(),
                kimi_code(),
                copilot(),
            ],
        }
    }

    /// Registry with no profiles.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            profiles: Vec::new(),
        }
    }

    /// Built-in profiles overlaid with profiles declared in configuration.
    #[must_use]
    pub fn from_config(overrides: &[ToolProfile]) -> Self {
        let mut registry = Self::builtin();
        for profile in overrides {
            registry.register(profile.clone());
        }
        registry
    }

    /// Add a profile, replacing any existing profile with the same id.
    pub fn register(&mut self, profile: ToolProfile) {
        if let Some(existing) = self.profiles.iter_mut().find(|p| p.id == profile.id) {
            tracing::debug!(tool = %profile.id, "Replacing tool profile");
            *existing = profile;
        } else {
            tracing::debug!(tool = %profile.id, "Registering tool profile");
            self.profiles.push(profile);
        }
    }

    /// Find a profile by id.
    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<&ToolProfile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    /// Iterate profiles in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ToolProfile> {
        self.profiles.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
