//! Turns a tool profile, a message and turn options into a shell command.

use std::io::Write;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{json, Value};

use crate::profile::ToolProfile;

use super::TurnOptions;

/// Prefix of structured-input temp files.
pub const TEMP_FILE_PREFIX: &str = "cli-relay_";

/// Error type for command building.
#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    /// The structured-input file could not be written.
    #[error("Failed to write structured input file: {0}")]
    TempFile(#[from] std::io::Error),
    /// The structured-input document could not be encoded.
    #[error("Failed to encode structured input: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Quote `s` for a POSIX shell.
///
/// The result is always single-quoted; embedded single quotes become
/// `'\''`.
#[must_use]
pub fn shell_escape(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// A fully assembled command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltCommand {
    /// Shell command string.
    pub command: String,
    /// Auxiliary input file to delete once the process exits.
    pub temp_file: Option<PathBuf>,
}

impl BuiltCommand {
    /// A command with no auxiliary file.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            temp_file: None,
        }
    }

    /// Delete the auxiliary file, ignoring failures.
    pub fn remove_temp_file(&self) {
        if let Some(path) = &self.temp_file {
            if let Err(e) = std::fs::remove_file(path) {
                tracing::debug!(path = %path.display(), error = %e, "Temp file cleanup failed");
            }
        }
    }
}

/// MIME type from an image file extension, `image/png` when unknown.
#[must_use]
pub fn image_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => "image/png",
    }
}

fn image_block(path: &Path) -> Option<Value> {
    match std::fs::read(path) {
        Ok(bytes) => Some(json!({
            "type": "image",
            "source": {
                "type": "base64",
                "media_type": image_mime(path),
                "data": STANDARD.encode(bytes),
            }
        })),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable image");
            None
        }
    }
}

/// Builds turn commands for one profile.
#[derive(Debug, Clone)]
pub struct CommandBuilder<'a> {
    profile: &'a ToolProfile,
    temp_dir: Option<PathBuf>,
}

impl<'a> CommandBuilder<'a> {
    #[must_use]
    pub fn new(profile: &'a ToolProfile) -> Self {
        Self {
            profile,
            temp_dir: None,
        }
    }

    /// Directory for structured-input files, the system temp dir by default.
    #[must_use]
    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Build the command for one turn.
    ///
    /// Attached images go through a structured stdin document when the
    /// profile declares an input format, otherwise through per-image path
    /// arguments.
    ///
    /// # Errors
    ///
    /// Returns `BuildError` if the structured-input file cannot be written.
    pub fn build(&self, message: &str, options: &TurnOptions) -> Result<BuiltCommand, BuildError> {
        if options.has_images() && !self.profile.args.input_format.is_empty() {
            return self.build_structured(message, options);
        }
        Ok(BuiltCommand::new(self.build_direct(message, options)))
    }

    fn build_direct(&self, message: &str, options: &TurnOptions) -> String {
        let args = &self.profile.args;
        let mut parts = vec![self.profile.command.clone()];
        parts.extend(args.default.iter().cloned());
        parts.extend(args.print_mode.iter().cloned());

        if self.profile.resume_before_message && !args.resume.is_empty() {
            if let Some(session_id) = &options.native_session_id {
                parts.extend(args.resume.iter().cloned());
                parts.push(session_id.clone());
            }
        }

        parts.push(shell_escape(message));
        parts.extend(args.skip_confirm.iter().cloned());
        self.push_model_and_output(&mut parts, options);

        if options.has_images() && !args.image_path.is_empty() {
            for path in &options.image_paths {
                if !path.exists() {
                    tracing::warn!(path = %path.display(), "Skipping missing image");
                    continue;
                }
                parts.extend(args.image_path.iter().cloned());
                parts.push(shell_escape(&path.to_string_lossy()));
            }
        }

        if !self.profile.resume_before_message {
            self.push_resume_or_continue(&mut parts, options);
        }

        parts.join(" ")
    }

    fn build_structured(
        &self,
        message: &str,
        options: &TurnOptions,
    ) -> Result<BuiltCommand, BuildError> {
        let args = &self.profile.args;
        let document = structured_input(message, &options.image_paths);
        let temp_file = self.write_temp_file(&document)?;
        tracing::debug!(path = %temp_file.display(), "Wrote structured input");

        let mut parts = vec![
            "cat".to_string(),
            shell_escape(&temp_file.to_string_lossy()),
            "|".to_string(),
            self.profile.command.clone(),
        ];
        parts.extend(args.default.iter().cloned());
        parts.push("--print".to_string());
        parts.extend(args.skip_confirm.iter().cloned());
        parts.extend(args.input_format.iter().cloned());
        self.push_model_and_output(&mut parts, options);
        self.push_resume_or_continue(&mut parts, options);

        Ok(BuiltCommand {
            command: parts.join(" "),
            temp_file: Some(temp_file),
        })
    }

    fn push_model_and_output(&self, parts: &mut Vec<String>, options: &TurnOptions) {
        let args = &self.profile.args;
        if let Some(model) = &options.model {
            parts.extend(args.model_selector.iter().cloned());
            parts.push(model.clone());
        }
        if options.thinking && !args.thinking.is_empty() {
            parts.extend(args.thinking.iter().cloned());
        }
        parts.extend(args.output_format.iter().cloned());
    }

    fn push_resume_or_continue(&self, parts: &mut Vec<String>, options: &TurnOptions) {
        let args = &self.profile.args;
        match &options.native_session_id {
            Some(session_id) if !args.resume.is_empty() => {
                parts.extend(args.resume.iter().cloned());
                parts.push(session_id.clone());
            }
            _ if !options.is_first => parts.extend(args.continue_session.iter().cloned()),
            _ => {}
        }
    }

    fn write_temp_file(&self, document: &Value) -> Result<PathBuf, BuildError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_FILE_PREFIX).suffix(".json");
        let mut file = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        serde_json::to_writer(&mut file, document)?;
        file.write_all(b"\n")?;
        file.flush()?;
        let (_, path) = file.keep().map_err(|e| e.error)?;
        Ok(path)
    }
}

/// The single-line user message fed to structured stdin: image blocks for
/// every readable image, then the text block.
#[must_use]
pub fn structured_input(message: &str, image_paths: &[PathBuf]) -> Value {
    let mut content: Vec<Value> = image_paths
        .iter()
        .map(PathBuf::as_path)
        .filter_map(image_block)
        .collect();
    content.push(json!({ "type": "text", "text": message }));
    json!({
        "type": "user",
        "message": {
            "role": "user",
            "content": content,
        }
    })
}
