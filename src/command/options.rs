//! Per-turn options.

use std::path::PathBuf;

/// Parameters of one send, constructed fresh per turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOptions {
    /// First turn of the conversation.
    pub is_first: bool,
    /// The tool's own session id from an earlier turn.
    pub native_session_id: Option<String>,
    /// Local image files attached to the message.
    pub image_paths: Vec<PathBuf>,
    /// Model override.
    pub model: Option<String>,
    /// Request extended thinking.
    pub thinking: bool,
}

impl Default for TurnOptions {
    fn default() -> Self {
        Self {
            is_first: true,
            native_session_id: None,
            image_paths: Vec::new(),
            model: None,
            thinking: false,
        }
    }
}

impl TurnOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark this as a follow-up turn.
    #[must_use]
    pub fn follow_up(mut self) -> Self {
        self.is_first = false;
        self
    }

    /// Resume the given native session.
    #[must_use]
    pub fn resume(mut self, session_id: impl Into<String>) -> Self {
        self.native_session_id = Some(session_id.into());
        self
    }

    /// Attach an image file.
    #[must_use]
    pub fn image(mut self, path: impl Into<PathBuf>) -> Self {
        self.image_paths.push(path.into());
        self
    }

    /// Override the model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Enable extended thinking.
    #[must_use]
    pub fn thinking(mut self, enabled: bool) -> Self {
        self.thinking = enabled;
        self
    }

    /// Whether any images are attached.
    #[must_use]
    pub fn has_images(&self) -> bool {
        !self.image_paths.is_empty()
    }
}
