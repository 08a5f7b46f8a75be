//! Streaming filter that removes bracketed marker spans from plain text.
//!
//! Tools without structured output interleave `<thinking>` blocks with the
//! reply. The filter drops everything from an opening marker through its
//! closing marker, even when either marker is split across chunks.

/// Opening marker of a thinking span.
pub const THINKING_OPEN: &str = "<thinking>";
/// Closing marker of a thinking span.
pub const THINKING_CLOSE: &str = "</thinking>";

/// Incremental marker-span filter.
#[derive(Debug, Clone)]
pub struct MarkerFilter {
    open: String,
    close: String,
    inside: bool,
    /// Held-back tail that may be the start of a marker.
    carry: String,
    /// Drop one newline directly after a closing marker.
    trim_newline: bool,
}

impl Default for MarkerFilter {
    fn default() -> Self {
        Self::thinking()
    }
}

impl MarkerFilter {
    /// Create a filter for an arbitrary marker pair.
    #[must_use]
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
            inside: false,
            carry: String::new(),
            trim_newline: false,
        }
    }

    /// Filter for `<thinking>` spans.
    #[must_use]
    pub fn thinking() -> Self {
        Self::new(THINKING_OPEN, THINKING_CLOSE)
    }

    /// Whether the filter is currently inside a marker span.
    #[must_use]
    pub fn is_inside(&self) -> bool {
        self.inside
    }

    /// Feed a chunk and return the text that is safe to show.
    pub fn push(&mut self, chunk: &str) -> String {
        let mut buf = std::mem::take(&mut self.carry);
        buf.push_str(chunk);

        let mut out = String::new();
        let mut rest = buf.as_str();

        loop {
            if self.trim_newline {
                if let Some(stripped) = rest.strip_prefix("\r\n") {
                    rest = stripped;
                } else if let Some(stripped) = rest.strip_prefix('\n') {
                    rest = stripped;
                } else if rest.is_empty() || rest == "\r" {
                    self.carry = rest.to_string();
                    break;
                }
                self.trim_newline = false;
            }

            if self.inside {
                if let Some(pos) = rest.find(self.close.as_str()) {
                    rest = &rest[pos + self.close.len()..];
                    self.inside = false;
                    self.trim_newline = true;
                } else {
                    let keep = partial_suffix_len(rest, &self.close);
                    self.carry = rest[rest.len() - keep..].to_string();
                    break;
                }
            } else if let Some(pos) = rest.find(self.open.as_str()) {
                out.push_str(&rest[..pos]);
                rest = &rest[pos + self.open.len()..];
                self.inside = true;
            } else {
                let keep = partial_suffix_len(rest, &self.open);
                out.push_str(&rest[..rest.len() - keep]);
                self.carry = rest[rest.len() - keep..].to_string();
                break;
            }
        }

        out
    }

    /// Release held-back text at end of stream.
    ///
    /// A dangling partial opening marker is ordinary text; anything inside an
    /// unterminated span stays hidden.
    pub fn flush(&mut self) -> String {
        let carry = std::mem::take(&mut self.carry);
        if self.inside || self.trim_newline {
            self.trim_newline = false;
            return String::new();
        }
        carry
    }
}

/// Length of the longest proper prefix of `marker` that `text` ends with.
fn partial_suffix_len(text: &str, marker: &str) -> usize {
    let bytes = text.as_bytes();
    let max = marker.len().saturating_sub(1).min(bytes.len());
    (1..=max)
        .rev()
        .find(|&k| {
            marker.is_char_boundary(k)
                && text.is_char_boundary(bytes.len() - k)
                && bytes.ends_with(&marker.as_bytes()[..k])
        })
        .unwrap_or(0)
}
