//! Incremental UTF-8 decoding for plain-text output.

/// Decodes byte chunks to text, holding back a trailing incomplete
/// character until the rest of it arrives. Invalid sequences become U+FFFD.
#[derive(Debug, Default, Clone)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Create an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a chunk, returning all text that is complete so far.
    pub fn push(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);

        let mut out = String::new();
        loop {
            let (valid, invalid) = match std::str::from_utf8(&self.pending) {
                Ok(_) => (self.pending.len(), None),
                Err(e) => (e.valid_up_to(), e.error_len()),
            };
            out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
            if let Some(len) = invalid {
                out.push(char::REPLACEMENT_CHARACTER);
                self.pending.drain(..valid + len);
            } else {
                self.pending.drain(..valid);
                break;
            }
        }
        out
    }

    /// Bytes held back as an incomplete character.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
