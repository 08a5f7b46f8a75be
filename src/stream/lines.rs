//! Line reassembly over arbitrarily fragmented byte chunks.

/// Buffers partial output and yields complete, trimmed, non-blank lines.
///
/// Works on bytes so multi-byte characters split across chunks are only
/// decoded once the whole line is present. The unterminated remainder stays
/// buffered until a newline arrives or [`discard`](Self::discard) is called.
#[derive(Debug, Default, Clone)]
pub struct LineReassembler {
    pending: Vec<u8>,
    /// Prefix of `pending` already known to hold no newline.
    scanned: usize,
}

impl LineReassembler {
    /// Create an empty reassembler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        let mut from = self.scanned;
        while let Some(offset) = self.pending[from..].iter().position(|&b| b == b'\n') {
            let end = from + offset;
            let line = String::from_utf8_lossy(&self.pending[start..end]);
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                lines.push(trimmed.to_string());
            }
            start = end + 1;
            from = start;
        }
        self.pending.drain(..start);
        self.scanned = self.pending.len();

        lines
    }

    /// Number of buffered bytes not yet terminated by a newline.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drop the unterminated remainder, returning how many bytes were lost.
    pub fn discard(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        self.scanned = 0;
        dropped
    }
}
