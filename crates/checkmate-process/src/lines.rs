//! Splits a byte stream into complete lines.

/// Accumulates bytes and hands back complete, newline-terminated lines.
///
/// A trailing fragment without a newline is retained and prefixed to the next
/// chunk. Splitting happens on raw bytes so a multi-byte character cut in
/// half by a read boundary is decoded only once it is whole.
#[derive(Debug, Default, Clone)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Appends `chunk` and returns every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let Some(last_newline) = self.pending.iter().rposition(|byte| *byte == b'\n') else {
            return Vec::new();
        };

        let rest = self.pending.split_off(last_newline.saturating_add(1));
        let complete = std::mem::replace(&mut self.pending, rest);
        let Some((_, body)) = complete.split_last() else {
            return Vec::new();
        };
        body.split(|byte| *byte == b'\n').map(decode_line).collect()
    }

    /// Returns the unterminated fragment, if any, leaving the buffer empty.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let fragment = std::mem::take(&mut self.pending);
        Some(decode_line(&fragment))
    }

    /// Returns whether a partial line is waiting for its newline.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

fn decode_line(raw: &[u8]) -> String {
    let trimmed = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(trimmed).into_owned()
}
