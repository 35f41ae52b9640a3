//! Newline framer for the sensor's ASCII serial link.
//!
//! The board prints one record per line (`\n`, optionally preceded by `\r`).
//! Reads arrive in arbitrary chunks, so the framer buffers the trailing
//! partial line between calls and yields only complete lines.
use bytes::{Buf, BytesMut};
use log::warn;

/// Upper bound for a single unterminated line before it is discarded.
const MAX_LINE_BYTES: usize = 4 * 1024;

pub struct LineFramer {
    buf: BytesMut,
    /// Set after an overflow until the rest of that line has been skipped.
    discarding: bool,
}

impl LineFramer {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(512),
            discarding: false,
        }
    }

    /// Push a chunk and return every line it completed, in arrival order.
    ///
    /// Lines are decoded lossily (invalid UTF-8 becomes U+FFFD) and trimmed of
    /// surrounding whitespace; blank lines are skipped. A chunk without a
    /// newline yields nothing. After an overflow the remainder of the
    /// oversized line, up to and including its newline, is dropped too.
    pub fn feed(&mut self, data: &[u8]) -> Vec<String> {
        let data = if self.discarding {
            match data.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    self.discarding = false;
                    &data[pos + 1..]
                }
                None => return Vec::new(),
            }
        } else {
            data
        };
        self.buf.extend_from_slice(data);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let raw = self.buf.split_to(pos);
            self.buf.advance(1); // newline
            let text = String::from_utf8_lossy(&raw);
            let line = text.trim();
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }
        if self.buf.len() > MAX_LINE_BYTES {
            warn!(
                "Discarding {} bytes of unterminated serial input",
                self.buf.len()
            );
            self.buf.clear();
            self.discarding = true;
        }
        lines
    }

    /// Bytes held for an incomplete line.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    pub fn reset(&mut self) {
        self.buf.clear();
        self.discarding = false;
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}
