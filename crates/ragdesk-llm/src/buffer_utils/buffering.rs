use anyhow::Result;
use std::collections::VecDeque;

/// Byte buffer that yields complete `\n`-terminated lines
pub struct LineBuffer {
    buffer: VecDeque<u8>,
}

impl LineBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
        }
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend(bytes);
    }

    /// Next complete line with surrounding whitespace (and any `\r`) trimmed.
    /// `None` until a newline has been buffered.
    pub fn next_line(&mut self) -> Option<Result<String>> {
        let newline_pos = self.buffer.iter().position(|&b| b == b'\n')?;
        let line_bytes: Vec<u8> = self.buffer.drain(..=newline_pos).collect();

        match std::str::from_utf8(&line_bytes) {
            Ok(line) => Some(Ok(line.trim().to_string())),
            Err(e) => Some(Err(anyhow::anyhow!("Invalid UTF-8 in stream: {}", e))),
        }
    }

    /// Drain whatever is left once the upstream closes without a trailing newline
    pub fn take_remaining(&mut self) -> Option<Result<String>> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest: Vec<u8> = self.buffer.drain(..).collect();
        match String::from_utf8(rest) {
            Ok(line) => Some(Ok(line.trim().to_string())),
            Err(e) => Some(Err(anyhow::anyhow!("Invalid UTF-8 in stream: {}", e))),
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
