//! Incremental `text/event-stream` framing.
//!
//! Only the `data` field matters for progress payloads; `event`, `id`,
//! `retry` and comment lines are skipped.

#[derive(Debug, Default)]
pub struct SseDecoder {
    line_buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds raw bytes and returns the payloads of every event completed by them.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.line_buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some((line_end, terminator_len)) = self.next_line_end() {
            let line = self.line_buffer.drain(..line_end).collect::<Vec<_>>();
            self.line_buffer.drain(..terminator_len);
            if let Some(payload) = self.process_line(&line) {
                events.push(payload);
            }
        }
        events
    }

    /// Position and length of the first complete line terminator: `\r\n`,
    /// `\n` or a lone `\r`. A `\r` at the very end of the buffer waits for
    /// the next chunk since it may be the first half of `\r\n`.
    fn next_line_end(&self) -> Option<(usize, usize)> {
        let index = self
            .line_buffer
            .iter()
            .position(|byte| matches!(byte, b'\r' | b'\n'))?;
        if self.line_buffer[index] == b'\n' {
            return Some((index, 1));
        }
        match self.line_buffer.get(index + 1) {
            Some(b'\n') => Some((index, 2)),
            Some(_) => Some((index, 1)),
            None => None,
        }
    }

    /// Flushes a trailing event the server did not terminate with a blank line.
    pub fn finish(&mut self) -> Option<String> {
        if !self.line_buffer.is_empty() {
            let line = std::mem::take(&mut self.line_buffer);
            let line = line.strip_suffix(b"\r").unwrap_or(line.as_slice()).to_vec();
            if let Some(payload) = self.process_line(&line) {
                return Some(payload);
            }
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &[u8]) -> Option<String> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(b":") {
            return None;
        }
        let line = String::from_utf8_lossy(line);
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line.as_ref(), ""),
        };
        if field == "data" {
            self.data.push(value.to_string());
        }
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        let payload = self.data.join("\n");
        self.data.clear();
        Some(payload)
    }
}
