use std::collections::VecDeque;

use crate::events::RagEvent;

/// Incremental SSE frame decoder.
///
/// Buffers raw bytes across `feed` calls and only interprets complete
/// `\n`-terminated lines, so chunk boundaries may fall anywhere — including
/// in the middle of a line or of a multi-byte UTF-8 character. One decoder
/// instance per stream; it is a pure transform with no knowledge of HTTP or
/// persistence.
pub struct FrameDecoder {
    buffer: VecDeque<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            buffer: VecDeque::with_capacity(4096),
        }
    }

    /// Append a chunk and drain every event parsed from the complete lines
    /// it closes, in arrival order. The trailing incomplete fragment stays
    /// buffered for the next call.
    ///
    /// Malformed frames are dropped, never raised: a line without the
    /// `data: ` prefix, invalid UTF-8 or invalid JSON just skips to the
    /// next line.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<RagEvent> {
        self.buffer.extend(chunk);

        let mut events = Vec::new();

        while let Some(newline_pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line_bytes: Vec<u8> = self.buffer.drain(..=newline_pos).collect();

            let Ok(line) = std::str::from_utf8(&line_bytes) else {
                tracing::debug!("skipping non-UTF-8 SSE line");
                continue;
            };

            let line = line.trim();
            if line.is_empty() {
                // Blank keep-alive line.
                continue;
            }

            let Some(data) = line.strip_prefix("data: ") else {
                continue;
            };

            match serde_json::from_str::<RagEvent>(data) {
                Ok(event) => events.push(event),
                Err(e) => {
                    tracing::debug!(error = %e, "dropping malformed SSE frame");
                }
            }
        }

        events
    }

    /// Bytes held back waiting for a newline.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_line_is_held_back() {
        let mut decoder = FrameDecoder::new();

        assert!(decoder.feed(b"data: {\"type\":\"con").is_empty());
        assert!(decoder.pending() > 0);

        let events = decoder.feed(b"tent\",\"content\":\"hi\"}\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].content(), Some("hi"));
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn non_data_lines_are_ignored() {
        let mut decoder = FrameDecoder::new();
        let events = decoder.feed(b": comment\n\nevent: ping\ndata: {\"type\":\"done\"}\n");
        assert_eq!(events.len(), 1);
        assert!(events[0].is_done());
    }
}
