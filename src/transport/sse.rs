//! Server-Sent Event Decoding
//!
//! Incremental decoder for the push channel. Bytes arrive in arbitrary
//! chunks; complete frames are emitted once their terminating blank line has
//! been seen.

use tracing::warn;

/// One dispatched event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: String,
    pub data: String,
}

const DEFAULT_EVENT: &str = "message";

/// Longest unterminated line kept while waiting for its newline.
pub const MAX_PENDING: usize = 1024 * 1024;

#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and collect every frame it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.pending.extend_from_slice(chunk);
        let mut frames = Vec::new();

        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(frame) = self.feed_line(&line) {
                frames.push(frame);
            }
        }

        if self.pending.len() > MAX_PENDING {
            warn!(
                "Dropping partial event: {} bytes without a line break",
                self.pending.len()
            );
            self.pending.clear();
            self.event = None;
            self.data.clear();
        }
        frames
    }

    fn feed_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseFrame {
            event: event.unwrap_or_else(|| DEFAULT_EVENT.to_string()),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"event: production_upd").is_empty());
        assert!(decoder.push(b"ate\ndata: {\"total_quantity\"").is_empty());
        let frames = decoder.push(b": 3}\n\n");
        assert_eq!(
            frames,
            vec![SseFrame {
                event: "production_update".to_string(),
                data: "{\"total_quantity\": 3}".to_string(),
            }]
        );
    }

    #[test]
    fn test_comments_and_crlf() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b": keep-alive\r\n\r\nevent: scrap_update\r\ndata: {}\r\n\r\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, "scrap_update");
    }

    #[test]
    fn test_unterminated_line_is_capped() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"event: scrap_update\ndata: ").is_empty());
        let flood = vec![b'x'; MAX_PENDING + 1];
        assert!(decoder.push(&flood).is_empty());
        assert!(decoder.pending.is_empty());

        // The dropped frame leaves nothing behind for the next one.
        let frames = decoder.push(b"\ndata: {}\n\n");
        assert_eq!(
            frames,
            vec![SseFrame {
                event: "message".to_string(),
                data: "{}".to_string(),
            }]
        );
    }

    #[test]
    fn test_multiline_data_and_default_event() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"data: a\ndata: b\n\n");
        assert_eq!(frames[0].event, "message");
        assert_eq!(frames[0].data, "a\nb");
    }
}
