//! Incremental decoder for the relay's `text/event-stream` bodies.
//!
//! Bytes arrive in arbitrary pieces from the network; frames are only
//! emitted once their terminating blank line has been seen, so a multi-byte
//! character split across two reads is decoded intact.

use crate::{StreamEvent, DONE_SENTINEL};

#[derive(Debug, Clone, PartialEq)]
pub enum SseFrame {
    Event(StreamEvent),
    Done,
    /// A `data:` payload that is neither the sentinel nor a known event.
    Unrecognized(String),
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw body bytes and return every frame completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend(bytes.iter().copied().filter(|b| *b != b'\r'));

        let mut frames = Vec::new();
        while let Some(end) = find_blank_line(&self.buffer) {
            let block: Vec<u8> = self.buffer.drain(..end + 2).collect();
            let text = String::from_utf8_lossy(&block[..end]);
            if let Some(frame) = parse_block(&text) {
                frames.push(frame);
            }
        }
        frames
    }

    /// True when bytes of an unfinished frame are still buffered.
    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty()
    }
}

/// Decode a complete body in one go.
pub fn decode_all(bytes: &[u8]) -> Vec<SseFrame> {
    SseDecoder::new().push(bytes)
}

fn find_blank_line(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}

fn parse_block(block: &str) -> Option<SseFrame> {
    let mut data: Option<String> = None;
    for line in block.lines() {
        // Comment lines (keep-alives) start with ':'
        let Some(rest) = line.strip_prefix("data:") else {
            continue;
        };
        let rest = rest.strip_prefix(' ').unwrap_or(rest);
        match data.as_mut() {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(rest);
            }
            None => data = Some(rest.to_string()),
        }
    }

    let data = data?;
    if data == DONE_SENTINEL {
        return Some(SseFrame::Done);
    }
    Some(match serde_json::from_str::<StreamEvent>(&data) {
        Ok(event) => SseFrame::Event(event),
        Err(_) => SseFrame::Unrecognized(data),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_content_error_and_done() {
        let body = b"data: {\"content\":\"Hel\"}\n\ndata: {\"error\":\"nope\"}\n\ndata: [DONE]\n\n";
        assert_eq!(
            decode_all(body),
            vec![
                SseFrame::Event(StreamEvent::content("Hel")),
                SseFrame::Event(StreamEvent::error("nope")),
                SseFrame::Done,
            ]
        );
    }

    #[test]
    fn holds_partial_frames_until_terminated() {
        let mut decoder = SseDecoder::new();
        let body = "data: {\"content\":\"héllo\"}\n\n".as_bytes();
        // split inside the two-byte 'é'
        let split = body.iter().position(|b| *b == 0xC3).unwrap() + 1;

        assert!(decoder.push(&body[..split]).is_empty());
        assert!(decoder.has_pending());
        assert_eq!(
            decoder.push(&body[split..]),
            vec![SseFrame::Event(StreamEvent::content("héllo"))]
        );
        assert!(!decoder.has_pending());
    }

    #[test]
    fn skips_comments_and_accepts_crlf() {
        let frames = decode_all(b":\n\ndata: [DONE]\r\n\r\n");
        assert_eq!(frames, vec![SseFrame::Done]);
    }

    #[test]
    fn unknown_payloads_are_surfaced() {
        let frames = decode_all(b"data: {\"delta\":1}\n\n");
        assert_eq!(frames, vec![SseFrame::Unrecognized("{\"delta\":1}".into())]);
    }
}
