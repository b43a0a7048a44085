//! Server-Sent Events framing and parsing.
//!
//! Only the subset heartbeat mode speaks is handled: `data:` lines, comment
//! lines and blank-line dispatch. Other fields are ignored. The parser works
//! on raw bytes so that a frame, or a UTF-8 sequence inside it, may be split
//! across reads at any position. Lines are only decoded once their
//! terminating newline has arrived.

use std::fmt;
use tracing::trace;

use super::event_stream::EventDecoder;
use crate::types::{RawUnit, StreamEvent};

/// One dispatched SSE frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Joined `data:` lines
    pub data: String,
}

impl SseEvent {
    /// Create a frame carrying `data`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hangup::shared::sse_parser::SseEvent;
    ///
    /// let event = SseEvent::new(r#"{"type":"heartbeat"}"#);
    /// assert_eq!(event.to_string(), "data: {\"type\":\"heartbeat\"}\n\n");
    /// ```
    pub fn new(data: impl Into<String>) -> Self {
        Self { data: data.into() }
    }
}

impl fmt::Display for SseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.data.lines() {
            writeln!(f, "data: {}", line)?;
        }
        writeln!(f)
    }
}

/// Incremental SSE parser.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    data: String,
}

impl SseParser {
    /// Create a new SSE parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes to the parser and get the events they complete.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hangup::shared::sse_parser::SseParser;
    ///
    /// let mut parser = SseParser::new();
    /// assert!(parser.feed(b"data: hel").is_empty());
    /// let events = parser.feed(b"lo\n\n");
    /// assert_eq!(events.len(), 1);
    /// assert_eq!(events[0].data, "hello");
    /// ```
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        let Some(last_newline) = chunk.iter().rposition(|&b| b == b'\n') else {
            self.buffer.extend_from_slice(chunk);
            return Vec::new();
        };

        // Everything up to the last newline is complete lines.
        let mut complete = std::mem::take(&mut self.buffer);
        complete.extend_from_slice(&chunk[..last_newline]);
        self.buffer.extend_from_slice(&chunk[last_newline + 1..]);

        complete
            .split(|&b| b == b'\n')
            .filter_map(|line| self.process_line(line.strip_suffix(b"\r").unwrap_or(line)))
            .collect()
    }

    /// Flush whatever the stream left behind when it ended.
    ///
    /// An unterminated last line is processed and a pending event without
    /// its blank separator line is dispatched.
    pub fn finish(&mut self) -> Option<SseEvent> {
        let rest = std::mem::take(&mut self.buffer);
        if !rest.is_empty() {
            if let Some(event) = self.process_line(rest.strip_suffix(b"\r").unwrap_or(&rest[..])) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &[u8]) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(b":") {
            return None;
        }

        let (field, value) = match line.iter().position(|&b| b == b':') {
            Some(colon) => {
                let value = &line[colon + 1..];
                (&line[..colon], value.strip_prefix(b" ").unwrap_or(value))
            },
            None => (line, &[][..]),
        };

        if field == b"data" {
            if !self.data.is_empty() {
                self.data.push('\n');
            }
            self.data.push_str(&String::from_utf8_lossy(value));
        }
        None
    }

    /// Dispatch the pending frame if it has data.
    fn dispatch(&mut self) -> Option<SseEvent> {
        let data = std::mem::take(&mut self.data);
        (!data.is_empty()).then(|| SseEvent { data })
    }
}

/// Decodes heartbeat-mode bodies into client events.
///
/// Each frame's data is one JSON unit dispatched on its `type` field.
/// Frames that are not JSON, or whose `type` is not `progress`, `complete`
/// or `heartbeat`, are skipped.
#[derive(Debug, Default)]
pub struct SseDecoder {
    parser: SseParser,
    skipped: usize,
}

impl SseDecoder {
    /// Create a decoder for one response body.
    pub fn new() -> Self {
        Self::default()
    }

    fn decode(&mut self, frame: SseEvent) -> Option<StreamEvent> {
        match serde_json::from_str::<RawUnit>(&frame.data) {
            Ok(raw) => raw.into_event(),
            Err(e) => {
                self.skipped += 1;
                trace!(error = %e, "skipping malformed SSE frame");
                None
            },
        }
    }
}

impl EventDecoder for SseDecoder {
    fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.parser
            .feed(chunk)
            .into_iter()
            .filter_map(|frame| self.decode(frame))
            .collect()
    }

    fn finish(&mut self) -> Vec<StreamEvent> {
        self.parser
            .finish()
            .and_then(|frame| self.decode(frame))
            .into_iter()
            .collect()
    }

    fn skipped(&self) -> usize {
        self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Mode;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sse_parser_multiline_data() {
        let mut parser = SseParser::new();

        let events = parser.feed(b"data: line 1\ndata: line 2\r\n\r\n");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "line 1\nline 2");
    }

    #[test]
    fn test_sse_parser_ignores_comments_and_other_fields() {
        let mut parser = SseParser::new();

        let events = parser.feed(b": keep-alive\nid: 7\nevent: note\nretry: 5000\ndata: actual\n\n");

        assert_eq!(events, vec![SseEvent::new("actual")]);
    }

    #[test]
    fn test_sse_parser_many_frames_in_one_chunk() {
        let mut parser = SseParser::new();
        let body: String = (0..500).map(|i| format!("data: {}\n\n", i)).collect();

        let events = parser.feed(body.as_bytes());

        assert_eq!(events.len(), 500);
        assert_eq!(events[499].data, "499");
    }

    #[test]
    fn test_sse_parser_split_inside_utf8() {
        let mut parser = SseParser::new();
        let frame = "data: caf\u{e9}\n\n".as_bytes();
        let split = frame.iter().position(|&b| b == 0xC3).unwrap() + 1;

        assert!(parser.feed(&frame[..split]).is_empty());
        let events = parser.feed(&frame[split..]);
        assert_eq!(events[0].data, "caf\u{e9}");
    }

    #[test]
    fn test_sse_parser_finish_flushes_unterminated_frame() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"data: tail").is_empty());
        assert_eq!(parser.finish().map(|e| e.data), Some("tail".to_string()));
        assert_eq!(parser.finish(), None);
    }

    #[test]
    fn test_sse_event_display_splits_lines() {
        assert_eq!(SseEvent::new("a\nb").to_string(), "data: a\ndata: b\n\n");
    }

    #[test]
    fn decoder_dispatches_on_type() {
        let mut decoder = SseDecoder::new();
        let body = concat!(
            "data: {\"type\":\"start\",\"mode\":\"heartbeat\",\"duration\":3000}\n\n",
            "data: {\"type\":\"heartbeat\",\"timestamp\":\"2024-05-01T12:00:01Z\"}\n\n",
            "data: not json\n\n",
            "data: {\"type\":\"complete\",\"mode\":\"heartbeat\",\"message\":\"done\",",
            "\"timestamp\":\"2024-05-01T12:00:03Z\",\"duration\":3000}\n\n",
        );

        let events = decoder.feed(body.as_bytes());
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], StreamEvent::Heartbeat(_)));
        match &events[1] {
            StreamEvent::Complete(c) => assert_eq!(c.mode, Mode::Heartbeat),
            other => panic!("expected completion, got {:?}", other),
        }
        assert_eq!(decoder.skipped(), 1);
    }
}
