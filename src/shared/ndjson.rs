//! Newline-delimited JSON (NDJSON) decoding.
//!
//! Used for the stream and chunked modes. Each complete line is one unit;
//! the bytes after the last newline stay buffered until the next read.

use tracing::trace;

use super::event_stream::EventDecoder;
use crate::types::{RawUnit, StreamEvent};

/// Incremental NDJSON decoder for one response body.
///
/// Lines that are not valid JSON are counted and skipped. Units whose
/// `type`/`status` is neither `progress` nor `complete` are ignored.
///
/// # Examples
///
/// ```rust
/// use hangup::shared::event_stream::EventDecoder;
/// use hangup::shared::ndjson::NdjsonDecoder;
/// use hangup::types::StreamEvent;
///
/// let mut decoder = NdjsonDecoder::new();
/// assert!(decoder.feed(br#"{"type":"progress","progress":2"#).is_empty());
/// let events = decoder.feed(b"0,\"elapsed\":1000}\n");
/// assert!(matches!(events[0], StreamEvent::Progress(p) if p.percent == 20));
/// ```
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
    skipped: usize,
}

impl NdjsonDecoder {
    /// Create a decoder with an empty line buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes received after the last complete line.
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    fn decode_line(&mut self, line: &[u8]) -> Option<StreamEvent> {
        let line = line.trim_ascii();
        if line.is_empty() {
            return None;
        }

        match serde_json::from_slice::<RawUnit>(line) {
            Ok(raw) => match raw.into_event()? {
                StreamEvent::Heartbeat(_) => None,
                event => Some(event),
            },
            Err(e) => {
                self.skipped += 1;
                trace!(error = %e, len = line.len(), "skipping malformed NDJSON line");
                None
            },
        }
    }
}

impl EventDecoder for NdjsonDecoder {
    fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        let Some(last_newline) = chunk.iter().rposition(|&b| b == b'\n') else {
            self.buffer.extend_from_slice(chunk);
            return Vec::new();
        };

        let mut complete = std::mem::take(&mut self.buffer);
        complete.extend_from_slice(&chunk[..last_newline]);
        self.buffer.extend_from_slice(&chunk[last_newline + 1..]);

        complete
            .split(|&b| b == b'\n')
            .filter_map(|line| self.decode_line(line))
            .collect()
    }

    fn finish(&mut self) -> Vec<StreamEvent> {
        let rest = std::mem::take(&mut self.buffer);
        self.decode_line(&rest).into_iter().collect()
    }

    fn skipped(&self) -> usize {
        self.skipped
    }
}
