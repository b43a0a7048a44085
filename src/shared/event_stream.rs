//! Lazy decoding of a response body into client events.

use bytes::Bytes;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;

use super::cancellation::CancelToken;
use super::ndjson::NdjsonDecoder;
use super::sse_parser::SseDecoder;
use crate::error::{Error, Result};
use crate::types::{Mode, StreamEvent};

/// Incremental decoder for one streaming wire format.
///
/// A decoder is scoped to a single response body and keeps whatever partial
/// data the last read left behind.
pub trait EventDecoder: Send {
    /// Consume one chunk of bytes and return the events it completes.
    fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent>;

    /// Flush buffered data once the body has ended.
    fn finish(&mut self) -> Vec<StreamEvent>;

    /// Number of units dropped because they could not be decoded.
    fn skipped(&self) -> usize;
}

impl<D: EventDecoder + ?Sized> EventDecoder for Box<D> {
    fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        (**self).feed(chunk)
    }

    fn finish(&mut self) -> Vec<StreamEvent> {
        (**self).finish()
    }

    fn skipped(&self) -> usize {
        (**self).skipped()
    }
}

/// Pick the decoder for a streaming mode.
///
/// Returns `None` for [`Mode::Signal`], whose body is a single object.
pub fn decoder_for(mode: Mode) -> Option<Box<dyn EventDecoder>> {
    match mode {
        Mode::Signal => None,
        Mode::Stream | Mode::Chunked => Some(Box::new(NdjsonDecoder::new())),
        Mode::Heartbeat => Some(Box::new(SseDecoder::new())),
    }
}

/// Events decoded from a body, ending when the body ends.
pub type EventStream = BoxStream<'static, Result<StreamEvent>>;

struct DecodeState<S, D> {
    body: Option<Pin<Box<S>>>,
    decoder: D,
    token: CancelToken,
    pending: VecDeque<StreamEvent>,
}

impl<S, D> DecodeState<S, D> {
    fn release(&mut self) {
        self.body = None;
        self.pending.clear();
    }
}

enum Step<T> {
    Cancelled,
    Chunk(Option<T>),
}

/// Decode `body` lazily with `decoder`, stopping as soon as `token` fires.
///
/// The body is only polled when the consumer asks for the next event. Once
/// the token is triggered the stream yields one [`Error::Cancelled`], drops
/// the body and ends; a read blocked on the network is abandoned rather than
/// waited for. A read error is yielded once and also ends the stream.
pub fn decode_events<S, E, D>(body: S, decoder: D, token: CancelToken) -> EventStream
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
    D: EventDecoder + 'static,
{
    let state = DecodeState {
        body: Some(Box::pin(body)),
        decoder,
        token,
        pending: VecDeque::new(),
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                if state.token.is_cancelled() {
                    state.release();
                    return Some((Err(Error::Cancelled), state));
                }
                return Some((Ok(event), state));
            }

            let body = state.body.as_mut()?;
            let step = tokio::select! {
                biased;
                () = state.token.cancelled() => Step::Cancelled,
                chunk = body.next() => Step::Chunk(chunk),
            };

            match step {
                Step::Cancelled => {
                    state.release();
                    return Some((Err(Error::Cancelled), state));
                },
                Step::Chunk(Some(Ok(bytes))) => {
                    let events = state.decoder.feed(&bytes);
                    state.pending.extend(events);
                },
                Step::Chunk(Some(Err(e))) => {
                    state.release();
                    return Some((Err(Error::request(e)), state));
                },
                Step::Chunk(None) => {
                    state.body = None;
                    let events = state.decoder.finish();
                    state.pending.extend(events);
                    if state.decoder.skipped() > 0 {
                        tracing::debug!(skipped = state.decoder.skipped(), "body ended");
                    }
                },
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProgressEvent;
    use futures::TryStreamExt;
    use std::convert::Infallible;

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = std::result::Result<Bytes, Infallible>> {
        stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from_static(p.as_bytes())))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn decodes_across_chunk_boundaries() {
        let body = chunks(&[
            "{\"type\":\"progress\",\"prog",
            "ress\":50,\"elapsed\":500,\"duration\":1000}\n{\"type\":\"com",
            "plete\",\"mode\":\"stream\",\"message\":\"ok\",",
            "\"timestamp\":\"2024-05-01T12:00:00Z\",\"duration\":1000}\n",
        ]);

        let events: Vec<StreamEvent> =
            decode_events(body, NdjsonDecoder::new(), CancelToken::new())
                .try_collect()
                .await
                .unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            StreamEvent::Progress(ProgressEvent {
                percent: 50,
                elapsed_ms: 500,
                total_ms: 1000,
            })
        );
        assert!(events[1].is_terminal());
    }

    #[tokio::test]
    async fn triggered_token_stops_before_any_event() {
        let token = CancelToken::new();
        token.trigger();
        let body = chunks(&["{\"type\":\"progress\",\"progress\":50}\n"]);

        let mut events = decode_events(body, NdjsonDecoder::new(), token);
        assert!(matches!(events.next().await, Some(Err(Error::Cancelled))));
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn cancellation_unblocks_pending_read() {
        let token = CancelToken::new();
        let body = stream::pending::<std::result::Result<Bytes, Infallible>>();
        let mut events = decode_events(body, SseDecoder::new(), token.clone());

        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            trigger.trigger();
        });

        let next = tokio::time::timeout(std::time::Duration::from_secs(1), events.next())
            .await
            .unwrap();
        assert!(matches!(next, Some(Err(Error::Cancelled))));
    }

    #[tokio::test]
    async fn read_error_ends_stream() {
        let body = stream::iter(vec![
            Ok(Bytes::from_static(b"data: {\"type\":\"heartbeat\",\"timestamp\":\"2024-05-01T12:00:00Z\"}\n\n")),
            Err("connection reset"),
        ]);
        let mut events = decode_events(body, SseDecoder::new(), CancelToken::new());

        assert!(matches!(events.next().await, Some(Ok(StreamEvent::Heartbeat(_)))));
        assert!(matches!(events.next().await, Some(Err(Error::Transport(_)))));
        assert!(events.next().await.is_none());
    }

    #[test]
    fn signal_mode_has_no_decoder() {
        assert!(decoder_for(Mode::Signal).is_none());
        assert!(decoder_for(Mode::Heartbeat).is_some());
    }
}
