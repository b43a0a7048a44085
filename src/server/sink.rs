//! Serialized output path from a strategy to the response body.
//!
//! Strategies write framed units into a bounded channel; the response body
//! drains it. Every concurrent activity of one operation clones the same
//! [`UnitSink`], so units are never interleaved mid-frame. A failed send
//! means the body is gone, i.e. the peer disconnected.

use bytes::Bytes;
use pin_project::pin_project;
use serde::Serialize;
use std::convert::Infallible;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;

use crate::error::{Error, Result, TransportError};
use crate::shared::http_constants::{APPLICATION_NDJSON, TEXT_EVENT_STREAM};
use crate::shared::{SseEvent, TriggerOnDrop};

/// How units are framed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// One compact JSON object per line
    Ndjson,
    /// `data: <json>\n\n` frames
    Sse,
}

impl Framing {
    /// Content type announced for this framing.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Ndjson => APPLICATION_NDJSON,
            Self::Sse => TEXT_EVENT_STREAM,
        }
    }

    /// Serialize and frame one unit.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hangup::server::Framing;
    /// use serde_json::json;
    ///
    /// let unit = json!({"type": "heartbeat"});
    /// assert_eq!(&Framing::Ndjson.frame(&unit).unwrap()[..], b"{\"type\":\"heartbeat\"}\n");
    /// assert_eq!(&Framing::Sse.frame(&unit).unwrap()[..], b"data: {\"type\":\"heartbeat\"}\n\n");
    /// ```
    pub fn frame<T: Serialize + ?Sized>(&self, unit: &T) -> Result<Bytes> {
        let json = serde_json::to_string(unit)?;
        let framed = match self {
            Self::Ndjson => {
                let mut line = json;
                line.push('\n');
                line
            },
            Self::Sse => SseEvent::new(json).to_string(),
        };
        Ok(Bytes::from(framed))
    }
}

/// Write half handed to strategies.
#[derive(Debug, Clone)]
pub struct UnitSink {
    tx: mpsc::Sender<Bytes>,
    framing: Framing,
}

impl UnitSink {
    /// Create a sink and the receiver the response body drains.
    pub fn channel(framing: Framing, capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx, framing }, rx)
    }

    /// Framing used by this sink.
    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Frame and send one unit.
    ///
    /// Fails with [`TransportError::ConnectionClosed`] once the receiving
    /// body has been dropped.
    pub async fn emit<T: Serialize + ?Sized>(&self, unit: &T) -> Result<()> {
        let frame = self.framing.frame(unit)?;
        self.tx
            .send(frame)
            .await
            .map_err(|_| Error::Transport(TransportError::ConnectionClosed))
    }

    /// Whether the receiving body is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Response body fed by a [`UnitSink`].
///
/// Holds a guard on the operation's token. If the body is dropped before
/// the sink side finished, which is what the server does when the peer
/// disconnects, the token is triggered. Reaching the end of the stream
/// disarms the guard.
#[pin_project]
#[derive(Debug)]
pub struct UnitBody {
    #[pin]
    units: ReceiverStream<Bytes>,
    guard: Option<TriggerOnDrop>,
}

impl UnitBody {
    /// Wrap the receiver returned by [`UnitSink::channel`].
    pub fn new(rx: mpsc::Receiver<Bytes>, guard: TriggerOnDrop) -> Self {
        Self {
            units: ReceiverStream::new(rx),
            guard: Some(guard),
        }
    }
}

impl Stream for UnitBody {
    type Item = std::result::Result<Bytes, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        match ready!(this.units.poll_next(cx)) {
            Some(frame) => Poll::Ready(Some(Ok(frame))),
            None => {
                if let Some(guard) = this.guard.take() {
                    guard.disarm();
                }
                Poll::Ready(None)
            },
        }
    }
}
