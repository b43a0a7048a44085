//! Components used by both the client and the server.

pub mod cancellation;
pub mod delay;
pub mod event_stream;
pub mod http_constants;
pub mod logging;
pub mod ndjson;
pub mod sse_parser;

// Re-export commonly used types
pub use cancellation::{CancelToken, TriggerOnDrop};
pub use delay::{delay, DelayOutcome};
pub use event_stream::{decode_events, decoder_for, EventDecoder, EventStream};
pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
pub use ndjson::NdjsonDecoder;
pub use sse_parser::{SseDecoder, SseEvent, SseParser};
