//! Constants for HTTP headers, content types and status codes.

/// Path of the mock endpoint.
pub const MOCK_PATH: &str = "/mock";

/// Path of the liveness endpoint.
pub const HEALTH_PATH: &str = "/health";

// Content Types
/// Newline-delimited JSON content type value
pub const APPLICATION_NDJSON: &str = "application/x-ndjson";

/// Server-Sent Events content type value
pub const TEXT_EVENT_STREAM: &str = "text/event-stream";

/// Plain text content type value
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// "Client Closed Request".
///
/// Not a registered status code. It is the nginx convention for a request
/// the server abandoned because the client went away, and signal mode
/// answers with it when its wait was cancelled.
pub const STATUS_CLIENT_CLOSED_REQUEST: u16 = 499;
