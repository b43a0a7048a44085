use hangup::shared::sse_parser::{SseDecoder, SseParser};
use hangup::shared::EventDecoder;
use hangup::types::{Mode, StreamEvent};

#[test]
fn test_simple_message() {
    let mut parser = SseParser::new();
    let events = parser.feed(b"data: hello world\n\n");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].data, "hello world");
}

#[test]
fn test_multiline_data() {
    let mut parser = SseParser::new();
    let events = parser.feed(b"data: line1\ndata: line2\ndata: line3\n\n");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].data, "line1\nline2\nline3");
}

#[test]
fn test_crlf_line_endings() {
    let mut parser = SseParser::new();
    let events = parser.feed(b"event: test\r\ndata: hello\r\n\r\n");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].data, "hello");
}

#[test]
fn test_comment_ignored() {
    let mut parser = SseParser::new();
    let events = parser.feed(b": keep-alive\ndata: actual data\n\n");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].data, "actual data");
}

#[test]
fn test_partial_parsing() {
    let mut parser = SseParser::new();
    assert!(parser.feed(b"data: partial").is_empty());
    assert!(parser.feed(b" message\n").is_empty());

    let events = parser.feed(b"\n");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].data, "partial message");
}

#[test]
fn test_split_inside_multibyte_character() {
    let mut parser = SseParser::new();
    let bytes = "data: caf\u{e9}\n\n".as_bytes();
    let cut = bytes.iter().position(|&b| b == 0xc3).unwrap() + 1;

    assert!(parser.feed(&bytes[..cut]).is_empty());
    let events = parser.feed(&bytes[cut..]);
    assert_eq!(events[0].data, "caf\u{e9}");
}

#[test]
fn test_empty_data_ignored() {
    let mut parser = SseParser::new();
    assert!(parser.feed(b"event: empty\n\n").is_empty());
}

#[test]
fn test_id_and_retry_lines_do_not_change_data() {
    let mut parser = SseParser::new();
    let events = parser.feed(b"id: 7\nretry: 100\ndata: first\n\ndata: second\n\n");
    let data: Vec<_> = events.into_iter().map(|e| e.data).collect();
    assert_eq!(data, vec!["first", "second"]);
}

#[test]
fn test_finish_flushes_unterminated_event() {
    let mut parser = SseParser::new();
    assert!(parser.feed(b"data: tail").is_empty());
    assert_eq!(parser.finish().map(|e| e.data), Some("tail".to_string()));
}

#[test]
fn test_decoder_maps_heartbeat_body() {
    let body = concat!(
        "data: {\"type\":\"start\",\"mode\":\"heartbeat\",\"duration\":2000,\"timestamp\":\"2024-05-01T12:00:00Z\"}\n\n",
        "data: {\"type\":\"heartbeat\",\"timestamp\":\"2024-05-01T12:00:01Z\"}\n\n",
        "data: {\"type\":\"mystery\"}\n\n",
        "data: not json\n\n",
        "data: {\"type\":\"complete\",\"mode\":\"heartbeat\",\"message\":\"Completed after 2000ms using heartbeat\",",
        "\"timestamp\":\"2024-05-01T12:00:02Z\",\"duration\":2000}\n\n",
    );

    let mut decoder = SseDecoder::new();
    let mut events = Vec::new();
    for chunk in body.as_bytes().chunks(7) {
        events.extend(decoder.feed(chunk));
    }
    events.extend(decoder.finish());

    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], StreamEvent::Heartbeat(_)));
    match &events[1] {
        StreamEvent::Complete(c) => {
            assert_eq!(c.mode, Mode::Heartbeat);
            assert_eq!(c.duration, 2000);
        },
        other => panic!("expected completion, got {:?}", other),
    }
    assert_eq!(decoder.skipped(), 1);
}
