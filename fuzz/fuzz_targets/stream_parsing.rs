#![no_main]

use hangup::shared::{EventDecoder, NdjsonDecoder, SseDecoder};
use hangup::types::StreamEvent;
use libfuzzer_sys::fuzz_target;

fn decode<D: EventDecoder>(mut decoder: D, chunks: &[&[u8]]) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    for chunk in chunks {
        events.extend(decoder.feed(chunk));
    }
    events.extend(decoder.finish());
    events
}

fuzz_target!(|data: &[u8]| {
    // First byte picks where to split the rest
    let Some((&cut, body)) = data.split_first() else {
        return;
    };
    let cut = usize::from(cut).min(body.len());
    let (head, tail) = body.split_at(cut);

    // Chunking must not change what either decoder produces
    assert_eq!(
        decode(NdjsonDecoder::new(), &[body]),
        decode(NdjsonDecoder::new(), &[head, tail])
    );
    assert_eq!(
        decode(SseDecoder::new(), &[body]),
        decode(SseDecoder::new(), &[head, tail])
    );

    for event in decode(NdjsonDecoder::new(), &[body]) {
        if let StreamEvent::Progress(p) = event {
            assert!(p.percent <= 100);
        }
    }
});
