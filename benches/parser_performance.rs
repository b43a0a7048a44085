//! Streaming decoder benchmarks
//!
//! Measures how fast NDJSON and SSE bodies decode when the transport hands
//! them over in chunks of different sizes.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use hangup::shared::{EventDecoder, NdjsonDecoder, SseDecoder};
use std::hint::black_box;

fn ndjson_body(ticks: usize) -> Vec<u8> {
    let mut body = String::from(
        "{\"type\":\"start\",\"mode\":\"stream\",\"duration\":60000,\"timestamp\":\"2024-05-01T12:00:00Z\"}\n",
    );
    for i in 1..=ticks {
        body.push_str(&format!(
            "{{\"type\":\"progress\",\"progress\":{},\"elapsed\":{},\"duration\":60000}}\n",
            i * 100 / ticks,
            i * 1000
        ));
    }
    body.push_str(
        "{\"type\":\"complete\",\"mode\":\"stream\",\"message\":\"Completed after 60000ms using streaming\",\"timestamp\":\"2024-05-01T12:01:00Z\",\"duration\":60000}\n",
    );
    body.into_bytes()
}

fn sse_body(beats: usize) -> Vec<u8> {
    let mut body = String::from(
        "data: {\"type\":\"start\",\"mode\":\"heartbeat\",\"duration\":60000,\"timestamp\":\"2024-05-01T12:00:00Z\"}\n\n",
    );
    for i in 0..beats {
        body.push_str(&format!(
            "data: {{\"type\":\"heartbeat\",\"timestamp\":\"2024-05-01T12:{:02}:{:02}Z\"}}\n\n",
            i / 60 % 60,
            i % 60
        ));
    }
    body.push_str(
        "data: {\"type\":\"complete\",\"mode\":\"heartbeat\",\"message\":\"Completed after 60000ms using heartbeat\",\"timestamp\":\"2024-05-01T12:01:00Z\",\"duration\":60000}\n\n",
    );
    body.into_bytes()
}

fn decode<D: EventDecoder>(mut decoder: D, body: &[u8], chunk_size: usize) -> usize {
    let mut count = 0;
    for chunk in body.chunks(chunk_size) {
        count += decoder.feed(chunk).len();
    }
    count + decoder.finish().len()
}

/// Benchmark NDJSON decoding across chunk sizes
fn bench_ndjson(c: &mut Criterion) {
    let mut group = c.benchmark_group("ndjson_decode");
    let body = ndjson_body(600);
    group.throughput(Throughput::Bytes(body.len() as u64));

    for chunk_size in [16usize, 256, 4096] {
        group.bench_with_input(
            BenchmarkId::from_parameter(chunk_size),
            &chunk_size,
            |b, &size| b.iter(|| black_box(decode(NdjsonDecoder::new(), black_box(&body), size))),
        );
    }
    group.finish();
}

/// Benchmark SSE decoding across chunk sizes
fn bench_sse(c: &mut Criterion) {
    let mut group = c.benchmark_group("sse_decode");
    let body = sse_body(600);
    group.throughput(Throughput::Bytes(body.len() as u64));

    for chunk_size in [16usize, 256, 4096] {
        group.bench_with_input(
            BenchmarkId::from_parameter(chunk_size),
            &chunk_size,
            |b, &size| b.iter(|| black_box(decode(SseDecoder::new(), black_box(&body), size))),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_ndjson, bench_sse);
criterion_main!(benches);
