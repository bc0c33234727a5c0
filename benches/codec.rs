//! Wire codec benchmarks.
//!
//! Encoding and decoding sit on the hot path of every exchange; these
//! benchmarks track the cost of batching and of incremental decoding.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use swaggersocket_client::identifiers::Identity;
use swaggersocket_client::protocol::{
    Request, decode_envelope, encode_handshake, encode_request_batch,
};
use swaggersocket_client::Handshake;

fn bench_encode_handshake(c: &mut Criterion) {
    let handshake = Handshake::new().with_path("/swagger");

    c.bench_function("encode_handshake", |b| {
        b.iter(|| encode_handshake(black_box(&handshake)).unwrap());
    });
}

fn bench_encode_request_batch(c: &mut Criterion) {
    let identity = Identity::new("bench-session");
    let mut group = c.benchmark_group("encode_request_batch");

    for size in [1usize, 8, 64] {
        let requests: Vec<Request> = (0..size)
            .map(|i| {
                Request::new()
                    .with_path(format!("/resource/{i}"))
                    .with_body("{\"field\":\"value\"}")
            })
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(size), &requests, |b, requests| {
            b.iter(|| encode_request_batch(black_box(&identity), black_box(requests)).unwrap());
        });
    }
    group.finish();
}

fn bench_decode_response_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_response_batch");

    for size in [1usize, 8, 64] {
        let responses: Vec<String> = (0..size)
            .map(|i| {
                format!(
                    r#"{{"uuid":"00000000-0000-0000-0000-{i:012}","status":200,"path":"/r","headers":[],"messageBody":"payload"}}"#
                )
            })
            .collect();
        let envelope = format!(r#"{{"responses":[{}]}}"#, responses.join(","));

        group.bench_with_input(BenchmarkId::from_parameter(size), &envelope, |b, envelope| {
            b.iter(|| decode_envelope(black_box(envelope)));
        });
    }
    group.finish();
}

fn bench_decode_incomplete(c: &mut Criterion) {
    // a fragment that never completes: the cost of the wait-for-more path
    let fragment = r#"{"responses":[{"uuid":"00000000-0000-0000-0000-000000000001","status":200"#;

    c.bench_function("decode_incomplete_fragment", |b| {
        b.iter(|| decode_envelope(black_box(fragment)));
    });
}

criterion_group!(
    benches,
    bench_encode_handshake,
    bench_encode_request_batch,
    bench_decode_response_batch,
    bench_decode_incomplete
);
criterion_main!(benches);
