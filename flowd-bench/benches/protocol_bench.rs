//! Protocol encoding/decoding benchmarks.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use flowd_protocol::frame::Frame;
use flowd_protocol::message::{Operation, Request, Response};
use flowd_protocol::{Decoder, Encoder};

/// CREATE_DEFINITION request whose document scales with the state count.
fn create_test_request(states: usize) -> Request {
    Request::new("bench-1", Operation::CreateDefinition).with_params(serde_json::json!({
        "definition": {
            "id": "bench",
            "name": "Benchmark chain",
            "states": (0..states).map(|i| serde_json::json!({
                "id": format!("state_{}", i),
                "name": format!("State {}", i),
                "is_initial": i == 0
            })).collect::<Vec<_>>(),
            "actions": (0..states.saturating_sub(1)).map(|i| serde_json::json!({
                "id": format!("next_{}", i),
                "name": format!("Next {}", i),
                "from_states": format!("state_{}", i),
                "to_state": format!("state_{}", i + 1)
            })).collect::<Vec<_>>(),
        }
    }))
}

/// GET_INSTANCE response whose payload scales with the history length.
fn create_test_response(history_len: usize) -> Response {
    Response::ok(
        "bench-1",
        serde_json::json!({
            "instance_id": "0b7f3c9a-5f2e-4d11-9c3b-1a2b3c4d5e6f",
            "definition_id": "bench",
            "current_state_id": "active",
            "history": (0..history_len).map(|i| serde_json::json!({
                "action_id": "turn",
                "from_state_id": if i == 0 { "open" } else { "active" },
                "to_state_id": "active",
                "timestamp": "2026-08-22T12:00:00Z"
            })).collect::<Vec<_>>(),
            "created_at": "2026-08-22T11:00:00Z",
            "updated_at": "2026-08-22T12:00:00Z",
        }),
    )
}

fn bench_frame_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_encode");

    for size in [100, 1000, 10000] {
        let payload = Bytes::from("x".repeat(size));
        let frame = Frame::new(payload.clone());

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &frame, |b, frame| {
            b.iter(|| black_box(frame.encode().unwrap()));
        });
    }

    group.finish();
}

fn bench_frame_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_decode");

    for size in [100, 1000, 10000] {
        let payload = Bytes::from("x".repeat(size));
        let frame = Frame::new(payload);
        let encoded = frame.encode().unwrap();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &encoded, |b, encoded| {
            b.iter(|| {
                let mut buf = encoded.clone();
                black_box(Frame::decode(&mut buf).unwrap())
            });
        });
    }

    group.finish();
}

fn bench_request_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_encode");

    for states in [10, 100, 1000] {
        let request = create_test_request(states);

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::from_parameter(states),
            &request,
            |b, request| {
                b.iter(|| black_box(Encoder::encode_request(request).unwrap()));
            },
        );
    }

    group.finish();
}

fn bench_request_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_decode");

    for states in [10, 100, 1000] {
        let request = create_test_request(states);
        let encoded = Encoder::encode_request(&request).unwrap();

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::from_parameter(states),
            &encoded,
            |b, encoded| {
                b.iter(|| {
                    let mut decoder = Decoder::new();
                    decoder.extend(encoded);
                    black_box(decoder.decode_request().unwrap())
                });
            },
        );
    }

    group.finish();
}

fn bench_response_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("response_encode");

    for history in [10, 100, 1000] {
        let response = create_test_response(history);

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::from_parameter(history),
            &response,
            |b, response| {
                b.iter(|| black_box(Encoder::encode_response(response).unwrap()));
            },
        );
    }

    group.finish();
}

fn bench_response_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("response_decode");

    for history in [10, 100, 1000] {
        let response = create_test_response(history);
        let encoded = Encoder::encode_response(&response).unwrap();

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::from_parameter(history),
            &encoded,
            |b, encoded| {
                b.iter(|| {
                    let mut decoder = Decoder::new();
                    decoder.extend(encoded);
                    black_box(decoder.decode_response().unwrap())
                });
            },
        );
    }

    group.finish();
}

fn bench_crc32c(c: &mut Criterion) {
    let mut group = c.benchmark_group("crc32c");

    for size in [100, 1000, 10000, 100000] {
        let data = vec![0x42u8; size];

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| black_box(crc32c::crc32c(data)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_frame_encode,
    bench_frame_decode,
    bench_request_encode,
    bench_request_decode,
    bench_response_encode,
    bench_response_decode,
    bench_crc32c,
);

criterion_main!(benches);
