// ABOUTME: Benchmark suite for chat frame codec performance testing
// ABOUTME: Measures frame checking, parsing, serialization and coalesced-stream decoding

use bytes::{Bytes, BytesMut};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use natter::frame::Frame;
use natter::message;
use std::io::Cursor;
use std::time::Duration;

fn create_sample_broadcast() -> Frame {
    message::broadcast(
        "test_room",
        "test_client",
        Bytes::from_static(b"Hello World!"),
    )
}

fn create_sample_terminate() -> Frame {
    message::terminate()
}

fn bench_frame_check(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_check");
    group.measurement_time(Duration::from_secs(10));

    let broadcast_bytes = create_sample_broadcast().to_bytes();
    group.bench_function("broadcast", |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(black_box(broadcast_bytes.as_ref()));
            Frame::check(&mut cursor)
        })
    });

    let terminate_bytes = create_sample_terminate().to_bytes();
    group.bench_function("terminate", |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(black_box(terminate_bytes.as_ref()));
            Frame::check(&mut cursor)
        })
    });

    group.finish();
}

fn bench_frame_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_parse");
    group.measurement_time(Duration::from_secs(10));

    // broadcast carries both a header and a payload
    let broadcast_bytes = create_sample_broadcast().to_bytes();
    group.bench_function("broadcast", |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(black_box(broadcast_bytes.as_ref()));
            Frame::parse(&mut cursor).unwrap()
        })
    });

    // terminate is tag-only
    let terminate_bytes = create_sample_terminate().to_bytes();
    group.bench_function("terminate", |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(black_box(terminate_bytes.as_ref()));
            Frame::parse(&mut cursor).unwrap()
        })
    });

    group.finish();
}

fn bench_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialization");
    group.measurement_time(Duration::from_secs(10));

    let broadcast = create_sample_broadcast();
    group.bench_function("broadcast", |b| b.iter(|| black_box(&broadcast).to_bytes()));

    let terminate = create_sample_terminate();
    group.bench_function("terminate", |b| b.iter(|| black_box(&terminate).to_bytes()));

    group.finish();
}

fn bench_payload_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("payload_sizes");
    group.measurement_time(Duration::from_secs(10));

    let payload_sizes = [16, 128, 1024, 16 * 1024];

    for &size in &payload_sizes {
        let body = "A".repeat(size);
        let frame_bytes = message::msg_room("test_room", body.as_bytes()).to_bytes();

        group.bench_with_input(
            BenchmarkId::new("msg_room_parse", size),
            &frame_bytes,
            |b, frame_bytes| {
                b.iter(|| {
                    let mut cursor = Cursor::new(black_box(frame_bytes.as_ref()));
                    Frame::parse(&mut cursor).unwrap()
                })
            },
        );
    }

    group.finish();
}

fn bench_coalesced_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("coalesced_stream");
    group.measurement_time(Duration::from_secs(10));

    // 100 frames back to back, the way TCP hands them to a busy reader.
    let mut wire = BytesMut::new();
    for i in 0..100 {
        message::msg_room("test_room", format!("message {i}").as_bytes()).encode(&mut wire);
    }
    let wire = wire.freeze();

    group.bench_function("decode_100_frames", |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(black_box(wire.as_ref()));
            let mut decoded = 0;
            while (cursor.position() as usize) < wire.len() {
                Frame::check(&mut cursor).unwrap();
                Frame::parse(&mut cursor).unwrap();
                decoded += 1;
            }
            decoded
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_frame_check,
    bench_frame_parse,
    bench_serialization,
    bench_payload_sizes,
    bench_coalesced_stream
);
criterion_main!(benches);
