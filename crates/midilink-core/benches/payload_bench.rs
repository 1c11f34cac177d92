//! Criterion benchmarks for the hot paths of every delivered event: unpacking
//! a response batch and parsing the name it arrived under.
//!
//! Run with:
//! ```bash
//! cargo bench --package midilink-core --bench payload_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use midilink_core::protocol::codec::{decode_frame, encode_frame, Frame};
use midilink_core::{decode_batch, encode_batch, ControlEvent, Name, NameScheme};

fn make_batch(len: usize) -> Vec<ControlEvent> {
    (0..len)
        .map(|i| ControlEvent::new(0x90, (i % 128) as u8, 100))
        .collect()
}

fn bench_batches(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch");
    for len in [1usize, 5, 10] {
        let events = make_batch(len);
        let bytes = encode_batch(&events);
        group.bench_with_input(BenchmarkId::new("encode", len), &events, |b, ev| {
            b.iter(|| encode_batch(black_box(ev)))
        });
        group.bench_with_input(BenchmarkId::new("decode", len), &bytes, |b, raw| {
            b.iter(|| decode_batch(black_box(raw)))
        });
    }
    group.finish();
}

fn bench_names(c: &mut Criterion) {
    let scheme = NameScheme::default();
    let name = scheme.pull_name(&"alice".into(), 123_456);
    let text = name.to_string();

    c.bench_function("name/parse_text", |b| {
        b.iter(|| black_box(&text).parse::<Name>())
    });
    c.bench_function("name/scheme_parse", |b| {
        b.iter(|| scheme.parse(black_box(&name)))
    });
}

fn bench_frames(c: &mut Criterion) {
    let frame = Frame::Response {
        name: NameScheme::default().pull_name(&"alice".into(), 42),
        content: encode_batch(&make_batch(10)),
    };
    let bytes = encode_frame(&frame).expect("encode");

    c.bench_function("frame/encode_response", |b| {
        b.iter(|| encode_frame(black_box(&frame)))
    });
    c.bench_function("frame/decode_response", |b| {
        b.iter(|| decode_frame(black_box(&bytes)))
    });
}

criterion_group!(benches, bench_batches, bench_names, bench_frames);
criterion_main!(benches);
