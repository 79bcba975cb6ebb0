// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Benchmarks for stream line assembly.
//!
//! Run with: `cargo bench --bench streaming`

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;

use openpilot::providers::stream::{sse_data, LineAssembler};

fn ndjson_body(lines: usize) -> Vec<u8> {
    let mut body = String::new();
    for i in 0..lines {
        body.push_str(&format!(
            "{{\"model\":\"llama3.2\",\"message\":{{\"role\":\"assistant\",\"content\":\"tok{}\"}},\"done\":false}}\n",
            i
        ));
    }
    body.into_bytes()
}

/// Feed a body through the assembler in fixed-size network reads.
fn bench_line_assembly(c: &mut Criterion) {
    let body = ndjson_body(1_000);

    let mut group = c.benchmark_group("line_assembly");
    group.throughput(Throughput::Bytes(body.len() as u64));

    for read_size in [16, 256, 4096] {
        group.bench_with_input(
            BenchmarkId::from_parameter(read_size),
            &read_size,
            |b, &read_size| {
                b.iter(|| {
                    let mut assembler = LineAssembler::new();
                    let mut count = 0;
                    for chunk in body.chunks(read_size) {
                        count += assembler.push(black_box(chunk)).len();
                    }
                    count
                });
            },
        );
    }

    group.finish();
}

/// Parse SSE lines into deltas the way the cloud client does.
fn bench_sse_decode(c: &mut Criterion) {
    let lines: Vec<String> = (0..1_000)
        .map(|i| format!("data: {{\"id\":\"c1\",\"choices\":[{{\"delta\":{{\"content\":\"t{}\"}}}}]}}", i))
        .collect();

    c.bench_function("sse_decode_1000", |b| {
        b.iter(|| {
            lines
                .iter()
                .filter_map(|l| sse_data(black_box(l)))
                .filter_map(|d| serde_json::from_str::<serde_json::Value>(d).ok())
                .count()
        });
    });
}

criterion_group!(benches, bench_line_assembly, bench_sse_decode);
criterion_main!(benches);
