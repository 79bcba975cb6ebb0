// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Benchmarks for the repository indexer.
//!
//! Run with: `cargo bench --bench indexer`

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::fs;
use std::hint::black_box;
use tempfile::TempDir;

use openpilot::context::{
    chunk_content, extract_imports, extract_symbols, ContextManager, IndexerOptions, PathFilter,
};

fn sample_rust_file(lines: usize) -> String {
    let mut out = String::from("use std::collections::HashMap;\nuse crate::types::Message;\n\n");
    for i in 0..lines / 5 {
        out.push_str(&format!(
            "pub struct Item{i} {{\n    id: u64,\n}}\n\nimpl Item{i} {{\n    pub fn get(&self) -> u64 {{ self.id }}\n}}\n"
        ));
    }
    out
}

/// Benchmark fixed line-count chunking.
fn bench_chunking(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunking");

    for lines in [100, 1_000, 10_000] {
        let content = sample_rust_file(lines);
        group.throughput(Throughput::Bytes(content.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &content, |b, content| {
            b.iter(|| chunk_content(black_box(content), 500));
        });
    }

    group.finish();
}

/// Benchmark include/exclude filtering of relative paths.
fn bench_path_filter(c: &mut Criterion) {
    let filter = PathFilter::with_defaults().unwrap();
    let paths = [
        "src/main.rs",
        "node_modules/react/index.js",
        "crates/core/src/layout.rs",
        "target/debug/build/out.log",
        "web/.env",
        "docs/guide/intro.md",
    ];

    let mut group = c.benchmark_group("path_filter");
    group.throughput(Throughput::Elements(paths.len() as u64));
    group.bench_function("default_patterns", |b| {
        b.iter(|| {
            paths
                .iter()
                .filter(|p| filter.retains(black_box(p)))
                .count()
        });
    });
    group.finish();
}

/// Benchmark regex-based symbol and import extraction.
fn bench_symbols(c: &mut Criterion) {
    let content = sample_rust_file(1_000);

    let mut group = c.benchmark_group("symbols");
    group.bench_function("extract_symbols_rust", |b| {
        b.iter(|| extract_symbols(black_box(&content), "rust"));
    });
    group.bench_function("extract_imports_rust", |b| {
        b.iter(|| extract_imports(black_box(&content), "rust"));
    });
    group.finish();
}

/// Benchmark a full analysis pass over a small synthetic repository.
fn bench_analyze(c: &mut Criterion) {
    let temp = TempDir::new().unwrap();
    for dir in 0..10 {
        let path = temp.path().join(format!("src/mod{}", dir));
        fs::create_dir_all(&path).unwrap();
        for file in 0..10 {
            fs::write(path.join(format!("f{}.rs", file)), sample_rust_file(50)).unwrap();
        }
    }
    fs::create_dir_all(temp.path().join("node_modules/pkg")).unwrap();
    fs::write(temp.path().join("node_modules/pkg/index.js"), "module.exports = {};").unwrap();

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let manager = ContextManager::new(IndexerOptions::new(temp.path())).unwrap();

    let mut group = c.benchmark_group("analyze");
    group.sample_size(20);
    group.bench_function("100_files", |b| {
        b.to_async(&runtime).iter(|| async {
            manager.analyze_repository().await.unwrap()
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_chunking,
    bench_path_filter,
    bench_symbols,
    bench_analyze,
);

criterion_main!(benches);
