//! Benchmarks for tree summarization, graph building, and formatting.
//!
//! Run with: cargo bench -p jview-core --bench tree_summary_bench

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use jview_core::config::AnalysisConfig;
use jview_core::format::{IndentSpec, format_value};
use jview_core::graph::build_graph;
use jview_core::tree::summarize;
use serde_json::{Value, json};
use std::hint::black_box;

fn records(n: usize) -> Value {
    Value::Array(
        (0..n)
            .map(|i| {
                json!({
                    "id": i,
                    "name": format!("record {i}"),
                    "active": i % 3 == 0,
                    "tags": ["a", "b", "c"],
                    "address": {"city": "Springfield", "zip": format!("{:05}", i)},
                })
            })
            .collect(),
    )
}

fn bench_summarize(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree/summarize");
    let config = AnalysisConfig::default();
    for n in [100usize, 1_000, 10_000] {
        let doc = records(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &doc, |b, doc| {
            b.iter(|| black_box(summarize(black_box(doc), &config)));
        });
    }
    group.finish();
}

fn bench_build_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph/build");
    for n in [100usize, 1_000] {
        let doc = records(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &doc, |b, doc| {
            b.iter(|| black_box(build_graph(black_box(doc))));
        });
    }
    group.finish();
}

fn bench_format(c: &mut Criterion) {
    let mut group = c.benchmark_group("format");
    let config = AnalysisConfig::default();
    let doc = records(5_000);
    group.bench_function("pretty_2", |b| {
        b.iter(|| black_box(format_value(black_box(&doc), IndentSpec::Spaces(2), &config)));
    });
    group.bench_function("minified", |b| {
        b.iter(|| black_box(format_value(black_box(&doc), IndentSpec::Minified, &config)));
    });
    group.finish();
}

criterion_group!(benches, bench_summarize, bench_build_graph, bench_format);
criterion_main!(benches);
