//! Benchmarks for the layered layout on synthetic JSON graphs.
//!
//! Run with: cargo bench -p jview-layout --bench layered_layout_bench

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use jview_core::graph::build_graph;
use jview_layout::{LayeredLayout, apply_layout};
use serde_json::{Value, json};
use std::hint::black_box;

/// `breadth` objects per level, `depth` levels deep.
fn nested(depth: usize, breadth: usize) -> Value {
    if depth == 0 {
        return json!({"leaf": true, "n": 1});
    }
    Value::Array((0..breadth).map(|_| nested(depth - 1, breadth)).collect())
}

fn bench_layered(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout/layered");
    let layout = LayeredLayout::default();
    for (depth, breadth) in [(3usize, 4usize), (4, 5), (5, 5)] {
        let graph = build_graph(&nested(depth, breadth));
        let n = graph.nodes.len() as u64;
        group.throughput(Throughput::Elements(n));
        group.bench_with_input(BenchmarkId::new("nested", n), &graph, |b, graph| {
            b.iter(|| {
                let mut graph = graph.clone();
                black_box(apply_layout(&layout, &mut graph))
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_layered);
criterion_main!(benches);
