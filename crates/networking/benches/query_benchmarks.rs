//! Query serialization benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use indexmap::IndexMap;
use networking::{eval_query, join_url, parse_query, query_string, Params};
use serde_json::{json, Value};

fn build_params(size: usize) -> Params {
    (0..size)
        .map(|i| {
            let value = match i % 3 {
                0 => json!(i),
                1 => json!(format!("value {}", i)),
                _ => json!([i, i + 1, null]),
            };
            (format!("key{}", i), value)
        })
        .collect()
}

/// Benchmark query string serialization.
fn bench_query_string(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_string");

    for size in [4, 32, 256].iter() {
        let params = build_params(*size);
        group.bench_with_input(BenchmarkId::new("params", size), &params, |b, params| {
            b.iter(|| query_string(black_box(params)))
        });
    }

    group.finish();
}

/// Benchmark URL joining.
fn bench_join_url(c: &mut Criterion) {
    let params = build_params(16);

    c.bench_function("join_url_existing_query", |b| {
        b.iter(|| join_url(black_box("https://console.example.com/api/users?sort=name"), black_box(&params)))
    });
}

/// Benchmark query evaluation.
fn bench_eval_query(c: &mut Criterion) {
    let raw: IndexMap<String, String> = parse_query(
        "https://console.example.com/?page=3&size=50&active=true&name=ops&id=9007199254740993&ratio=0.25",
    );

    c.bench_function("eval_query", |b| {
        b.iter(|| {
            let evaluated = eval_query(black_box(&raw));
            black_box(Value::Object(evaluated))
        })
    });
}

criterion_group!(benches, bench_query_string, bench_join_url, bench_eval_query);
criterion_main!(benches);
