// Benchmark to measure metrics overhead per evaluation

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use healthcheck::{AggregateResult, Category, Outcome, Report, Status};
use healthcheck_server::metrics::MetricsRegistry;
use std::time::Duration;

fn result_with(count: usize) -> AggregateResult {
    let checks = (0..count)
        .map(|i| {
            if i % 5 == 4 {
                Outcome::error(format!("probe-{}", i), "refused", Duration::from_millis(2))
            } else {
                Outcome::new(format!("probe-{}", i), Report::up(), Duration::from_millis(1))
            }
        })
        .collect();

    AggregateResult {
        status: Status::Down,
        checks,
    }
}

fn bench_record_result(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_result");
    let metrics = MetricsRegistry::new();

    for count in [1, 10, 50].iter() {
        let result = result_with(*count);
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, _| {
            b.iter(|| metrics.record_result(black_box(Category::Readiness), black_box(&result)));
        });
    }

    group.finish();
}

fn bench_individual_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("individual_operations");
    let metrics = MetricsRegistry::new();

    group.bench_function("record_evaluation", |b| {
        b.iter(|| metrics.record_evaluation(black_box("readiness"), black_box(Duration::from_millis(10))));
    });

    group.bench_function("set_status", |b| {
        b.iter(|| metrics.set_status(black_box("readiness"), black_box(true)));
    });

    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    let metrics = MetricsRegistry::new();
    for category in Category::ALL {
        metrics.record_result(category, &result_with(10));
    }

    group.bench_function("encode_30_probes", |b| {
        b.iter(|| black_box(metrics.encode().unwrap()));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_record_result,
    bench_individual_operations,
    bench_encode,
);
criterion_main!(benches);
