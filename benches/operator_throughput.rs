//! Benchmarks for operator chains and plan compilation
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rxflow::pipeline::{Flux, SubscriptionState, Value};
use std::time::Duration;

/// Counts values without storing them.
struct Count(u64);

impl rxflow::pipeline::Subscriber for Count {
    fn on_next(&mut self, value: Value) {
        black_box(value);
        self.0 += 1;
    }

    fn on_error(&mut self, _error: rxflow::pipeline::FluxError) {}

    fn on_complete(&mut self) {}
}

fn bench_map_filter_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_filter");

    for size in [1_000u64, 10_000, 100_000].iter() {
        group.throughput(Throughput::Elements(*size));
        let flux = Flux::range(0, *size)
            .map(|v| Value::Int(v.as_int().unwrap_or(0) * 3))
            .filter(|v| v.as_int().is_some_and(|n| n % 2 == 0));

        group.bench_with_input(BenchmarkId::new("range", size), &flux, |b, flux| {
            b.iter(|| {
                let sub = flux.subscribe(Count(0));
                assert_eq!(sub.state(), SubscriptionState::Completed);
            });
        });
    }
    group.finish();
}

fn bench_fan_in(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_in");
    let sources = || (0..4).map(|_| Flux::range(0, 2_500)).collect::<Vec<_>>();
    group.throughput(Throughput::Elements(10_000));

    let concat = Flux::concat(sources());
    group.bench_function("concat", |b| b.iter(|| concat.subscribe(Count(0))));

    let merge = Flux::merge(sources());
    group.bench_function("merge", |b| b.iter(|| merge.subscribe(Count(0))));

    let zip = Flux::zip(sources());
    group.bench_function("zip", |b| b.iter(|| zip.subscribe(Count(0))));

    let parallel = Flux::merge_parallel(sources());
    group.bench_function("merge_parallel", |b| {
        b.iter(|| {
            let mut sub = parallel.subscribe(Count(0));
            sub.await_terminal(Duration::from_secs(10))
        })
    });

    group.finish();
}

fn bench_plan_compilation(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");

    for depth in [10usize, 100, 1_000].iter() {
        let mut flux = Flux::range(0, 1);
        for _ in 0..*depth {
            flux = flux.map(|v| v);
        }
        group.bench_with_input(BenchmarkId::new("map_chain", depth), &flux, |b, flux| {
            b.iter(|| black_box(flux.plan()))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_map_filter_chain,
    bench_fan_in,
    bench_plan_compilation
);
criterion_main!(benches);
