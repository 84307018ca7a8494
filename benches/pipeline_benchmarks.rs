//! Criterion benchmarks for rust_log_pipeline

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rust_log_pipeline::prelude::*;
use std::sync::Arc;
use std::thread;

// ============================================================================
// Record Construction Benchmarks
// ============================================================================

fn bench_record_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_creation");
    group.throughput(Throughput::Elements(1));

    group.bench_function("plain", |b| {
        b.iter(|| black_box(LogRecord::new(LogLevel::Info, black_box("Request handled"))));
    });

    group.bench_function("needs_escaping", |b| {
        b.iter(|| {
            black_box(LogRecord::new(
                LogLevel::Info,
                black_box("line one\nline two\tend"),
            ))
        });
    });

    group.bench_function("with_fields", |b| {
        b.iter(|| {
            black_box(
                LogRecord::new(LogLevel::Warning, "Slow query")
                    .with_field("duration_ms", 1234)
                    .with_field("table", "orders"),
            )
        });
    });

    group.finish();
}

// ============================================================================
// Decorator Benchmarks
// ============================================================================

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("severity_filter");
    group.throughput(Throughput::Elements(1));

    let filter = SeverityFilter::new(Arc::new(NullSink::new()), LogLevel::Warning);
    let passing = LogRecord::new(LogLevel::Error, "passes");
    let rejected = LogRecord::new(LogLevel::Debug, "rejected");

    group.bench_function("pass", |b| {
        b.iter(|| filter.log(black_box(&passing)));
    });

    group.bench_function("reject", |b| {
        b.iter(|| filter.log(black_box(&rejected)));
    });

    group.finish();
}

fn bench_composite_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("composite_fan_out");
    let record = LogRecord::new(LogLevel::Info, "fan out");

    for children in [1usize, 4, 16] {
        let sinks: Vec<Arc<dyn Sink>> = (0..children)
            .map(|_| Arc::new(NullSink::new()) as Arc<dyn Sink>)
            .collect();
        let composite = CompositeSink::new(sinks).unwrap();

        group.throughput(Throughput::Elements(children as u64));
        group.bench_with_input(BenchmarkId::from_parameter(children), &children, |b, _| {
            b.iter(|| composite.log(black_box(&record)));
        });
    }

    group.finish();
}

// ============================================================================
// Dispatcher Benchmarks
// ============================================================================

fn bench_dispatcher_enqueue(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatcher_enqueue");
    group.throughput(Throughput::Elements(1));

    let dispatcher = BackgroundDispatcher::new(Arc::new(NullSink::new())).unwrap();
    let record = LogRecord::new(LogLevel::Info, "queued");

    group.bench_function("unbounded", |b| {
        b.iter(|| dispatcher.log(black_box(&record)));
    });

    let filtered = BackgroundDispatcher::builder(Arc::new(NullSink::new()))
        .min_level(LogLevel::Error)
        .build()
        .unwrap();

    group.bench_function("filtered_out", |b| {
        b.iter(|| filtered.log(black_box(&record)));
    });

    group.finish();
    dispatcher.dispose();
    filtered.dispose();
}

fn bench_concurrent_producers(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_producers");

    for producers in [2usize, 4, 8] {
        group.throughput(Throughput::Elements((producers * 1_000) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(producers),
            &producers,
            |b, &producers| {
                b.iter(|| {
                    let dispatcher =
                        Arc::new(BackgroundDispatcher::new(Arc::new(NullSink::new())).unwrap());
                    let handles: Vec<_> = (0..producers)
                        .map(|_| {
                            let dispatcher = Arc::clone(&dispatcher);
                            thread::spawn(move || {
                                for i in 0..1_000 {
                                    dispatcher.info(format!("message {}", i));
                                }
                            })
                        })
                        .collect();
                    for handle in handles {
                        let _ = handle.join();
                    }
                    dispatcher.dispose();
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_record_creation,
    bench_filter,
    bench_composite_fan_out,
    bench_dispatcher_enqueue,
    bench_concurrent_producers,
);

criterion_main!(benches);
