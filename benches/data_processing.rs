//! Benchmarks for the history and plot preparation hot paths
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use thermovis_rs::analysis::downsample::{peak_downsample, subsample};
use thermovis_rs::analysis::ticks::{format_tick, TickPlanner};
use thermovis_rs::frontend::viewport::slice_between_padded;
use thermovis_rs::history::{HistoryBuffer, SharedHistory};
use thermovis_rs::types::HISTORY_CAPACITY;
use thermovis_rs::Sample;

fn sample_at(t: usize) -> Sample {
    let x = t as f64;
    Sample::new(x, 150.0 + 100.0 * (x / 600.0).sin(), 50.0, 25.0)
}

fn full_history() -> SharedHistory {
    let history = SharedHistory::default();
    for t in 0..HISTORY_CAPACITY {
        history.append(sample_at(t));
    }
    history
}

fn bench_history_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("history_append");
    group.throughput(Throughput::Elements(1));

    group.bench_function("below_capacity", |b| {
        let mut buffer = HistoryBuffer::new();
        let mut t = 0usize;
        b.iter(|| {
            if buffer.len() + 1 >= HISTORY_CAPACITY {
                buffer = HistoryBuffer::new();
            }
            black_box(buffer.append(sample_at(t)));
            t += 1;
        });
    });

    group.bench_function("at_capacity", |b| {
        let history = full_history();
        let mut t = HISTORY_CAPACITY;
        b.iter(|| {
            black_box(history.append(sample_at(t)));
            t += 1;
        });
    });

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");
    let history = full_history();

    group.bench_function("cached", |b| {
        b.iter(|| black_box(history.snapshot().len()));
    });

    group.bench_function("after_append", |b| {
        let mut t = HISTORY_CAPACITY;
        b.iter(|| {
            history.append(sample_at(t));
            t += 1;
            black_box(history.snapshot().len())
        });
    });

    group.finish();
}

fn bench_downsample(c: &mut Criterion) {
    let mut group = c.benchmark_group("downsample");

    let snapshot = full_history().snapshot();
    let reference = snapshot.latest_timestamp().unwrap_or(0.0);
    let points: Vec<[f64; 2]> = snapshot
        .iter()
        .map(|s| [s.minutes_since(reference), s.temperature])
        .collect();
    group.throughput(Throughput::Elements(points.len() as u64));

    for columns in [400usize, 1000, 2000] {
        group.bench_with_input(BenchmarkId::new("peak", columns), &columns, |b, &columns| {
            b.iter(|| black_box(peak_downsample(&points, columns)));
        });
        group.bench_with_input(
            BenchmarkId::new("subsample", columns),
            &columns,
            |b, &columns| {
                b.iter(|| black_box(subsample(&points, columns * 2)));
            },
        );
    }

    group.finish();
}

fn bench_visible_slice(c: &mut Criterion) {
    let mut group = c.benchmark_group("visible_slice");
    let snapshot = full_history().snapshot();
    let reference = snapshot.latest_timestamp().unwrap_or(0.0);

    for minutes in [1.0f64, 60.0, 1440.0] {
        group.bench_with_input(
            BenchmarkId::new("padded", minutes as u64),
            &minutes,
            |b, &minutes| {
                b.iter(|| black_box(slice_between_padded(&snapshot, reference, -minutes, 0.0).len()));
            },
        );
    }

    group.finish();
}

fn bench_tick_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("ticks");
    let planner = TickPlanner::new(2);

    group.bench_function("plan_temperature_axis", |b| {
        b.iter(|| black_box(planner.plan(black_box(4.2), black_box(297.5), 480.0)));
    });

    group.bench_function("plan_and_label_time_axis", |b| {
        b.iter(|| {
            let plan = planner.plan(-1440.0, 0.0, 900.0);
            let labels: Vec<String> = plan
                .tick_values(-1440.0, 0.0)
                .into_iter()
                .zip(plan.spacings())
                .flat_map(|(values, spacing)| {
                    values.into_iter().map(move |v| format_tick(v, spacing))
                })
                .collect();
            black_box(labels)
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_history_append,
    bench_snapshot,
    bench_downsample,
    bench_visible_slice,
    bench_tick_plan,
);

criterion_main!(benches);
