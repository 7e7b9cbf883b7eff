//! History buffer behaviour under load and concurrent access

mod common;

use common::builders::HistoryBuilder;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thermovis_rs::history::{HistoryBuffer, SharedHistory};
use thermovis_rs::types::HISTORY_CAPACITY;
use thermovis_rs::Sample;

#[test]
fn test_full_day_then_overflow_keeps_newest() {
    let mut buffer = HistoryBuffer::new();
    let total = HISTORY_CAPACITY + 1234;
    for t in 0..total {
        buffer.append(Sample::new(t as f64, 4.2, 0.0, 0.0));
    }

    assert_eq!(buffer.len(), HISTORY_CAPACITY);
    let snapshot = buffer.snapshot();
    assert_eq!(snapshot[0].timestamp, 1234.0);
    assert_eq!(snapshot.latest_timestamp(), Some((total - 1) as f64));
    common::assert_time_ordered(&snapshot);
}

#[test]
fn test_relative_times_single_sample() {
    let mut buffer = HistoryBuffer::new();
    buffer.append(Sample::new(1_700_000_000.0, 77.0, 10.0, 20.0));
    let reference = buffer.latest_timestamp().unwrap();
    assert_eq!(buffer.relative_times(reference).collect::<Vec<_>>(), vec![0.0]);
}

#[test]
fn test_relative_times_in_minutes() {
    let samples = HistoryBuilder::new()
        .every(30.0)
        .sample(10.0, 0.0, 0.0)
        .sample(11.0, 0.0, 0.0)
        .sample(12.0, 0.0, 0.0)
        .build();
    let mut buffer = HistoryBuffer::new();
    for s in samples {
        buffer.append(s);
    }
    let times: Vec<f64> = buffer.relative_times(60.0).collect();
    assert_eq!(times, vec![-1.0, -0.5, 0.0]);
}

#[test]
fn test_snapshots_are_consistent_during_appends() {
    let history = SharedHistory::new(HistoryBuffer::with_capacity(500));
    let done = Arc::new(AtomicBool::new(false));

    let writer = {
        let history = history.clone();
        let done = done.clone();
        std::thread::spawn(move || {
            for t in 0..5_000 {
                history.append(Sample::new(t as f64, t as f64, 0.0, 0.0));
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let mut snapshots = 0;
    while !done.load(Ordering::SeqCst) || snapshots == 0 {
        let snapshot = history.snapshot();
        assert!(snapshot.len() <= 500);
        // Contiguous run of timestamps: never a half-applied append
        assert!(snapshot
            .windows(2)
            .all(|w| w[1].timestamp - w[0].timestamp == 1.0));
        if let Some(last) = snapshot.last() {
            assert_eq!(snapshot.generation(), last.timestamp as u64 + 1);
        }
        snapshots += 1;
    }

    writer.join().unwrap();
    assert_eq!(history.len(), 500);
    assert_eq!(history.generation(), 5_000);
}
