//! Bounded sample history
//!
//! [`HistoryBuffer`] is the ring buffer behind the scrolling plot. It keeps
//! samples in insertion order (which the feed guarantees is time order) and
//! drops the oldest entry once [`HISTORY_CAPACITY`] is reached.
//!
//! [`SharedHistory`] wraps a buffer for the single-writer / single-reader
//! arrangement between the polling worker and the UI: the worker appends
//! under a short write lock, and the UI takes immutable [`HistorySnapshot`]s
//! that stay valid no matter how many samples are evicted afterwards.

use crate::types::{Sample, HISTORY_CAPACITY};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Ring buffer of samples with FIFO eviction
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
    /// Total number of samples ever appended; doubles as a generation counter
    appended: u64,
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryBuffer {
    /// Create a buffer holding up to [`HISTORY_CAPACITY`] samples
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    /// Create a buffer with a custom capacity (at least one sample)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity.min(HISTORY_CAPACITY)),
            capacity,
            appended: 0,
        }
    }

    /// Append a sample, evicting the oldest one if the buffer is full
    ///
    /// Returns the evicted sample, if any.
    pub fn append(&mut self, sample: Sample) -> Option<Sample> {
        let evicted = if self.samples.len() >= self.capacity {
            self.samples.pop_front()
        } else {
            None
        };

        if evicted.is_some() && self.appended == self.capacity as u64 {
            tracing::debug!(
                "History buffer reached capacity of {} samples, evicting oldest",
                self.capacity
            );
        }

        self.samples.push_back(sample);
        self.appended += 1;
        evicted
    }

    /// Number of retained samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no samples have been retained yet
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum number of retained samples
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total number of samples appended since creation
    pub fn generation(&self) -> u64 {
        self.appended
    }

    /// Iterate over retained samples, oldest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Sample> + ExactSizeIterator {
        self.samples.iter()
    }

    /// Most recent sample
    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// Timestamp of the most recent sample, the conventional "now" of the plot
    pub fn latest_timestamp(&self) -> Option<f64> {
        self.latest().map(|s| s.timestamp)
    }

    /// Copy the retained samples into an immutable snapshot
    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            samples: self.samples.iter().copied().collect(),
            generation: self.appended,
        }
    }

    /// Timestamps converted to minutes relative to `reference`
    pub fn relative_times(&self, reference: f64) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(move |s| s.minutes_since(reference))
    }
}

/// Immutable view of the history at one point in time
///
/// Cloning a snapshot is cheap: the samples are shared.
#[derive(Debug, Clone)]
pub struct HistorySnapshot {
    samples: Arc<[Sample]>,
    generation: u64,
}

impl Default for HistorySnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl HistorySnapshot {
    /// A snapshot of an empty buffer
    pub fn empty() -> Self {
        Self {
            samples: Arc::from(Vec::new()),
            generation: 0,
        }
    }

    /// Samples in buffer order
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Number of samples appended to the buffer when the snapshot was taken
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Timestamp of the newest sample in the snapshot
    pub fn latest_timestamp(&self) -> Option<f64> {
        self.samples.last().map(|s| s.timestamp)
    }

    /// Timestamps converted to minutes relative to `reference`
    pub fn relative_times(&self, reference: f64) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(move |s| s.minutes_since(reference))
    }
}

impl std::ops::Deref for HistorySnapshot {
    type Target = [Sample];

    fn deref(&self) -> &[Sample] {
        &self.samples
    }
}

impl AsRef<[Sample]> for HistorySnapshot {
    fn as_ref(&self) -> &[Sample] {
        &self.samples
    }
}

#[derive(Debug)]
struct SharedInner {
    buffer: RwLock<HistoryBuffer>,
    /// Last snapshot handed out, reused until the next append
    cache: Mutex<Option<HistorySnapshot>>,
}

/// Thread-safe handle to a history buffer
///
/// Clones refer to the same buffer. Only one task should append.
#[derive(Debug, Clone)]
pub struct SharedHistory {
    inner: Arc<SharedInner>,
}

impl Default for SharedHistory {
    fn default() -> Self {
        Self::new(HistoryBuffer::new())
    }
}

impl SharedHistory {
    /// Share an existing buffer
    pub fn new(buffer: HistoryBuffer) -> Self {
        Self {
            inner: Arc::new(SharedInner {
                buffer: RwLock::new(buffer),
                cache: Mutex::new(None),
            }),
        }
    }

    /// Append a sample and return the new generation
    pub fn append(&self, sample: Sample) -> u64 {
        let mut buffer = self
            .inner
            .buffer
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        buffer.append(sample);
        buffer.generation()
    }

    /// Take a consistent snapshot of the buffer
    ///
    /// Repeated calls without an intervening append return the same shared
    /// samples without copying.
    pub fn snapshot(&self) -> HistorySnapshot {
        let buffer = self
            .inner
            .buffer
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut cache = self
            .inner
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match cache.as_ref() {
            Some(cached) if cached.generation == buffer.generation() => cached.clone(),
            _ => {
                let snapshot = buffer.snapshot();
                *cache = Some(snapshot.clone());
                snapshot
            }
        }
    }

    /// Total number of samples appended so far
    pub fn generation(&self) -> u64 {
        self.inner
            .buffer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .generation()
    }

    /// Number of retained samples
    pub fn len(&self) -> usize {
        self.inner
            .buffer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample(t: f64) -> Sample {
        Sample::new(t, 10.0 + t, 0.0, 0.0)
    }

    #[test]
    fn test_append_within_capacity() {
        let mut buffer = HistoryBuffer::with_capacity(4);
        assert!(buffer.append(sample(0.0)).is_none());
        assert!(buffer.append(sample(1.0)).is_none());
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.latest_timestamp(), Some(1.0));
    }

    #[test]
    fn test_eviction_is_fifo() {
        let mut buffer = HistoryBuffer::with_capacity(3);
        for t in 0..5 {
            buffer.append(sample(t as f64));
        }
        let times: Vec<f64> = buffer.iter().map(|s| s.timestamp).collect();
        assert_eq!(times, vec![2.0, 3.0, 4.0]);
        assert_eq!(buffer.generation(), 5);
    }

    #[test]
    fn test_default_capacity() {
        assert_eq!(HistoryBuffer::new().capacity(), 86_400);
    }

    #[test]
    fn test_relative_times_single_sample() {
        let mut buffer = HistoryBuffer::new();
        buffer.append(sample(1234.5));
        let reference = buffer.latest_timestamp().unwrap();
        let times: Vec<f64> = buffer.relative_times(reference).collect();
        assert_eq!(times, vec![0.0]);
    }

    #[test]
    fn test_relative_times_in_minutes() {
        let mut buffer = HistoryBuffer::new();
        buffer.append(sample(0.0));
        buffer.append(sample(60.0));
        buffer.append(sample(120.0));
        let times: Vec<f64> = buffer.relative_times(120.0).collect();
        assert_eq!(times, vec![-2.0, -1.0, 0.0]);
    }

    #[test]
    fn test_relative_times_empty() {
        let buffer = HistoryBuffer::new();
        assert_eq!(buffer.relative_times(0.0).count(), 0);
        assert!(buffer.snapshot().is_empty());
    }

    #[test]
    fn test_snapshot_unaffected_by_later_eviction() {
        let shared = SharedHistory::new(HistoryBuffer::with_capacity(2));
        shared.append(sample(0.0));
        shared.append(sample(1.0));
        let before = shared.snapshot();

        shared.append(sample(2.0));
        shared.append(sample(3.0));

        assert_eq!(before.len(), 2);
        assert_eq!(before[0].timestamp, 0.0);
        let after = shared.snapshot();
        assert_eq!(after[0].timestamp, 2.0);
        assert_eq!(after.generation(), 4);
    }

    #[test]
    fn test_snapshot_is_cached_between_appends() {
        let shared = SharedHistory::default();
        shared.append(sample(0.0));
        let a = shared.snapshot();
        let b = shared.snapshot();
        assert!(std::ptr::eq(a.samples().as_ptr(), b.samples().as_ptr()));

        shared.append(sample(1.0));
        let c = shared.snapshot();
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn test_concurrent_append_and_snapshot() {
        let shared = SharedHistory::new(HistoryBuffer::with_capacity(100));
        let writer = shared.clone();
        let handle = std::thread::spawn(move || {
            for t in 0..1000 {
                writer.append(sample(t as f64));
            }
        });

        for _ in 0..200 {
            let snap = shared.snapshot();
            assert!(snap.len() <= 100);
            // Every snapshot is internally ordered
            assert!(snap.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        }

        handle.join().unwrap();
        assert_eq!(shared.len(), 100);
        assert_eq!(shared.generation(), 1000);
    }

    proptest! {
        #[test]
        fn test_capacity_never_exceeded(
            capacity in 1usize..64,
            count in 0usize..256
        ) {
            let mut buffer = HistoryBuffer::with_capacity(capacity);
            for t in 0..count {
                buffer.append(sample(t as f64));
                prop_assert!(buffer.len() <= capacity);
            }

            // Retained entries are exactly the most recent ones, in order
            let expected: Vec<f64> = (count.saturating_sub(capacity)..count)
                .map(|t| t as f64)
                .collect();
            let actual: Vec<f64> = buffer.iter().map(|s| s.timestamp).collect();
            prop_assert_eq!(actual, expected);
        }
    }
}
