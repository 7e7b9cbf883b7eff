//! Shared fixtures for the integration tests
//!
//! - [`builders`] - sample series at a fixed interval
//! - [`mock_helpers`] - recording drawing surface and a default session

// Each test binary uses a different subset
#![allow(dead_code)]

pub mod builders;
pub mod mock_helpers;

use std::time::{Duration, Instant};
use thermovis_rs::Sample;

/// Upper bound for anything that waits on the feed thread
pub const FEED_TIMEOUT: Duration = Duration::from_secs(2);

/// Call `poll` every few milliseconds until it yields a value or
/// [`FEED_TIMEOUT`] passes
pub fn wait_for<T>(mut poll: impl FnMut() -> Option<T>) -> Option<T> {
    let deadline = Instant::now() + FEED_TIMEOUT;
    loop {
        if let Some(value) = poll() {
            return Some(value);
        }
        if Instant::now() >= deadline {
            return None;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}

/// The two-sample trace used throughout: `(t=0, 10 K, 0 %, 0 %)` followed by
/// `(t=60, 20 K, 50 %, 50 %)`
pub fn two_sample_trace() -> Vec<Sample> {
    builders::HistoryBuilder::new()
        .every(60.0)
        .sample(10.0, 0.0, 0.0)
        .sample(20.0, 50.0, 50.0)
        .build()
}

/// Panic unless timestamps never decrease
pub fn assert_time_ordered(samples: &[Sample]) {
    if let Some(i) = samples
        .windows(2)
        .position(|w| w[1].timestamp < w[0].timestamp)
    {
        panic!(
            "timestamp went backwards at index {}: {} -> {}",
            i + 1,
            samples[i].timestamp,
            samples[i + 1].timestamp
        );
    }
}
