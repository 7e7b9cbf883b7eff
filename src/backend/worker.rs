//! Polling worker thread
//!
//! The worker runs in its own thread and is the single writer of the shared
//! history. Each cycle it takes one reading from the [`TemperatureFeed`],
//! appends it, and tells the UI that a new generation is available.
//!
//! # Backpressure
//!
//! Notifications use `try_send`. If the UI falls behind, notifications are
//! dropped and counted; the UI redraws from the newest snapshot anyway, so a
//! dropped notification loses nothing.
//!
//! Connection status changes are the exception: a status that does not fit
//! in the queue is kept pending and retried every cycle until it is
//! delivered. Only the newest pending status is kept.
//!
//! # Timestamps
//!
//! Samples are stamped by the worker, not the feed. The clock is the wall
//! time at start-up advanced by a monotonic [`Instant`], so history
//! timestamps never decrease even when the system clock is stepped back.
//! The feed's own wall-clock time stays on the [`Reading`](crate::types::Reading).
//!
//! # Rate Limiting
//!
//! Reads happen every `poll_interval`. Between reads the worker sleeps in
//! short steps so that commands are handled promptly even with long
//! intervals.

use crate::backend::{FeedCommand, FeedEvent, TemperatureFeed};
use crate::history::SharedHistory;
use crate::types::{epoch_seconds, ConnectionStatus, FeedStats};
use chrono::Utc;
use crossbeam_channel::{Receiver, Sender, TrySendError, TryRecvError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Longest single sleep between command checks
const COMMAND_CHECK_INTERVAL: Duration = Duration::from_millis(20);

/// How long the final shutdown event may wait for queue space
const SHUTDOWN_SEND_TIMEOUT: Duration = Duration::from_millis(200);

/// Shortest accepted polling interval
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How often statistics are pushed to the UI
const STATS_INTERVAL: Duration = Duration::from_secs(5);

/// Non-decreasing sample clock anchored to the wall clock at start-up
#[derive(Debug)]
struct SampleClock {
    wall_base: f64,
    started: Instant,
    last: Option<f64>,
}

impl SampleClock {
    /// Start a clock that never goes below `last`
    fn new(last: Option<f64>) -> Self {
        Self {
            wall_base: epoch_seconds(&Utc::now()),
            started: Instant::now(),
            last,
        }
    }

    /// Timestamp in epoch seconds for a sample taken now
    fn next(&mut self) -> f64 {
        let now = self.wall_base + self.started.elapsed().as_secs_f64();
        let stamped = self.last.map_or(now, |last| now.max(last));
        self.last = Some(stamped);
        stamped
    }
}

/// The worker that runs the polling loop
pub struct FeedWorker {
    feed: Box<dyn TemperatureFeed>,
    history: SharedHistory,
    clock: SampleClock,
    command_rx: Receiver<FeedCommand>,
    event_tx: Sender<FeedEvent>,
    running: Arc<AtomicBool>,
    status: ConnectionStatus,
    /// Status change still waiting for room in the event queue
    pending_status: Option<bool>,
    /// Whether polling is active
    polling: bool,
    poll_interval: Duration,
    /// Time of the last read; `None` forces a read on the next cycle
    last_poll: Option<Instant>,
    last_stats: Instant,
    stats: FeedStats,
}

impl FeedWorker {
    /// Create a new worker
    pub fn new(
        feed: Box<dyn TemperatureFeed>,
        history: SharedHistory,
        poll_interval: Duration,
        command_rx: Receiver<FeedCommand>,
        event_tx: Sender<FeedEvent>,
        running: Arc<AtomicBool>,
    ) -> Self {
        let clock = SampleClock::new(history.snapshot().latest_timestamp());
        Self {
            feed,
            history,
            clock,
            command_rx,
            event_tx,
            running,
            status: ConnectionStatus::Disconnected,
            pending_status: None,
            polling: false,
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
            last_poll: None,
            last_stats: Instant::now(),
            stats: FeedStats::default(),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn is_polling(&self) -> bool {
        self.polling
    }

    pub fn stats(&self) -> &FeedStats {
        &self.stats
    }

    /// Run the main worker loop
    pub fn run(&mut self) {
        tracing::info!("Feed worker started ({})", self.feed.name());

        while self.running.load(Ordering::SeqCst) {
            self.flush_status();
            self.process_commands();

            if self.polling && self.poll_due() {
                self.poll_once();

                if self.last_stats.elapsed() >= STATS_INTERVAL {
                    self.try_send_event(FeedEvent::Stats(self.stats.clone()));
                    self.last_stats = Instant::now();
                }
            }

            std::thread::sleep(self.sleep_time());
        }

        if self.polling {
            self.feed.disconnect();
        }
        // Never block forever on a full queue nobody drains any more
        if let Some(connected) = self.pending_status.take() {
            let _ = self
                .event_tx
                .send_timeout(FeedEvent::Connected(connected), SHUTDOWN_SEND_TIMEOUT);
        }
        let _ = self
            .event_tx
            .send_timeout(FeedEvent::Shutdown, SHUTDOWN_SEND_TIMEOUT);
        tracing::info!(
            "Feed worker stopped after {} reads ({:.1}% successful)",
            self.stats.successful_reads + self.stats.failed_reads,
            self.stats.success_rate()
        );
    }

    /// Process pending commands from the UI
    pub fn process_commands(&mut self) {
        loop {
            match self.command_rx.try_recv() {
                Ok(cmd) => self.handle_command(cmd),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.running.store(false, Ordering::SeqCst);
                    break;
                }
            }
        }
    }

    fn handle_command(&mut self, cmd: FeedCommand) {
        match cmd {
            FeedCommand::Start => self.start(),
            FeedCommand::Stop => self.stop(),
            FeedCommand::SetInterval(interval) => {
                self.poll_interval = interval.max(MIN_POLL_INTERVAL);
                tracing::debug!("Poll interval set to {:?}", self.poll_interval);
            }
            FeedCommand::SetSetpoint(kelvin) => match self.feed.set_setpoint(kelvin) {
                Ok(()) => {
                    tracing::info!("Setpoint changed to {} K", kelvin);
                    self.notify(format!("Setpoint set to {} K", kelvin));
                }
                Err(e) => {
                    tracing::warn!("Setpoint change rejected: {}", e);
                    self.notify(e.to_string());
                }
            },
            FeedCommand::Shutdown => {
                self.running.store(false, Ordering::SeqCst);
            }
        }
    }

    fn start(&mut self) {
        if self.polling {
            return;
        }
        match self.feed.connect() {
            Ok(()) => {
                self.polling = true;
                self.last_poll = None;
                self.stats = FeedStats::default();
                self.update_status(ConnectionStatus::Connected);
                tracing::info!("Connected to {}", self.feed.name());
            }
            Err(e) => {
                self.update_status(ConnectionStatus::Error);
                let msg = format!("Failed to connect: {}", e);
                tracing::error!("{}", msg);
                self.notify(msg);
            }
        }
    }

    fn stop(&mut self) {
        if !self.polling {
            return;
        }
        self.polling = false;
        self.feed.disconnect();
        self.update_status(ConnectionStatus::Disconnected);
        tracing::info!("Disconnected from {}", self.feed.name());
    }

    fn poll_due(&self) -> bool {
        self.last_poll
            .map_or(true, |last| last.elapsed() >= self.poll_interval)
    }

    fn sleep_time(&self) -> Duration {
        match self.last_poll {
            Some(last) if self.polling => self
                .poll_interval
                .saturating_sub(last.elapsed())
                .min(COMMAND_CHECK_INTERVAL),
            _ => COMMAND_CHECK_INTERVAL,
        }
    }

    /// Take one reading and append it to the history
    ///
    /// A failed read is counted and reported, and polling continues.
    pub fn poll_once(&mut self) {
        let started = Instant::now();
        self.last_poll = Some(started);

        match self.feed.read() {
            Ok(reading) => {
                let generation = self.history.append(reading.to_sample_at(self.clock.next()));
                self.stats.successful_reads += 1;
                self.stats
                    .record_read_time(started.elapsed().as_secs_f64() * 1e6);
                if self.status != ConnectionStatus::Connected {
                    self.update_status(ConnectionStatus::Connected);
                }
                self.try_send_event(FeedEvent::SampleAppended {
                    generation,
                    reading,
                });
            }
            Err(e) => {
                self.stats.failed_reads += 1;
                tracing::warn!("Read from {} failed: {}", self.feed.name(), e);
                self.update_status(ConnectionStatus::Error);
                self.notify(format!("Read failed: {}", e));
            }
        }
    }

    /// Update connection status and notify UI
    fn update_status(&mut self, status: ConnectionStatus) {
        if self.status == status {
            return;
        }
        self.status = status;
        self.pending_status = Some(status == ConnectionStatus::Connected);
        self.flush_status();
    }

    /// Deliver a pending status change if the event queue has room
    fn flush_status(&mut self) {
        let Some(connected) = self.pending_status else {
            return;
        };
        match self.event_tx.try_send(FeedEvent::Connected(connected)) {
            Ok(()) => self.pending_status = None,
            Err(TrySendError::Full(_)) => {
                self.stats.deferred_status_updates += 1;
                tracing::debug!("Event queue full, status update deferred");
            }
            Err(TrySendError::Disconnected(_)) => self.pending_status = None,
        }
    }

    /// Whether a status change is still waiting to be delivered
    pub fn has_pending_status(&self) -> bool {
        self.pending_status.is_some()
    }

    fn notify(&mut self, message: String) {
        self.try_send_event(FeedEvent::Notify(message));
    }

    /// Try to send an event, counting it as dropped if the queue is full
    fn try_send_event(&mut self, event: FeedEvent) {
        if self.event_tx.try_send(event).is_err() {
            self.stats.dropped_notifications += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockTemperatureFeed;
    use crate::error::ThermoVisError;
    use crate::analysis::DownsampleMode;
    use crate::frontend::viewport::{TimeWindow, Viewport};
    use crate::types::{Reading, Sample};
    use chrono::TimeZone;
    use crossbeam_channel::bounded;

    fn reading(secs: i64, temperature: f64) -> Reading {
        Reading::new(
            Utc.timestamp_opt(secs, 0).unwrap(),
            temperature,
            10.0,
            20.0,
        )
    }

    fn create_test_worker(
        feed: MockTemperatureFeed,
        capacity: usize,
    ) -> (
        FeedWorker,
        SharedHistory,
        Receiver<FeedEvent>,
        Sender<FeedCommand>,
    ) {
        let (cmd_tx, cmd_rx) = bounded(16);
        let (event_tx, event_rx) = bounded(capacity);
        let history = SharedHistory::default();
        let worker = FeedWorker::new(
            Box::new(feed),
            history.clone(),
            Duration::from_millis(100),
            cmd_rx,
            event_tx,
            Arc::new(AtomicBool::new(true)),
        );
        (worker, history, event_rx, cmd_tx)
    }

    fn named_feed() -> MockTemperatureFeed {
        let mut feed = MockTemperatureFeed::new();
        feed.expect_name().return_const("mock".to_string());
        feed
    }

    #[test]
    fn test_start_connects_and_reports() {
        let mut feed = named_feed();
        feed.expect_connect().times(1).returning(|| Ok(()));
        let (mut worker, _, events, cmd_tx) = create_test_worker(feed, 16);

        cmd_tx.send(FeedCommand::Start).unwrap();
        worker.process_commands();

        assert!(worker.is_polling());
        assert_eq!(worker.status(), ConnectionStatus::Connected);
        assert!(matches!(events.try_recv(), Ok(FeedEvent::Connected(true))));
    }

    #[test]
    fn test_connect_failure_keeps_idle() {
        let mut feed = named_feed();
        feed.expect_connect()
            .returning(|| Err(ThermoVisError::Feed("no instrument".into())));
        let (mut worker, _, events, cmd_tx) = create_test_worker(feed, 16);

        cmd_tx.send(FeedCommand::Start).unwrap();
        worker.process_commands();

        assert!(!worker.is_polling());
        assert_eq!(worker.status(), ConnectionStatus::Error);
        let events: Vec<FeedEvent> = events.try_iter().collect();
        assert!(events
            .iter()
            .any(|e| matches!(e, FeedEvent::Notify(m) if m.contains("no instrument"))));
    }

    #[test]
    fn test_poll_appends_and_notifies() {
        let mut feed = named_feed();
        let mut t = 0;
        feed.expect_read().times(3).returning(move || {
            t += 1;
            Ok(reading(1_700_000_000 + t, 100.0 + t as f64))
        });
        let (mut worker, history, events, _) = create_test_worker(feed, 16);

        for _ in 0..3 {
            worker.poll_once();
        }

        assert_eq!(history.len(), 3);
        assert_eq!(worker.stats().successful_reads, 3);
        let generations: Vec<u64> = events
            .try_iter()
            .filter_map(|e| match e {
                FeedEvent::SampleAppended { generation, .. } => Some(generation),
                _ => None,
            })
            .collect();
        assert_eq!(generations, vec![1, 2, 3]);
        assert_eq!(history.snapshot().samples()[2].temperature, 103.0);
    }

    #[test]
    fn test_read_failure_keeps_polling() {
        let mut feed = named_feed();
        let mut calls = 0;
        feed.expect_read().times(2).returning(move || {
            calls += 1;
            if calls == 1 {
                Err(ThermoVisError::Feed("timeout".into()))
            } else {
                Ok(reading(1_700_000_000, 4.2))
            }
        });
        let (mut worker, history, _, _) = create_test_worker(feed, 16);

        worker.poll_once();
        assert_eq!(worker.status(), ConnectionStatus::Error);
        worker.poll_once();

        assert_eq!(worker.status(), ConnectionStatus::Connected);
        assert_eq!(worker.stats().failed_reads, 1);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_full_queue_drops_notifications_not_samples() {
        let mut feed = named_feed();
        feed.expect_read()
            .returning(|| Ok(reading(1_700_000_000, 77.0)));
        let (mut worker, history, _events, _) = create_test_worker(feed, 1);

        for _ in 0..5 {
            worker.poll_once();
        }

        assert_eq!(history.len(), 5);
        assert!(worker.stats().dropped_notifications >= 4);
    }

    #[test]
    fn test_history_stays_ordered_when_feed_clock_steps_back() {
        let mut feed = named_feed();
        // Wall clock jumps back three minutes before the third reading
        let mut offsets = vec![60, 120, 0].into_iter();
        feed.expect_read().times(3).returning(move || {
            let offset = offsets.next().unwrap_or(0);
            Ok(reading(1_700_000_000 + offset, 77.0))
        });
        let (mut worker, history, _events, _) = create_test_worker(feed, 16);

        for _ in 0..3 {
            worker.poll_once();
        }

        let snapshot = history.snapshot();
        assert!(snapshot.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        let reference = snapshot.latest_timestamp().unwrap();
        assert!(snapshot.relative_times(reference).all(|m| m <= 0.0));

        let viewport = Viewport::new(TimeWindow::new(60.0).unwrap(), DownsampleMode::Peak);
        assert_eq!(viewport.visible_slice(&snapshot).len(), 3);
    }

    #[test]
    fn test_sample_clock_never_goes_below_existing_history() {
        let history = SharedHistory::default();
        let future = epoch_seconds(&Utc::now()) + 3600.0;
        history.append(Sample::new(future, 4.2, 0.0, 0.0));

        let mut clock = SampleClock::new(history.snapshot().latest_timestamp());
        let first = clock.next();
        assert!(first >= future);
        assert!(clock.next() >= first);
    }

    #[test]
    fn test_status_change_survives_full_queue() {
        let mut feed = named_feed();
        feed.expect_connect().returning(|| Ok(()));
        feed.expect_disconnect().return_const(());
        let (mut worker, _, events, cmd_tx) = create_test_worker(feed, 1);

        cmd_tx.send(FeedCommand::Start).unwrap();
        cmd_tx.send(FeedCommand::Stop).unwrap();
        worker.process_commands();

        assert_eq!(worker.status(), ConnectionStatus::Disconnected);
        assert!(worker.has_pending_status());
        assert!(worker.stats().deferred_status_updates >= 1);

        // The UI drains the queue; the next cycle delivers the newest status
        assert!(matches!(events.try_recv(), Ok(FeedEvent::Connected(true))));
        worker.flush_status();
        assert!(!worker.has_pending_status());
        assert!(matches!(events.try_recv(), Ok(FeedEvent::Connected(false))));
    }

    #[test]
    fn test_setpoint_command_forwards_to_feed() {
        let mut feed = named_feed();
        feed.expect_set_setpoint()
            .withf(|k| *k == 77.0)
            .times(1)
            .returning(|_| Ok(()));
        let (mut worker, _, events, cmd_tx) = create_test_worker(feed, 16);

        cmd_tx.send(FeedCommand::SetSetpoint(77.0)).unwrap();
        worker.process_commands();
        assert!(matches!(events.try_recv(), Ok(FeedEvent::Notify(_))));
    }

    #[test]
    fn test_shutdown_and_disconnected_channel_stop_worker() {
        let (mut worker, _, _, cmd_tx) = create_test_worker(named_feed(), 16);
        cmd_tx.send(FeedCommand::Shutdown).unwrap();
        worker.process_commands();
        assert!(!worker.running.load(Ordering::SeqCst));

        let (mut worker, _, _, cmd_tx) = create_test_worker(named_feed(), 16);
        drop(cmd_tx);
        worker.process_commands();
        assert!(!worker.running.load(Ordering::SeqCst));
    }

    #[test]
    fn test_interval_has_floor() {
        let (mut worker, _, _, cmd_tx) = create_test_worker(named_feed(), 16);
        cmd_tx.send(FeedCommand::SetInterval(Duration::ZERO)).unwrap();
        worker.process_commands();
        assert_eq!(worker.poll_interval, MIN_POLL_INTERVAL);
    }
}
