//! Publish scheduler
//!
//! STOPPED / RUNNING state machine driving the merge-and-emit cycle on
//! a fixed period. The loop is a tokio task ticking on
//! `tokio::time::interval`, whose first tick fires immediately.
//!
//! # Ordering
//!
//! ```text
//! start: create_publisher ──► spawn loop ──► publish, publish, ...
//! stop:  cancel ──► join loop (current tick finishes) ──► destroy_publisher
//! ```
//!
//! Teardown runs in its own task, so it completes even if the caller stops
//! waiting for `stop()`. Until it has, the scheduler stays STOPPING and
//! refuses to start, so a new `create_publisher` never precedes the old
//! `destroy_publisher`.

use chrono::Local;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::selector::SourceSelector;
use super::sink::{PublisherSink, SinkError};
use crate::config::PublishParams;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Publish loop already running, stop it first")]
    AlreadyRunning,

    #[error("Previous publish loop is still tearing down")]
    TeardownPending,

    #[error("Invalid publish period: {0} ms")]
    InvalidPeriod(u64),

    #[error("No tokio runtime available: {0}")]
    NoRuntime(String),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerStatus {
    Stopped,
    Running,
    /// Stop requested, teardown not finished yet
    Stopping,
}

/// Counters shared with the running loop
#[derive(Debug, Default)]
struct LoopCounters {
    ticks: AtomicU64,
    failures: AtomicU64,
}

struct RunningLoop {
    params: PublishParams,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

enum SchedulerState {
    Stopped,
    Running(RunningLoop),
    Stopping(JoinHandle<()>),
}

pub struct PublishScheduler {
    sink: Arc<dyn PublisherSink>,
    selector: SourceSelector,
    state: SchedulerState,
    counters: Arc<LoopCounters>,
}

impl PublishScheduler {
    pub fn new(sink: Arc<dyn PublisherSink>, selector: SourceSelector) -> Self {
        Self {
            sink,
            selector,
            state: SchedulerState::Stopped,
            counters: Arc::new(LoopCounters::default()),
        }
    }

    pub fn status(&self) -> SchedulerStatus {
        match &self.state {
            SchedulerState::Stopped => SchedulerStatus::Stopped,
            SchedulerState::Running(_) => SchedulerStatus::Running,
            SchedulerState::Stopping(pending) if pending.is_finished() => SchedulerStatus::Stopped,
            SchedulerState::Stopping(_) => SchedulerStatus::Stopping,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status() == SchedulerStatus::Running
    }

    /// Parameters of the running session, if any
    pub fn params(&self) -> Option<&PublishParams> {
        match &self.state {
            SchedulerState::Running(running) => Some(&running.params),
            SchedulerState::Stopped | SchedulerState::Stopping(_) => None,
        }
    }

    pub fn selector(&self) -> &SourceSelector {
        &self.selector
    }

    /// Ticks executed since the last start
    pub fn ticks(&self) -> u64 {
        self.counters.ticks.load(Ordering::Relaxed)
    }

    /// Failed `publish` calls since the last start
    pub fn publish_failures(&self) -> u64 {
        self.counters.failures.load(Ordering::Relaxed)
    }

    /// Creates the sink session and starts ticking.
    ///
    /// Must be called from within a tokio runtime. A running loop is left
    /// untouched and reported as [`SchedulerError::AlreadyRunning`]. While an
    /// interrupted `stop()` is still tearing down, start is refused with
    /// [`SchedulerError::TeardownPending`]; `stop()` or `restart()` wait for it.
    pub fn start(&mut self, params: &PublishParams) -> Result<(), SchedulerError> {
        match &self.state {
            SchedulerState::Running(running) => {
                warn!(
                    "Start requested while running with {:?}, ignoring",
                    running.params
                );
                return Err(SchedulerError::AlreadyRunning);
            }
            SchedulerState::Stopping(pending) if !pending.is_finished() => {
                warn!("Start requested while the previous loop is tearing down");
                return Err(SchedulerError::TeardownPending);
            }
            SchedulerState::Stopping(_) | SchedulerState::Stopped => {}
        }
        if params.period_ms == 0 {
            return Err(SchedulerError::InvalidPeriod(params.period_ms));
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SchedulerError::NoRuntime(e.to_string()))?;

        info!(
            "Starting publish loop: domain {}, namespace '{}', every {} ms",
            params.domain_id, params.namespace, params.period_ms
        );
        self.sink
            .create_publisher(params.domain_id, &params.namespace)
            .inspect_err(|e| error!("Could not create publisher: {}", e))?;

        self.counters.ticks.store(0, Ordering::Relaxed);
        self.counters.failures.store(0, Ordering::Relaxed);

        let cancel = CancellationToken::new();
        let task = runtime.spawn(run_publish_loop(
            self.sink.clone(),
            self.selector.clone(),
            Duration::from_millis(params.period_ms),
            cancel.clone(),
            self.counters.clone(),
        ));

        self.state = SchedulerState::Running(RunningLoop {
            params: params.clone(),
            cancel,
            task,
        });
        Ok(())
    }

    /// Stops ticking and tears down the sink session.
    ///
    /// No-op when already stopped. When this returns, the loop has finished
    /// its last tick and `destroy_publisher` has been called exactly once. A
    /// failing teardown is logged, not returned.
    ///
    /// If the returned future is dropped early, teardown keeps running and
    /// the scheduler stays STOPPING until a later `stop()` observes it.
    pub async fn stop(&mut self) {
        match std::mem::replace(&mut self.state, SchedulerState::Stopped) {
            SchedulerState::Stopped => {
                debug!("Stop requested while stopped, nothing to do");
                return;
            }
            SchedulerState::Running(running) => {
                info!("Stopping publish loop ({:?})", running.params);
                let pending = tokio::spawn(teardown(self.sink.clone(), running));
                self.state = SchedulerState::Stopping(pending);
            }
            SchedulerState::Stopping(pending) => {
                debug!("Waiting for pending publish loop teardown");
                self.state = SchedulerState::Stopping(pending);
            }
        }

        if let SchedulerState::Stopping(pending) = &mut self.state {
            if let Err(e) = pending.await {
                error!("Publish loop teardown did not complete: {}", e);
            }
        }
        self.state = SchedulerState::Stopped;
        info!(
            "Publish loop stopped after {} ticks ({} failed)",
            self.ticks(),
            self.publish_failures()
        );
    }

    /// Applies new parameters as stop followed by start. Waits for any
    /// pending teardown first.
    pub async fn restart(&mut self, params: &PublishParams) -> Result<(), SchedulerError> {
        self.stop().await;
        self.start(params)
    }
}

impl Drop for PublishScheduler {
    fn drop(&mut self) {
        // a pending teardown task finishes on its own
        let SchedulerState::Running(running) =
            std::mem::replace(&mut self.state, SchedulerState::Stopped)
        else {
            return;
        };
        warn!("Publish scheduler dropped while running, tearing down in background");
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(teardown(self.sink.clone(), running));
            }
            Err(_) => {
                // without a runtime the loop cannot be joined, so the sink is left alone
                running.cancel.cancel();
            }
        }
    }
}

async fn teardown(sink: Arc<dyn PublisherSink>, running: RunningLoop) {
    running.cancel.cancel();
    match running.task.await {
        Ok(()) => debug!("Publish loop joined"),
        Err(e) => error!("Publish loop terminated abnormally: {}", e),
    }
    match sink.destroy_publisher() {
        Ok(()) => debug!("Publisher destroyed"),
        Err(e) => error!("Failed to destroy publisher: {}", e),
    }
}

async fn run_publish_loop(
    sink: Arc<dyn PublisherSink>,
    selector: SourceSelector,
    period: Duration,
    cancel: CancellationToken,
    counters: Arc<LoopCounters>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let stats_interval = chrono::Duration::seconds(30);
    let mut last_stats_time = Local::now();
    let mut window_ticks: u64 = 0;
    let mut window_failures: u64 = 0;

    info!("Entering publish loop with {} ms period", period.as_millis());
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Publish loop cancelled");
                break;
            }
            _ = interval.tick() => {}
        }

        let frame = selector.frame();
        counters.ticks.fetch_add(1, Ordering::Relaxed);
        window_ticks += 1;
        if let Err(e) = sink.publish(&frame.axes, &frame.buttons) {
            counters.failures.fetch_add(1, Ordering::Relaxed);
            window_failures += 1;
            warn!("Publish failed: {}", e);
        }

        let now = Local::now();
        if now - last_stats_time > stats_interval {
            let elapsed_seconds = (now - last_stats_time).num_seconds().max(1);
            info!(
                "Publish stats: {} ticks ({} failed) in {} seconds, {:.2} ticks/sec",
                window_ticks,
                window_failures,
                elapsed_seconds,
                window_ticks as f64 / elapsed_seconds as f64
            );
            debug!("Last frame: {}", frame.summary());
            window_ticks = 0;
            window_failures = 0;
            last_stats_time = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::axis::AXIS_COUNT;
    use crate::controller::button_map::BUTTON_COUNT;
    use crate::controller::input_state::InputState;
    use crate::publish::blocks::{ExtraBlock, ManualOverride};
    use crate::publish::mock::{RecordingSink, SinkCall};
    use tokio::time::{sleep, Instant};

    fn params(period_ms: u64) -> PublishParams {
        PublishParams {
            domain_id: 5,
            namespace: "test".to_string(),
            period_ms,
        }
    }

    fn scheduler(sink: Arc<RecordingSink>) -> PublishScheduler {
        let selector = SourceSelector::new(
            InputState::new(),
            ManualOverride::new(),
            ExtraBlock::new(2, 2, false),
        );
        PublishScheduler::new(sink, selector)
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_is_immediate() {
        let sink = RecordingSink::new();
        let mut scheduler = scheduler(sink.clone());
        let started = Instant::now();
        scheduler.start(&params(20)).unwrap();

        sleep(Duration::from_millis(1)).await;
        assert!(started.elapsed() < Duration::from_millis(20));
        assert!(sink.publish_count() >= 1);
        assert!(matches!(sink.calls()[0], SinkCall::Create { domain_id: 5, .. }));

        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_follow_period() {
        let sink = RecordingSink::new();
        let mut scheduler = scheduler(sink.clone());
        scheduler.start(&params(20)).unwrap();

        sleep(Duration::from_millis(105)).await;
        // ticks at 0, 20, 40, 60, 80, 100
        assert_eq!(sink.publish_count(), 6);
        assert_eq!(scheduler.ticks(), 6);
        for (axes, buttons) in sink.frames() {
            assert_eq!(axes.len(), AXIS_COUNT);
            assert_eq!(buttons.len(), BUTTON_COUNT);
        }
        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_publish_after_stop() {
        let sink = RecordingSink::new();
        let mut scheduler = scheduler(sink.clone());
        scheduler.start(&params(20)).unwrap();
        sleep(Duration::from_millis(50)).await;

        scheduler.stop().await;
        assert!(!scheduler.is_running());
        let published = sink.publish_count();
        assert_eq!(sink.create_count(), 1);
        assert_eq!(sink.destroy_count(), 1);
        assert_eq!(sink.calls().last(), Some(&SinkCall::Destroy));

        sleep(Duration::from_millis(200)).await;
        assert_eq!(sink.publish_count(), published);
    }

    #[tokio::test]
    async fn test_stop_when_stopped_is_noop() {
        let sink = RecordingSink::new();
        let mut scheduler = scheduler(sink.clone());
        scheduler.stop().await;
        scheduler.stop().await;
        assert!(sink.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_start_is_rejected() {
        let sink = RecordingSink::new();
        let mut scheduler = scheduler(sink.clone());
        scheduler.start(&params(20)).unwrap();
        let result = scheduler.start(&params(10));
        assert!(matches!(result, Err(SchedulerError::AlreadyRunning)));
        assert_eq!(sink.create_count(), 1);
        assert_eq!(scheduler.params(), Some(&params(20)));

        scheduler.stop().await;
        assert_eq!(sink.destroy_count(), 1);
    }

    #[tokio::test]
    async fn test_zero_period_is_rejected() {
        let sink = RecordingSink::new();
        let mut scheduler = scheduler(sink.clone());
        let result = scheduler.start(&params(0));
        assert!(matches!(result, Err(SchedulerError::InvalidPeriod(0))));
        assert!(!scheduler.is_running());
        assert!(sink.calls().is_empty());
    }

    #[tokio::test]
    async fn test_create_failure_leaves_scheduler_stopped() {
        let sink = RecordingSink::new();
        sink.fail_create(true);
        let mut scheduler = scheduler(sink.clone());
        let result = scheduler.start(&params(20));
        assert!(matches!(result, Err(SchedulerError::Sink(_))));
        assert!(!scheduler.is_running());

        scheduler.stop().await;
        assert_eq!(sink.destroy_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_failures_keep_loop_alive() {
        let sink = RecordingSink::new();
        sink.fail_publish(true);
        let mut scheduler = scheduler(sink.clone());
        scheduler.start(&params(10)).unwrap();
        sleep(Duration::from_millis(35)).await;
        assert_eq!(scheduler.publish_failures(), 4);

        sink.fail_publish(false);
        sleep(Duration::from_millis(10)).await;
        assert!(sink.publish_count() >= 1);
        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_failure_is_not_fatal() {
        let sink = RecordingSink::new();
        sink.fail_destroy(true);
        let mut scheduler = scheduler(sink.clone());
        scheduler.start(&params(20)).unwrap();
        scheduler.stop().await;
        assert!(!scheduler.is_running());
        assert_eq!(sink.destroy_count(), 1);

        sink.fail_destroy(false);
        scheduler.start(&params(20)).unwrap();
        assert!(scheduler.is_running());
        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_pairs_create_and_destroy() {
        let sink = RecordingSink::new();
        let mut scheduler = scheduler(sink.clone());
        scheduler.start(&params(20)).unwrap();
        sleep(Duration::from_millis(30)).await;
        scheduler.restart(&params(50)).await.unwrap();
        sleep(Duration::from_millis(30)).await;
        scheduler.stop().await;

        let kinds: Vec<&str> = sink
            .calls()
            .iter()
            .filter_map(|call| match call {
                SinkCall::Create { .. } => Some("create"),
                SinkCall::Destroy => Some("destroy"),
                SinkCall::Publish { .. } => None,
            })
            .collect();
        assert_eq!(kinds, vec!["create", "destroy", "create", "destroy"]);
    }

    fn lifecycle_trace(sink: &RecordingSink) -> String {
        sink.calls()
            .iter()
            .map(|call| match call {
                SinkCall::Create { .. } => 'C',
                SinkCall::Publish { .. } => 'p',
                SinkCall::Destroy => 'D',
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupted_stop_blocks_start_until_teardown() {
        let sink = RecordingSink::new();
        let mut scheduler = scheduler(sink.clone());
        scheduler.start(&params(20)).unwrap();
        sleep(Duration::from_millis(5)).await;

        let interrupted = tokio::time::timeout(Duration::ZERO, scheduler.stop()).await;
        assert!(interrupted.is_err());
        assert_eq!(scheduler.status(), SchedulerStatus::Stopping);
        assert!(!scheduler.is_running());
        assert!(matches!(
            scheduler.start(&params(20)),
            Err(SchedulerError::TeardownPending)
        ));
        assert_eq!(sink.create_count(), 1);

        scheduler.restart(&params(20)).await.unwrap();
        assert!(scheduler.is_running());
        sleep(Duration::from_millis(50)).await;
        scheduler.stop().await;

        let trace = lifecycle_trace(&sink);
        let sessions: Vec<&str> = trace.split_inclusive('D').collect();
        assert_eq!(sessions.len(), 2, "trace {}", trace);
        for session in sessions {
            assert!(session.starts_with('C'), "trace {}", trace);
            assert!(session.ends_with('D'), "trace {}", trace);
            assert!(
                session[1..session.len() - 1].chars().all(|c| c == 'p'),
                "trace {}",
                trace
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_completes_interrupted_teardown() {
        let sink = RecordingSink::new();
        let mut scheduler = scheduler(sink.clone());
        scheduler.start(&params(20)).unwrap();

        let _ = tokio::time::timeout(Duration::ZERO, scheduler.stop()).await;
        scheduler.stop().await;
        assert_eq!(scheduler.status(), SchedulerStatus::Stopped);
        assert_eq!(sink.destroy_count(), 1);
        assert_eq!(lifecycle_trace(&sink).chars().last(), Some('D'));

        scheduler.start(&params(20)).unwrap();
        scheduler.stop().await;
        assert_eq!(sink.create_count(), 2);
        assert_eq!(sink.destroy_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_while_running_tears_down() {
        let sink = RecordingSink::new();
        {
            let mut scheduler = scheduler(sink.clone());
            scheduler.start(&params(20)).unwrap();
            sleep(Duration::from_millis(5)).await;
        }
        sleep(Duration::from_millis(5)).await;
        assert_eq!(sink.destroy_count(), 1);
        assert_eq!(sink.calls().last(), Some(&SinkCall::Destroy));
    }
}
