//! Live timer ownership
//!
//! [`TrackerRuntime`] wraps an [`EngagementTracker`] for hosts that want
//! the crate to own the repeating timers instead of driving
//! [`on_tick`](EngagementTracker::on_tick) /
//! [`on_flush`](EngagementTracker::on_flush) themselves: one tokio
//! interval task per timer, both aborted unconditionally on `stop`,
//! `shutdown`, or drop, so a stopped runtime holds zero live timers.
//!
//! [`spawn_sink`] bridges the synchronous [`ReportSink`] seam to an async
//! transport: reports are handed to an unbounded channel and delivered by
//! a background task, so a send never blocks an event handler and a
//! failed delivery never reaches the state machine.

use std::future::Future;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use log::warn;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time;

use crate::error::TrackError;
use crate::report::{EngagementReport, ReportSink};
use crate::session::ScrollPosition;
use crate::tracker::{EngagementTracker, TrackerStats};

/// Tokio-driven owner of a tracker and its two repeating timers
pub struct TrackerRuntime {
    tracker: Arc<Mutex<EngagementTracker>>,
    timers: StdMutex<Vec<JoinHandle<()>>>,
}

impl TrackerRuntime {
    /// Wrap a tracker; no timers run until [`start`](Self::start)
    pub fn new(tracker: EngagementTracker) -> Self {
        Self {
            tracker: Arc::new(Mutex::new(tracker)),
            timers: StdMutex::new(Vec::new()),
        }
    }

    /// Begin observing `item_id` and arm the tick and flush timers.
    ///
    /// A rejected start (empty item id) arms nothing.
    pub async fn start(&self, item_id: &str) {
        let (tick_ms, flush_ms) = {
            let mut tracker = self.tracker.lock().await;
            tracker.start(item_id);
            if !tracker.is_tracking() {
                return;
            }
            (
                tracker.config().tick_interval_ms,
                tracker.config().flush_interval_ms,
            )
        };
        self.spawn_timers(tick_ms, flush_ms);
    }

    /// End the session: cancel both timers, then final report
    pub async fn stop(&self) {
        self.cancel_timers();
        self.tracker.lock().await.stop();
    }

    /// Page unload: identical to [`stop`](Self::stop), best-effort
    pub async fn shutdown(&self) {
        self.stop().await;
    }

    /// Forward a visibility-gained signal
    pub async fn on_visible(&self) {
        self.tracker.lock().await.on_visible();
    }

    /// Forward a visibility-lost signal
    pub async fn on_hidden(&self) {
        self.tracker.lock().await.on_hidden();
    }

    /// Forward an ambient interaction signal
    pub async fn on_interaction(&self) {
        self.tracker.lock().await.on_interaction();
    }

    /// Forward a scroll-geometry sample
    pub async fn on_scroll(&self, position: ScrollPosition) {
        self.tracker.lock().await.on_scroll(position);
    }

    /// Read-only snapshot of the tracker state
    pub async fn stats(&self) -> TrackerStats {
        self.tracker.lock().await.stats()
    }

    fn spawn_timers(&self, tick_ms: u64, flush_ms: u64) {
        self.cancel_timers();

        let tick_tracker = self.tracker.clone();
        let tick_task = tokio::spawn(async move {
            let mut interval = time::interval(Duration::from_millis(tick_ms.max(1)));
            // The first interval tick completes immediately; consume it
            // so the session is not credited ahead of real time.
            interval.tick().await;
            loop {
                interval.tick().await;
                let mut tracker = tick_tracker.lock().await;
                if !tracker.is_tracking() {
                    break;
                }
                tracker.on_tick();
            }
        });

        let flush_tracker = self.tracker.clone();
        let flush_task = tokio::spawn(async move {
            let mut interval = time::interval(Duration::from_millis(flush_ms.max(1)));
            interval.tick().await;
            loop {
                interval.tick().await;
                let mut tracker = flush_tracker.lock().await;
                if !tracker.is_tracking() {
                    break;
                }
                tracker.on_flush();
            }
        });

        let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
        *timers = vec![tick_task, flush_task];
    }

    fn cancel_timers(&self) {
        let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
        for task in timers.drain(..) {
            task.abort();
        }
    }
}

impl Drop for TrackerRuntime {
    fn drop(&mut self) {
        self.cancel_timers();
    }
}

/// Sink backed by an unbounded channel and a background delivery task
pub struct ChannelSink {
    tx: UnboundedSender<EngagementReport>,
}

impl ReportSink for ChannelSink {
    fn send(&self, report: &EngagementReport) -> Result<(), TrackError> {
        self.tx
            .send(report.clone())
            .map_err(|_| TrackError::ReportFailed("report channel closed".into()))
    }
}

/// Bridge an async transport into a [`ReportSink`].
///
/// Spawns a background task that drains the channel and awaits `handler`
/// for each report; delivery failures are logged and dropped. Must be
/// called from within a tokio runtime.
pub fn spawn_sink<F, Fut>(handler: F) -> ChannelSink
where
    F: Fn(EngagementReport) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), TrackError>> + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<EngagementReport>();
    tokio::spawn(async move {
        while let Some(report) = rx.recv().await {
            let item_id = report.item_id.clone();
            if let Err(err) = handler(report).await {
                warn!("async report delivery for item {item_id} failed: {err}");
            }
        }
    });
    ChannelSink { tx }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::config::TrackerConfig;
    use crate::device::{DeviceInfo, StaticDeviceSource};
    use crate::report::MemorySink;

    fn make_runtime(config: TrackerConfig, sink: MemorySink) -> TrackerRuntime {
        TrackerRuntime::new(EngagementTracker::new(
            config,
            Box::new(SystemClock),
            Box::new(StaticDeviceSource(DeviceInfo::unknown())),
            Box::new(sink),
        ))
    }

    #[tokio::test]
    async fn test_runtime_drives_tick_and_flush() {
        let sink = MemorySink::new();
        let config = TrackerConfig::default()
            .with_tick_interval_ms(10)
            .with_flush_interval_ms(30);
        let runtime = make_runtime(config, sink.clone());

        runtime.start("p1").await;
        time::sleep(Duration::from_millis(120)).await;
        runtime.stop().await;

        // At least a few ticks were credited
        let reports = sink.reports();
        let last = reports.last().unwrap();
        assert!(last.final_update);
        assert!(last.duration_ms >= 20, "expected accrual, got {}", last.duration_ms);

        // Initial report, at least one periodic flush, final report
        assert!(reports.len() >= 3, "expected >= 3 reports, got {}", reports.len());
        assert!(!reports[0].final_update);
        assert!(reports[1..reports.len() - 1].iter().all(|r| !r.final_update));
    }

    #[tokio::test]
    async fn test_stop_cancels_timers() {
        let sink = MemorySink::new();
        let config = TrackerConfig::default()
            .with_tick_interval_ms(10)
            .with_flush_interval_ms(10);
        let runtime = make_runtime(config, sink.clone());

        runtime.start("p1").await;
        time::sleep(Duration::from_millis(40)).await;
        runtime.stop().await;

        let settled = sink.len();
        time::sleep(Duration::from_millis(60)).await;
        assert_eq!(sink.len(), settled, "reports kept arriving after stop");
        assert!(!runtime.stats().await.is_user_active);
    }

    #[tokio::test]
    async fn test_rejected_start_arms_no_timers() {
        let sink = MemorySink::new();
        let config = TrackerConfig::default().with_flush_interval_ms(10);
        let runtime = make_runtime(config, sink.clone());

        runtime.start("").await;
        time::sleep(Duration::from_millis(50)).await;

        assert!(sink.is_empty());
        assert_eq!(runtime.stats().await.item_id, None);
    }

    #[tokio::test]
    async fn test_event_forwarding() {
        let sink = MemorySink::new();
        let runtime = make_runtime(TrackerConfig::default(), sink.clone());

        runtime.start("p1").await;
        runtime.on_interaction().await;
        runtime.on_interaction().await;
        runtime
            .on_scroll(ScrollPosition {
                scroll_top: 400.0,
                document_height: 2000.0,
                viewport_height: 1000.0,
            })
            .await;
        runtime.on_hidden().await;

        let stats = runtime.stats().await;
        assert_eq!(stats.interaction_count, 2);
        assert_eq!(stats.scroll_depth_percent, 40);
        assert!(!stats.is_visible);

        runtime.on_visible().await;
        assert!(runtime.stats().await.is_visible);

        runtime.shutdown().await;
        assert!(sink.reports().last().unwrap().final_update);
    }

    #[tokio::test]
    async fn test_spawn_sink_delivers_in_background() {
        let received = Arc::new(StdMutex::new(Vec::new()));
        let seen = received.clone();
        let sink = spawn_sink(move |report: EngagementReport| {
            let seen = seen.clone();
            async move {
                seen.lock().unwrap().push(report.item_id.clone());
                Ok(())
            }
        });

        let runtime = TrackerRuntime::new(EngagementTracker::new(
            TrackerConfig::default(),
            Box::new(SystemClock),
            Box::new(StaticDeviceSource(DeviceInfo::unknown())),
            Box::new(sink),
        ));

        runtime.start("p1").await;
        runtime.stop().await;
        time::sleep(Duration::from_millis(50)).await;

        let seen = received.lock().unwrap();
        assert_eq!(*seen, ["p1", "p1"]);
    }
}
