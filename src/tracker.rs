//! Engagement tracker state machine
//!
//! [`EngagementTracker`] owns the lifecycle of the currently observed
//! item: Idle (no session) → Active (accruing) ⇄ Dormant (viewer idle) →
//! Idle again on stop. It is a caller-driven state machine with no
//! internal threads: the host (or the [`runtime`](crate::runtime) layer)
//! invokes [`on_tick`](EngagementTracker::on_tick) once per tick interval
//! and [`on_flush`](EngagementTracker::on_flush) once per flush interval,
//! and forwards visibility and interaction signals as they happen. Every
//! handler runs to completion, so no locking is needed inside.
//!
//! Reports are emitted at session start, on every flush, and when the
//! session ends (stop, item switch, or unload). Delivery is best-effort:
//! a failed send is logged and dropped, never retried, and never surfaces
//! to the host.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::config::TrackerConfig;
use crate::device::DeviceInfoSource;
use crate::report::{EngagementReport, ReportSink};
use crate::score::engagement_score;
use crate::session::{scroll_depth_percent, ScrollPosition, ViewSession};

/// Read-only snapshot of the tracker state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerStats {
    /// Item currently observed, if any
    pub item_id: Option<String>,
    /// Milliseconds of credited active time
    pub active_ms: u64,
    /// Raw interaction events since session start
    pub interaction_count: u32,
    /// Maximum scroll depth observed, 0–100
    pub scroll_depth_percent: u8,
    /// Engagement score for the current counters
    pub score: f64,
    /// Whether the tracked item is on screen
    pub is_visible: bool,
    /// Whether the viewer is within the idle threshold
    pub is_user_active: bool,
}

/// View-engagement measurement state machine
pub struct EngagementTracker {
    config: TrackerConfig,
    clock: Box<dyn Clock>,
    devices: Box<dyn DeviceInfoSource>,
    sink: Box<dyn ReportSink>,
    session: Option<ViewSession>,
}

impl EngagementTracker {
    /// Create a tracker with injected dependencies
    pub fn new(
        config: TrackerConfig,
        clock: Box<dyn Clock>,
        devices: Box<dyn DeviceInfoSource>,
        sink: Box<dyn ReportSink>,
    ) -> Self {
        Self {
            config,
            clock,
            devices,
            sink,
            session: None,
        }
    }

    /// Whether a session is currently running
    pub fn is_tracking(&self) -> bool {
        self.session.is_some()
    }

    /// Item currently observed, if any
    pub fn current_item(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.item_id.as_str())
    }

    /// Tracker configuration
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Begin observing `item_id`.
    ///
    /// An already-running session is finalized (final report, reset)
    /// before the new one starts at zero. An empty item id is rejected as
    /// a no-op with no side effects.
    pub fn start(&mut self, item_id: &str) {
        if item_id.trim().is_empty() {
            warn!("view tracking requested without an item id; ignoring");
            return;
        }

        if self.session.is_some() {
            self.finalize_session();
        }

        let now = self.clock.now();
        let device = self.devices.collect();
        let session = ViewSession::begin(item_id, now, device);
        info!("started tracking view of item {item_id} (view {})", session.view_id);
        self.session = Some(session);

        // Initial measurement, so the backend sees the view even if the
        // visitor navigates away before the first flush.
        self.send_report(false);
    }

    /// End the current session: final report, then back to Idle.
    ///
    /// Without a session this is a no-op and produces no report. The page
    /// unload signal is routed here as well; the send stays best-effort
    /// and never blocks navigation.
    pub fn stop(&mut self) {
        if self.session.is_none() {
            debug!("stop requested with no active view session");
            return;
        }
        self.finalize_session();
    }

    /// The tracked item entered the viewport / became visible
    pub fn on_visible(&mut self) {
        if let Some(session) = self.session.as_mut() {
            if !session.is_visible {
                session.is_visible = true;
                debug!("item {} visible again, resuming accrual", session.item_id);
            }
        }
    }

    /// The tracked item left the viewport / was hidden.
    ///
    /// The tick keeps firing but credits nothing while hidden; accrual
    /// resumes by itself when visibility returns.
    pub fn on_hidden(&mut self) {
        if let Some(session) = self.session.as_mut() {
            if session.is_visible {
                session.is_visible = false;
                debug!("item {} hidden, accrual paused", session.item_id);
            }
        }
    }

    /// Any ambient interaction: pointer move or press, touch, scroll,
    /// key press. Restores activity and re-arms the idle deadline.
    pub fn on_interaction(&mut self) {
        let now = self.clock.now();
        if let Some(session) = self.session.as_mut() {
            if !session.is_user_active {
                debug!("viewer active again on item {}", session.item_id);
            }
            session.record_interaction(now);
        }
    }

    /// Scroll geometry changed; raises the maximum observed depth
    pub fn on_scroll(&mut self, position: ScrollPosition) {
        if let Some(session) = self.session.as_mut() {
            session.raise_scroll_depth(scroll_depth_percent(position));
        }
    }

    /// Timer callback, once per tick interval.
    ///
    /// This is the sole place active time accrues. The idle deadline is
    /// checked first, so a tick at or past the deadline marks the viewer
    /// idle and credits nothing.
    pub fn on_tick(&mut self) {
        let now = self.clock.now();
        let idle_threshold_ms = self.config.idle_threshold_ms;
        let tick_ms = self.config.tick_interval_ms;

        if let Some(session) = self.session.as_mut() {
            if session.is_user_active && now >= session.idle_deadline(idle_threshold_ms) {
                session.mark_idle();
                info!("viewer idle on item {}, accrual paused", session.item_id);
            }
            session.credit(tick_ms);
        }
    }

    /// Timer callback, once per flush interval: periodic non-final
    /// report. Session state is untouched.
    pub fn on_flush(&mut self) {
        if self.session.is_some() {
            self.send_report(false);
        }
    }

    /// Read-only snapshot of the current counters
    pub fn stats(&self) -> TrackerStats {
        match &self.session {
            Some(session) => TrackerStats {
                item_id: Some(session.item_id.clone()),
                active_ms: session.active_ms,
                interaction_count: session.interaction_count,
                scroll_depth_percent: session.scroll_depth_percent,
                score: engagement_score(
                    session.active_ms,
                    session.interaction_count,
                    session.scroll_depth_percent,
                ),
                is_visible: session.is_visible,
                is_user_active: session.is_user_active,
            },
            None => TrackerStats {
                item_id: None,
                active_ms: 0,
                interaction_count: 0,
                scroll_depth_percent: 0,
                score: 0.0,
                is_visible: false,
                is_user_active: false,
            },
        }
    }

    fn finalize_session(&mut self) {
        self.send_report(true);
        if let Some(session) = self.session.take() {
            info!(
                "stopped tracking item {}: {} ms active, {} interactions, {} % depth",
                session.item_id,
                session.active_ms,
                session.interaction_count,
                session.scroll_depth_percent
            );
        }
    }

    fn send_report(&mut self, is_final: bool) {
        let Some(session) = &self.session else {
            return;
        };
        let report =
            EngagementReport::from_session(session, self.config.referrer.as_deref(), is_final);
        if let Err(err) = self.sink.send(&report) {
            // Best-effort delivery: the next flush supersedes a dropped
            // periodic report; a dropped final report is accepted loss.
            warn!("view report for item {} dropped: {err}", report.item_id);
        }
    }
}
