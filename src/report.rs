//! Report payloads and the delivery seam
//!
//! [`EngagementReport`] is the wire payload consumed by the backend view
//! endpoint. Field names are pinned to the producer that existing
//! consumers already parse; adding fields is safe, renaming is not.
//!
//! Delivery goes through the injected [`ReportSink`]. Sinks are
//! best-effort by contract: the tracker logs a failed send and moves on,
//! it never retries and never lets a sink error reach the host.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::device::DeviceInfo;
use crate::error::TrackError;
use crate::score::engagement_score;
use crate::session::ViewSession;

/// One engagement measurement for one view of one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementReport {
    /// Id of the view this report belongs to; stable across the periodic
    /// updates of one session
    pub view_id: Uuid,
    /// Item under observation
    pub item_id: String,
    /// Milliseconds of credited active time
    #[serde(rename = "duration")]
    pub duration_ms: u64,
    /// Raw interaction events since session start
    pub interaction_count: u32,
    /// Maximum scroll depth observed, 0–100
    pub scroll_depth: u8,
    /// Bounded 0–10 engagement score at report time
    pub engagement_score: f64,
    /// Session start, RFC 3339
    pub viewed_at: String,
    /// Environment snapshot captured at session start
    pub device_info: DeviceInfo,
    /// Ambient page referrer, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    /// Whether this is the closing report for the session
    pub final_update: bool,
}

impl EngagementReport {
    /// Build a report from the current session counters.
    ///
    /// The score is computed here and nowhere stored; a later report for
    /// the same session recomputes it from the counters of that moment.
    pub fn from_session(session: &ViewSession, referrer: Option<&str>, is_final: bool) -> Self {
        Self {
            view_id: session.view_id,
            item_id: session.item_id.clone(),
            duration_ms: session.active_ms,
            interaction_count: session.interaction_count,
            scroll_depth: session.scroll_depth_percent,
            engagement_score: engagement_score(
                session.active_ms,
                session.interaction_count,
                session.scroll_depth_percent,
            ),
            viewed_at: session.started_at.to_rfc3339(),
            device_info: session.device.clone(),
            referrer: referrer.map(str::to_string),
            final_update: is_final,
        }
    }
}

/// Injected report transport.
///
/// Implementations must not block: the tracker calls `send` from its
/// event and timer handlers. Queue-and-forward implementations should
/// hand the payload to their transport and return immediately; see
/// [`spawn_sink`](crate::runtime::spawn_sink) for the async bridge.
pub trait ReportSink: Send {
    /// Deliver one report, best-effort
    fn send(&self, report: &EngagementReport) -> Result<(), TrackError>;
}

/// Sink wrapping a plain function
pub struct FnSink<F>(pub F);

impl<F> ReportSink for FnSink<F>
where
    F: Fn(&EngagementReport) -> Result<(), TrackError> + Send,
{
    fn send(&self, report: &EngagementReport) -> Result<(), TrackError> {
        (self.0)(report)
    }
}

/// Sink that collects reports in memory.
///
/// Used by the replay pipeline and by tests; clones share the same
/// buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    reports: Arc<Mutex<Vec<EngagementReport>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything sent so far
    pub fn reports(&self) -> Vec<EngagementReport> {
        self.reports.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of reports sent so far
    pub fn len(&self) -> usize {
        self.reports.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ReportSink for MemorySink {
    fn send(&self, report: &EngagementReport) -> Result<(), TrackError> {
        self.reports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(report.clone());
        Ok(())
    }
}
