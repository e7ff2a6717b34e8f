//! View session state
//!
//! A [`ViewSession`] is the single stateful entity of the tracker: the
//! counters accumulated while one item is being observed. All mutation
//! goes through the methods here, which enforce the session invariants:
//! active time and scroll depth are monotonic, scroll depth never exceeds
//! 100, and the device snapshot is fixed at session start.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::device::DeviceInfo;

/// Scroll geometry as sampled by the host on a scroll event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollPosition {
    /// Scrolled distance from the top of the document, in pixels
    pub scroll_top: f64,
    /// Total document height, in pixels
    pub document_height: f64,
    /// Visible viewport height, in pixels
    pub viewport_height: f64,
}

/// Scroll depth as a whole percentage of the scrollable track.
///
/// `round(100 * scroll_top / (document_height - viewport_height))`,
/// clamped to [0, 100]. A document that fits entirely in the viewport has
/// no track to measure, so its depth is 0.
pub fn scroll_depth_percent(position: ScrollPosition) -> u8 {
    let track = position.document_height - position.viewport_height;
    if track <= 0.0 {
        return 0;
    }
    let pct = (100.0 * position.scroll_top / track).round();
    pct.clamp(0.0, 100.0) as u8
}

/// Counters for one observed item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewSession {
    /// Unique id for this view, minted at session start
    pub view_id: Uuid,
    /// Item under observation
    pub item_id: String,
    /// Wall-clock session start
    pub started_at: DateTime<Utc>,
    /// Milliseconds credited while visible and active
    pub active_ms: u64,
    /// Raw interaction events since session start
    pub interaction_count: u32,
    /// Maximum scroll depth observed, 0–100
    pub scroll_depth_percent: u8,
    /// Whether the tracked item is currently on screen
    pub is_visible: bool,
    /// Whether the viewer has interacted within the idle threshold
    pub is_user_active: bool,
    /// Last interaction, backing the idle deadline
    pub last_interaction_at: DateTime<Utc>,
    /// Environment snapshot, captured once
    pub device: DeviceInfo,
}

impl ViewSession {
    /// Start a fresh session for `item_id`, visible and active
    pub fn begin(item_id: impl Into<String>, now: DateTime<Utc>, device: DeviceInfo) -> Self {
        Self {
            view_id: Uuid::new_v4(),
            item_id: item_id.into(),
            started_at: now,
            active_ms: 0,
            interaction_count: 0,
            scroll_depth_percent: 0,
            is_visible: true,
            is_user_active: true,
            last_interaction_at: now,
            device,
        }
    }

    /// Register one raw interaction event and restore activity
    pub fn record_interaction(&mut self, now: DateTime<Utc>) {
        self.interaction_count = self.interaction_count.saturating_add(1);
        self.is_user_active = true;
        self.last_interaction_at = now;
    }

    /// Raise the maximum scroll depth; lower readings are ignored
    pub fn raise_scroll_depth(&mut self, percent: u8) {
        let clamped = percent.min(100);
        if clamped > self.scroll_depth_percent {
            self.scroll_depth_percent = clamped;
        }
    }

    /// Credit `millis` of active time iff the session is visible and the
    /// viewer is active. Returns whether anything was credited.
    pub fn credit(&mut self, millis: u64) -> bool {
        if self.is_visible && self.is_user_active {
            self.active_ms = self.active_ms.saturating_add(millis);
            true
        } else {
            false
        }
    }

    /// Mark the viewer idle; counters are kept, accrual pauses
    pub fn mark_idle(&mut self) {
        self.is_user_active = false;
    }

    /// Instant at which the viewer counts as idle absent new interaction
    pub fn idle_deadline(&self, idle_threshold_ms: u64) -> DateTime<Utc> {
        self.last_interaction_at + Duration::milliseconds(idle_threshold_ms as i64)
    }
}
