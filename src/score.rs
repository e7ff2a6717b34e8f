//! Engagement scoring
//!
//! Computes the bounded 0–10 engagement score from accumulated session
//! counters. The weighting is fixed for compatibility with existing
//! consumers: duration saturates at 5 points after 50 s of active time,
//! interactions at 3 points after 15 events, scroll depth at 2 points at
//! 40 %. The total is rounded to one decimal.

use serde::{Deserialize, Serialize};

/// Active milliseconds that earn one duration point
const DURATION_MS_PER_POINT: f64 = 10_000.0;

/// Maximum duration contribution
const DURATION_MAX: f64 = 5.0;

/// Interactions that earn one interaction point
const INTERACTIONS_PER_POINT: f64 = 5.0;

/// Maximum interaction contribution
const INTERACTION_MAX: f64 = 3.0;

/// Scroll-depth percent that earns one scroll point
const SCROLL_PCT_PER_POINT: f64 = 20.0;

/// Maximum scroll contribution
const SCROLL_MAX: f64 = 2.0;

/// Component breakdown of an engagement score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngagementScore {
    /// Contribution of active time (0–5)
    pub duration_score: f64,
    /// Contribution of interaction count (0–3)
    pub interaction_score: f64,
    /// Contribution of scroll depth (0–2)
    pub scroll_score: f64,
    /// Rounded total (0.0–10.0, one decimal)
    pub total: f64,
}

impl EngagementScore {
    /// Score a session's accumulated counters
    pub fn compute(active_ms: u64, interaction_count: u32, scroll_depth_percent: u8) -> Self {
        let duration_score = compute_duration_score(active_ms);
        let interaction_score = compute_interaction_score(interaction_count);
        let scroll_score = compute_scroll_score(scroll_depth_percent);
        let total = round_one_decimal(duration_score + interaction_score + scroll_score);

        Self {
            duration_score,
            interaction_score,
            scroll_score,
            total,
        }
    }
}

/// Rounded total score for a session's counters
pub fn engagement_score(active_ms: u64, interaction_count: u32, scroll_depth_percent: u8) -> f64 {
    EngagementScore::compute(active_ms, interaction_count, scroll_depth_percent).total
}

/// Duration contribution: `min(active_ms / 10000, 5)`
fn compute_duration_score(active_ms: u64) -> f64 {
    (active_ms as f64 / DURATION_MS_PER_POINT).min(DURATION_MAX)
}

/// Interaction contribution: `min(interactions / 5, 3)`
fn compute_interaction_score(interaction_count: u32) -> f64 {
    (interaction_count as f64 / INTERACTIONS_PER_POINT).min(INTERACTION_MAX)
}

/// Scroll contribution: `min(scroll_depth_percent / 20, 2)`
fn compute_scroll_score(scroll_depth_percent: u8) -> f64 {
    (scroll_depth_percent as f64 / SCROLL_PCT_PER_POINT).min(SCROLL_MAX)
}

/// Round to one decimal: `round(x * 10) / 10`
fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
