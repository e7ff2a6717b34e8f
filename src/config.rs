//! Tracker configuration
//!
//! The idle threshold, periodic flush interval, and tick interval were
//! fixed constants in the original instrumentation. They are constructor
//! parameters here; the defaults reproduce the shipped values.

/// Default inactivity window before a viewer is considered idle (60 s)
pub const DEFAULT_IDLE_THRESHOLD_MS: u64 = 60_000;

/// Default interval between periodic report flushes (10 s)
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 10_000;

/// Default accrual tick interval (1 s)
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1_000;

/// Configuration for an [`EngagementTracker`](crate::tracker::EngagementTracker)
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Milliseconds without interaction before accrual pauses
    pub idle_threshold_ms: u64,
    /// Milliseconds between periodic (non-final) reports
    pub flush_interval_ms: u64,
    /// Milliseconds of active time credited per tick
    pub tick_interval_ms: u64,
    /// Ambient page referrer, attached to every report when present
    pub referrer: Option<String>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            idle_threshold_ms: DEFAULT_IDLE_THRESHOLD_MS,
            flush_interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            referrer: None,
        }
    }
}

impl TrackerConfig {
    /// Configuration with the shipped defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the idle threshold
    pub fn with_idle_threshold_ms(mut self, millis: u64) -> Self {
        self.idle_threshold_ms = millis.max(1);
        self
    }

    /// Override the periodic flush interval
    pub fn with_flush_interval_ms(mut self, millis: u64) -> Self {
        self.flush_interval_ms = millis.max(1);
        self
    }

    /// Override the accrual tick interval
    pub fn with_tick_interval_ms(mut self, millis: u64) -> Self {
        self.tick_interval_ms = millis.max(1);
        self
    }

    /// Attach the ambient page referrer
    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }
}
