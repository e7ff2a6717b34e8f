//! Offline replay of recorded view events
//!
//! Hosts that buffer their visibility and interaction signals (for
//! debugging, or because the page had no network at view time) can
//! re-process the log here: events are replayed against a tracker under a
//! manual clock, with the tick and flush timers synthesized at their
//! recorded cadence, and the full report stream comes back exactly as the
//! live tracker would have produced it.
//!
//! A recorded `scroll` event feeds scroll depth only. Live wiring treats
//! a scroll gesture as an interaction too, so recorders should emit an
//! `interaction` record alongside each `scroll` record.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::ManualClock;
use crate::config::TrackerConfig;
use crate::device::{DeviceInfo, DeviceInfoSource};
use crate::error::TrackError;
use crate::report::{EngagementReport, MemorySink};
use crate::session::ScrollPosition;
use crate::tracker::EngagementTracker;

/// Kinds of recorded view events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordedEventType {
    /// An item became visible and tracking should start
    Shown,
    /// The tracked item was hidden
    Hidden,
    /// Ambient interaction (pointer, touch, key, scroll gesture)
    Interaction,
    /// Scroll geometry sample
    Scroll,
    /// Page unload; ends the session
    Unload,
}

/// One recorded view event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedEvent {
    /// Event timestamp
    pub timestamp: DateTime<Utc>,
    /// Event type
    pub event_type: RecordedEventType,
    /// Item id (present when event_type is Shown)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    /// Scroll geometry (present when event_type is Scroll)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll: Option<ScrollPosition>,
    /// Environment snapshot captured at show time, when the recorder had one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceInfo>,
}

impl RecordedEvent {
    /// Check the payload required by the event type is present
    pub fn validate(&self) -> Result<(), TrackError> {
        match self.event_type {
            RecordedEventType::Shown if self.item_id.is_none() => Err(TrackError::InvalidEvent(
                "shown event without an item_id".to_string(),
            )),
            RecordedEventType::Scroll if self.scroll.is_none() => Err(TrackError::InvalidEvent(
                "scroll event without scroll geometry".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Parse a newline-delimited JSON event log
pub fn parse_ndjson(input: &str) -> Result<Vec<RecordedEvent>, TrackError> {
    let mut events = Vec::new();
    for (line_no, line) in input.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let event: RecordedEvent = serde_json::from_str(trimmed).map_err(|e| {
            TrackError::ParseError(format!("line {}: {e}", line_no + 1))
        })?;
        events.push(event);
    }
    Ok(events)
}

/// Parse a JSON array event log
pub fn parse_array(input: &str) -> Result<Vec<RecordedEvent>, TrackError> {
    serde_json::from_str(input)
        .map_err(|e| TrackError::ParseError(format!("event array: {e}")))
}

/// Device source whose snapshot is swapped in as shown events arrive
#[derive(Clone, Default)]
struct ReplayDeviceSource(Arc<Mutex<Option<DeviceInfo>>>);

impl ReplayDeviceSource {
    fn set(&self, device: Option<DeviceInfo>) {
        *self.0.lock().unwrap_or_else(|e| e.into_inner()) = device;
    }
}

impl DeviceInfoSource for ReplayDeviceSource {
    fn collect(&self) -> DeviceInfo {
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .unwrap_or_else(DeviceInfo::unknown)
    }
}

/// Replay a recorded event log and return the report stream.
///
/// Events are sorted by timestamp first. The tick and flush timers are
/// synthesized from session start at the configured cadence; a timer due
/// at the same instant as an event fires before it, matching a live host
/// where the interval callback was already queued. A session still open
/// when the log ends is finalized, so the last report is always final
/// for a log with at least one shown event.
pub fn replay(
    events: &[RecordedEvent],
    config: TrackerConfig,
) -> Result<Vec<EngagementReport>, TrackError> {
    let mut ordered: Vec<RecordedEvent> = events.to_vec();
    ordered.sort_by_key(|e| e.timestamp);

    for event in &ordered {
        event.validate()?;
    }

    let Some(first) = ordered.first() else {
        return Ok(Vec::new());
    };

    let clock = ManualClock::starting_at(first.timestamp);
    let sink = MemorySink::new();
    let devices = ReplayDeviceSource::default();
    let mut timers = SyntheticTimers::new(&config);
    let mut tracker = EngagementTracker::new(
        config,
        Box::new(clock.clone()),
        Box::new(devices.clone()),
        Box::new(sink.clone()),
    );

    for event in &ordered {
        timers.run_until(&mut tracker, &clock, event.timestamp);
        clock.set(event.timestamp);

        match event.event_type {
            RecordedEventType::Shown => {
                devices.set(event.device.clone());
                // validate() guarantees the id is present
                let item_id = event.item_id.as_deref().unwrap_or_default();
                tracker.start(item_id);
                if tracker.is_tracking() {
                    timers.arm(event.timestamp);
                } else {
                    timers.disarm();
                }
            }
            RecordedEventType::Hidden => tracker.on_hidden(),
            RecordedEventType::Interaction => tracker.on_interaction(),
            RecordedEventType::Scroll => {
                if let Some(position) = event.scroll {
                    tracker.on_scroll(position);
                }
            }
            RecordedEventType::Unload => {
                tracker.stop();
                timers.disarm();
            }
        }
    }

    // Close a session the log never ended
    if tracker.is_tracking() {
        tracker.stop();
    }

    Ok(sink.reports())
}

/// Parse an NDJSON log and replay it in one step
pub fn replay_ndjson(input: &str, config: TrackerConfig) -> Result<Vec<EngagementReport>, TrackError> {
    let events = parse_ndjson(input)?;
    replay(&events, config)
}

/// The tick and flush timers, replayed at their recorded cadence
struct SyntheticTimers {
    next_tick: Option<DateTime<Utc>>,
    next_flush: Option<DateTime<Utc>>,
    tick_step: Duration,
    flush_step: Duration,
}

impl SyntheticTimers {
    fn new(config: &TrackerConfig) -> Self {
        Self {
            next_tick: None,
            next_flush: None,
            tick_step: Duration::milliseconds(config.tick_interval_ms as i64),
            flush_step: Duration::milliseconds(config.flush_interval_ms as i64),
        }
    }

    /// Arm both timers relative to a session start
    fn arm(&mut self, start: DateTime<Utc>) {
        self.next_tick = Some(start + self.tick_step);
        self.next_flush = Some(start + self.flush_step);
    }

    fn disarm(&mut self) {
        self.next_tick = None;
        self.next_flush = None;
    }

    /// Fire every timer due up to `until`, in deadline order.
    /// Ties between the two timers go to the tick.
    fn run_until(&mut self, tracker: &mut EngagementTracker, clock: &ManualClock, until: DateTime<Utc>) {
        loop {
            let tick_due = self.next_tick.filter(|t| *t <= until);
            let flush_due = self.next_flush.filter(|t| *t <= until);

            match (tick_due, flush_due) {
                (None, None) => break,
                (Some(at), None) => self.fire_tick(tracker, clock, at),
                (None, Some(at)) => self.fire_flush(tracker, clock, at),
                (Some(t), Some(f)) if t <= f => self.fire_tick(tracker, clock, t),
                (_, Some(f)) => self.fire_flush(tracker, clock, f),
            }
        }
    }

    fn fire_tick(&mut self, tracker: &mut EngagementTracker, clock: &ManualClock, at: DateTime<Utc>) {
        clock.set(at);
        tracker.on_tick();
        self.next_tick = Some(at + self.tick_step);
    }

    fn fire_flush(&mut self, tracker: &mut EngagementTracker, clock: &ManualClock, at: DateTime<Utc>) {
        clock.set(at);
        tracker.on_flush();
        self.next_flush = Some(at + self.flush_step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap()
    }

    fn shown(item: &str, at: DateTime<Utc>) -> RecordedEvent {
        RecordedEvent {
            timestamp: at,
            event_type: RecordedEventType::Shown,
            item_id: Some(item.to_string()),
            scroll: None,
            device: None,
        }
    }

    fn interaction(at: DateTime<Utc>) -> RecordedEvent {
        RecordedEvent {
            timestamp: at,
            event_type: RecordedEventType::Interaction,
            item_id: None,
            scroll: None,
            device: None,
        }
    }

    fn scroll(at: DateTime<Utc>, top: f64) -> RecordedEvent {
        RecordedEvent {
            timestamp: at,
            event_type: RecordedEventType::Scroll,
            item_id: None,
            scroll: Some(ScrollPosition {
                scroll_top: top,
                document_height: 2000.0,
                viewport_height: 1000.0,
            }),
            device: None,
        }
    }

    fn unload(at: DateTime<Utc>) -> RecordedEvent {
        RecordedEvent {
            timestamp: at,
            event_type: RecordedEventType::Unload,
            item_id: None,
            scroll: None,
            device: None,
        }
    }

    #[test]
    fn test_parse_ndjson() {
        let input = r#"
            {"timestamp":"2024-01-15T14:00:00Z","event_type":"shown","item_id":"p1"}

            {"timestamp":"2024-01-15T14:00:03Z","event_type":"interaction"}
            {"timestamp":"2024-01-15T14:00:05Z","event_type":"unload"}
        "#;
        let events = parse_ndjson(input).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].event_type, RecordedEventType::Shown);
        assert_eq!(events[0].item_id.as_deref(), Some("p1"));
    }

    #[test]
    fn test_parse_ndjson_reports_line_numbers() {
        let input = "{\"timestamp\":\"2024-01-15T14:00:00Z\",\"event_type\":\"shown\",\"item_id\":\"p1\"}\nnot json";
        let err = parse_ndjson(input).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_shown_requires_item_id() {
        let event = RecordedEvent {
            timestamp: t0(),
            event_type: RecordedEventType::Shown,
            item_id: None,
            scroll: None,
            device: None,
        };
        assert!(replay(&[event], TrackerConfig::default()).is_err());
    }

    #[test]
    fn test_scroll_requires_geometry() {
        let event = RecordedEvent {
            timestamp: t0(),
            event_type: RecordedEventType::Scroll,
            item_id: None,
            scroll: None,
            device: None,
        };
        assert!(replay(&[event], TrackerConfig::default()).is_err());
    }

    #[test]
    fn test_empty_log_produces_nothing() {
        let reports = replay(&[], TrackerConfig::default()).unwrap();
        assert!(reports.is_empty());
    }

    #[test]
    fn test_full_view_scenario() {
        let events = vec![
            shown("p1", t0()),
            interaction(t0() + Duration::milliseconds(1_500)),
            interaction(t0() + Duration::milliseconds(1_600)),
            interaction(t0() + Duration::milliseconds(1_700)),
            scroll(t0() + Duration::milliseconds(3_000), 500.0),
            unload(t0() + Duration::milliseconds(5_000)),
        ];

        let reports = replay(&events, TrackerConfig::default()).unwrap();

        // Initial report plus the final one; the first flush would only
        // have come at 10 s
        assert_eq!(reports.len(), 2);
        assert!(!reports[0].final_update);
        assert_eq!(reports[0].duration_ms, 0);

        let last = &reports[1];
        assert!(last.final_update);
        assert_eq!(last.duration_ms, 5_000);
        assert_eq!(last.interaction_count, 3);
        assert_eq!(last.scroll_depth, 50);
        assert_eq!(last.engagement_score, 3.1);
    }

    #[test]
    fn test_periodic_flushes_appear_in_stream() {
        let events = vec![
            shown("p1", t0()),
            unload(t0() + Duration::milliseconds(25_000)),
        ];

        let reports = replay(&events, TrackerConfig::default()).unwrap();

        // initial + flushes at 10 s and 20 s + final
        assert_eq!(reports.len(), 4);
        assert_eq!(reports[1].duration_ms, 10_000);
        assert_eq!(reports[2].duration_ms, 20_000);
        assert!(reports[3].final_update);
        assert_eq!(reports[3].duration_ms, 25_000);
    }

    #[test]
    fn test_idle_viewer_stops_accruing() {
        let config = TrackerConfig::default().with_idle_threshold_ms(5_000);
        let events = vec![
            shown("p1", t0()),
            unload(t0() + Duration::milliseconds(8_000)),
        ];

        let reports = replay(&events, config).unwrap();
        let last = reports.last().unwrap();

        // Ticks 1-4 credit; the tick at 5 s hits the idle deadline
        assert_eq!(last.duration_ms, 4_000);
    }

    #[test]
    fn test_item_switch_in_log() {
        let events = vec![
            shown("a", t0()),
            shown("b", t0() + Duration::milliseconds(2_000)),
            unload(t0() + Duration::milliseconds(3_000)),
        ];

        let reports = replay(&events, TrackerConfig::default()).unwrap();
        // initial(a), final(a), initial(b), final(b)
        assert_eq!(reports.len(), 4);

        assert!(reports[1].final_update);
        assert_eq!(reports[1].item_id, "a");
        assert_eq!(reports[1].duration_ms, 2_000);

        assert!(reports[3].final_update);
        assert_eq!(reports[3].item_id, "b");
        assert_eq!(reports[3].duration_ms, 1_000);
    }

    #[test]
    fn test_open_session_is_finalized_at_end_of_log() {
        let events = vec![
            shown("p1", t0()),
            interaction(t0() + Duration::milliseconds(500)),
        ];

        let reports = replay(&events, TrackerConfig::default()).unwrap();
        let last = reports.last().unwrap();
        assert!(last.final_update);
        assert_eq!(last.interaction_count, 1);
    }

    #[test]
    fn test_hidden_gap_is_not_credited() {
        let events = vec![
            shown("p1", t0()),
            RecordedEvent {
                timestamp: t0() + Duration::milliseconds(2_000),
                event_type: RecordedEventType::Hidden,
                item_id: None,
                scroll: None,
                device: None,
            },
            RecordedEvent {
                timestamp: t0() + Duration::milliseconds(4_000),
                event_type: RecordedEventType::Interaction,
                item_id: None,
                scroll: None,
                device: None,
            },
            unload(t0() + Duration::milliseconds(6_000)),
        ];

        // Hidden between 2 s and the end; interaction alone does not
        // restore visibility
        let reports = replay(&events, TrackerConfig::default()).unwrap();
        let last = reports.last().unwrap();
        assert_eq!(last.duration_ms, 2_000);
        assert_eq!(last.interaction_count, 1);
    }

    #[test]
    fn test_replay_ndjson_round_trip() {
        let events = vec![
            shown("p1", t0()),
            interaction(t0() + Duration::milliseconds(1_200)),
            unload(t0() + Duration::milliseconds(3_000)),
        ];
        let input: String = events
            .iter()
            .map(|e| serde_json::to_string(e).unwrap())
            .collect::<Vec<_>>()
            .join("\n");

        let reports = replay_ndjson(&input, TrackerConfig::default()).unwrap();
        let last = reports.last().unwrap();
        assert!(last.final_update);
        assert_eq!(last.duration_ms, 3_000);
        assert_eq!(last.interaction_count, 1);
    }
}
