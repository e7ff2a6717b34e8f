//! Viewpulse - client-side view engagement measurement engine
//!
//! Viewpulse measures how long and how actively a viewer inspects a
//! displayed item: active time is credited second by second while the
//! item is visible and the viewer is not idle, interactions and scroll
//! depth accumulate alongside, and a bounded 0–10 engagement score is
//! reported to an injected sink at session start, on a periodic flush,
//! and when the session ends.
//!
//! ## Modules
//!
//! - **tracker**: the engagement state machine, deterministic and
//!   caller-ticked
//! - **runtime**: tokio timer ownership around a tracker, for hosts that
//!   want live ticking
//! - **replay**: offline re-processing of recorded event logs
//! - **device**, **score**, **session**, **report**: the data model
//!   around a view session

pub mod clock;
pub mod config;
pub mod device;
pub mod error;
pub mod replay;
pub mod report;
pub mod runtime;
pub mod score;
pub mod session;
pub mod tracker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::TrackerConfig;
pub use device::{DeviceClass, DeviceInfo, DeviceInfoSource, EnvironmentSnapshot, StaticDeviceSource};
pub use error::TrackError;
pub use replay::{replay, replay_ndjson, RecordedEvent, RecordedEventType};
pub use report::{EngagementReport, FnSink, MemorySink, ReportSink};
pub use runtime::{spawn_sink, ChannelSink, TrackerRuntime};
pub use score::{engagement_score, EngagementScore};
pub use session::{scroll_depth_percent, ScrollPosition, ViewSession};
pub use tracker::{EngagementTracker, TrackerStats};

/// Viewpulse version embedded in CLI output
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for log lines and CLI output
pub const PRODUCER_NAME: &str = "viewpulse";
