//! # Mentorboard Tracker
//!
//! Performance-tracking aggregation engine behind the mentor dashboard.
//!
//! A mentor reviews a roster of sales agents week by week. For every
//! (agent, week) pair the tracker fetches observed progress and the
//! mentor's targets from a remote service, caches them for the session,
//! and derives completion statistics from whatever is cached.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                     ViewCoordinator                       │
//! │   expand / select week / edit target / refresh / teardown │
//! │        │ debounce slots, stagger     │ CancelToken        │
//! │  ┌─────┴──────────────────────────────┴─────┐             │
//! │  │                 Scheduler                 │             │
//! │  └─────┬──────────────┬──────────────┬──────┘             │
//! │  ┌─────┴─────┐  ┌─────┴─────┐  ┌─────┴─────┐  ┌────────┐  │
//! │  │  Roster   │  │ Snapshot  │  │  Target   │  │Catalog │  │
//! │  │  Cache    │  │  Cache    │  │  Cache    │  │ Cache  │  │
//! │  └─────┬─────┘  └─────┬─────┘  └─────┬─────┘  └───┬────┘  │
//! │        └──────── SingleFlight per key ────────────┘       │
//! │                         │                                 │
//! │               PerformanceRemote (async)                   │
//! └───────────────────────────────────────────────────────────┘
//!        ProgressCalculator reads the caches, never the remote
//! ```

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod notice;
pub mod progress;
pub mod remote;
pub mod scheduler;
pub mod single_flight;

// Re-export core types
pub use cache::{CatalogCache, CommentStore, LoadState, RosterCache, SnapshotCache, TargetCache};
pub use config::{TimingSettings, TrackerConfig};
pub use coordinator::{TargetEditor, ViewCoordinator};
pub use notice::{Notice, NoticeBoard, NoticeLevel};
pub use progress::{AgentOverview, CategoryProgress, MetricProgress, ProgressCalculator, WeeklyProgress};
pub use remote::{Fixture, InMemoryRemote, PerformanceRemote};
pub use scheduler::{CancelToken, Scheduler, TaskId};

/// Tracker version
pub const TRACKER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Spacing between staggered snapshot requests (ms)
pub const DEFAULT_STAGGER_MS: u64 = 800;

/// Row expansion debounce (ms)
pub const DEFAULT_EXPAND_DEBOUNCE_MS: u64 = 300;

/// Delay before a week change on an expanded row fetches (ms)
pub const DEFAULT_WEEK_CHANGE_DELAY_MS: u64 = 500;
