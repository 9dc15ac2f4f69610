//! # Mentorboard Common
//!
//! Shared types and errors for the Mentorboard performance tracker.
//!
//! ## Core Types
//!
//! - [`WeekKey`]: (agent, week) pair, the primary cache key
//! - [`Catalog`]: static action / skillset / requirement definitions
//! - [`Snapshot`]: observed progress for one WeekKey
//! - [`TargetSet`]: mentor-set targets for one WeekKey
//! - [`MetricKind`]: metric family and its identifier offset

pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{Result, TrackerError};
pub use types::{
    agent::{Agent, MentorContext},
    metric::{Catalog, CatalogEntry, MetricId, MetricKind},
    snapshot::{CountProgress, SkillsetProgress, Snapshot, MAX_SKILLSET_SCORE},
    target::{TargetEntry, TargetSet, TargetUpdate},
    week_key::{AgentId, Week, WeekKey},
};

/// Mentorboard version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of weeks in a programme
pub const WEEKS_PER_PROGRAMME: u8 = 12;
