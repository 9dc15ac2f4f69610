//! Session caches
//!
//! - [`CatalogCache`]: metric definitions, loaded once
//! - [`RosterCache`]: the mentor's agents, plus the shared [`WeekSelection`]
//! - [`SnapshotCache`]: observed progress per WeekKey, staggered warm-up
//! - [`TargetCache`]: mutable targets per WeekKey, invalidated on write
//! - [`CommentStore`]: session-local mentor notes

pub mod catalog;
pub mod comment;
mod keyed;
pub mod roster;
pub mod selection;
pub mod snapshot;
pub mod target;

pub use catalog::CatalogCache;
pub use comment::CommentStore;
pub use roster::RosterCache;
pub use selection::WeekSelection;
pub use snapshot::SnapshotCache;
pub use target::TargetCache;

use mentorboard_common::TrackerError;
use serde::Serialize;

/// Load state of one cache key
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "error", rename_all = "snake_case")]
pub enum LoadState {
    /// Never fetched, or invalidated
    #[default]
    Idle,
    Loading,
    Loaded,
    /// Last fetch failed; any previously committed value is kept
    #[serde(serialize_with = "serialize_error")]
    Failed(TrackerError),
}

impl LoadState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn error(&self) -> Option<&TrackerError> {
        match self {
            LoadState::Failed(err) => Some(err),
            _ => None,
        }
    }
}

fn serialize_error<S: serde::Serializer>(err: &TrackerError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(err)
}
