//! Remote data service boundary
//!
//! The tracker never talks to the network directly; every fetch and write
//! goes through [`PerformanceRemote`]. [`InMemoryRemote`] is the in-process
//! implementation used by tests and the demo binary.

pub mod memory;
pub mod wire;

use async_trait::async_trait;
use mentorboard_common::{MentorContext, Result, TargetEntry, TargetUpdate, WeekKey};

pub use memory::{Fixture, InMemoryRemote, RemoteCall, RemoteOp};
pub use wire::{CatalogResponse, CountRecord, RosterResponse, SkillsetRecord, SnapshotRecord};

/// Remote collaborator queried for rosters, catalogs, snapshots and targets.
///
/// Any call may fail with [`mentorboard_common::TrackerError::RateLimited`].
#[async_trait]
pub trait PerformanceRemote: Send + Sync {
    /// Agents assigned to the mentor
    async fn fetch_roster(&self, mentor: &MentorContext) -> Result<RosterResponse>;

    /// Static metric definitions
    async fn fetch_catalog(&self) -> Result<CatalogResponse>;

    /// Observed progress for one (agent, week)
    async fn fetch_snapshot(&self, key: WeekKey) -> Result<SnapshotRecord>;

    /// Targets for one (agent, week)
    async fn fetch_target_set(&self, key: WeekKey) -> Result<Vec<TargetEntry>>;

    /// Write one target
    async fn submit_target_update(&self, update: TargetUpdate) -> Result<()>;
}
