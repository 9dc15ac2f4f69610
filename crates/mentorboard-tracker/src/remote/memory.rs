//! In-memory remote service
//!
//! Stores rosters, catalogs, snapshots and targets in process, echoes target
//! writes back on the next fetch, counts every call, and can inject failures
//! and latency.

use super::wire::{CatalogResponse, RosterResponse, SnapshotRecord};
use super::PerformanceRemote;
use async_trait::async_trait;
use dashmap::DashMap;
use mentorboard_common::{
    Agent, AgentId, MentorContext, MetricKind, Result, TargetEntry, TargetUpdate, TrackerError,
    Week, WeekKey,
};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Remote operation, without its key
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum RemoteOp {
    Roster,
    Catalog,
    Snapshot,
    TargetSet,
    TargetUpdate,
}

/// One remote call, keyed where the operation is keyed
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum RemoteCall {
    Roster,
    Catalog,
    Snapshot(WeekKey),
    TargetSet(WeekKey),
    TargetUpdate(WeekKey),
}

impl RemoteCall {
    pub fn op(&self) -> RemoteOp {
        match self {
            RemoteCall::Roster => RemoteOp::Roster,
            RemoteCall::Catalog => RemoteOp::Catalog,
            RemoteCall::Snapshot(_) => RemoteOp::Snapshot,
            RemoteCall::TargetSet(_) => RemoteOp::TargetSet,
            RemoteCall::TargetUpdate(_) => RemoteOp::TargetUpdate,
        }
    }
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    call: RemoteCall,
    error: TrackerError,
    /// Fires once when false
    persistent: bool,
}

/// In-process implementation of [`PerformanceRemote`]
#[derive(Default)]
pub struct InMemoryRemote {
    roster: RwLock<Vec<Agent>>,
    catalog: RwLock<CatalogResponse>,
    snapshots: DashMap<WeekKey, SnapshotRecord>,
    targets: DashMap<WeekKey, Vec<TargetEntry>>,
    latency: RwLock<Duration>,
    calls: DashMap<RemoteCall, usize>,
    failures: Mutex<Vec<InjectedFailure>>,
    updates: Mutex<Vec<TargetUpdate>>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a remote pre-loaded with fixture data
    pub fn from_fixture(fixture: Fixture) -> Self {
        let remote = Self::new();
        remote.set_roster(fixture.roster);
        remote.set_catalog(fixture.catalog);
        for entry in fixture.snapshots {
            remote.set_snapshot(WeekKey::new(entry.agent_id, entry.week), entry.record);
        }
        for entry in fixture.targets {
            remote.set_targets(WeekKey::new(entry.agent_id, entry.week), entry.entries);
        }
        remote
    }

    /// Simulated round-trip latency applied to every call
    pub fn with_latency(self, latency: Duration) -> Self {
        *self.latency.write() = latency;
        self
    }

    pub fn set_roster(&self, agents: Vec<Agent>) {
        *self.roster.write() = agents;
    }

    pub fn set_catalog(&self, catalog: CatalogResponse) {
        *self.catalog.write() = catalog;
    }

    pub fn set_snapshot(&self, key: WeekKey, record: SnapshotRecord) {
        self.snapshots.insert(key, record);
    }

    pub fn set_targets(&self, key: WeekKey, entries: Vec<TargetEntry>) {
        self.targets.insert(key, entries);
    }

    /// Make the next matching call fail once
    pub fn fail_next(&self, call: RemoteCall, error: TrackerError) {
        self.failures.lock().push(InjectedFailure {
            call,
            error,
            persistent: false,
        });
    }

    /// Make every matching call fail until [`clear_failures`](Self::clear_failures)
    pub fn fail_always(&self, call: RemoteCall, error: TrackerError) {
        self.failures.lock().push(InjectedFailure {
            call,
            error,
            persistent: true,
        });
    }

    pub fn clear_failures(&self) {
        self.failures.lock().clear();
    }

    /// Calls made for one exact call
    pub fn calls(&self, call: RemoteCall) -> usize {
        self.calls.get(&call).map(|c| *c).unwrap_or(0)
    }

    /// Calls made for an operation across all keys
    pub fn total_calls(&self, op: RemoteOp) -> usize {
        self.calls
            .iter()
            .filter(|entry| entry.key().op() == op)
            .map(|entry| *entry.value())
            .sum()
    }

    /// Every accepted target write, oldest first
    pub fn submitted_updates(&self) -> Vec<TargetUpdate> {
        self.updates.lock().clone()
    }

    async fn enter(&self, call: RemoteCall) -> Result<()> {
        *self.calls.entry(call).or_insert(0) += 1;

        let latency = *self.latency.read();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut failures = self.failures.lock();
        if let Some(index) = failures.iter().position(|f| f.call == call) {
            let failure = if failures[index].persistent {
                failures[index].clone()
            } else {
                failures.remove(index)
            };
            debug!(?call, error = %failure.error, "Injected failure");
            return Err(failure.error);
        }
        Ok(())
    }
}

#[async_trait]
impl PerformanceRemote for InMemoryRemote {
    #[instrument(skip(self, mentor), fields(mentor = mentor.mentor_id))]
    async fn fetch_roster(&self, mentor: &MentorContext) -> Result<RosterResponse> {
        self.enter(RemoteCall::Roster).await?;
        Ok(RosterResponse {
            agents: self.roster.read().clone(),
        })
    }

    #[instrument(skip(self))]
    async fn fetch_catalog(&self) -> Result<CatalogResponse> {
        self.enter(RemoteCall::Catalog).await?;
        Ok(self.catalog.read().clone())
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn fetch_snapshot(&self, key: WeekKey) -> Result<SnapshotRecord> {
        self.enter(RemoteCall::Snapshot(key)).await?;
        Ok(self
            .snapshots
            .get(&key)
            .map(|record| record.clone())
            .unwrap_or_default())
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn fetch_target_set(&self, key: WeekKey) -> Result<Vec<TargetEntry>> {
        self.enter(RemoteCall::TargetSet(key)).await?;
        Ok(self
            .targets
            .get(&key)
            .map(|entries| entries.clone())
            .unwrap_or_default())
    }

    #[instrument(skip(self, update), fields(agent = %update.agent_id, week = %update.week))]
    async fn submit_target_update(&self, update: TargetUpdate) -> Result<()> {
        let key = WeekKey::new(update.agent_id, update.week);
        self.enter(RemoteCall::TargetUpdate(key)).await?;

        if update.kind.position_of(update.metric_id).is_none() {
            return Err(TrackerError::Rejected(format!(
                "unknown {} id {}",
                update.kind, update.metric_id
            )));
        }

        {
            let mut entries = self.targets.entry(key).or_default();
            match entries
                .iter_mut()
                .find(|e| e.kind == update.kind && e.metric_id == update.metric_id)
            {
                Some(existing) => existing.target = update.target,
                None => entries.push(TargetEntry {
                    kind: update.kind,
                    metric_id: update.metric_id,
                    target: update.target,
                }),
            }
        }
        self.updates.lock().push(update);
        Ok(())
    }
}

/// Snapshot for one (agent, week) inside a fixture
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureSnapshot {
    pub agent_id: AgentId,
    pub week: Week,
    #[serde(flatten)]
    pub record: SnapshotRecord,
}

/// Targets for one (agent, week) inside a fixture
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureTargets {
    pub agent_id: AgentId,
    pub week: Week,
    pub entries: Vec<TargetEntry>,
}

/// Seed data for an [`InMemoryRemote`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fixture {
    pub roster: Vec<Agent>,
    pub catalog: CatalogResponse,
    #[serde(default)]
    pub snapshots: Vec<FixtureSnapshot>,
    #[serde(default)]
    pub targets: Vec<FixtureTargets>,
}

impl Fixture {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Small built-in data set: three agents, week 1 populated
    pub fn sample() -> Self {
        use super::wire::{CountRecord, SkillsetRecord};
        use chrono::NaiveDate;

        let agent = |id: u64, name: &str, generation: u32, rank: &str, probation: bool, day: u32| Agent {
            id: AgentId(id),
            name: name.to_string(),
            generation,
            rank: rank.to_string(),
            on_probation: probation,
            started_on: NaiveDate::from_ymd_opt(2026, 1, day).unwrap_or_default(),
            property_category: "residential".to_string(),
        };

        let roster = vec![
            agent(101, "Ana Reyes", 4, "Associate", true, 5),
            agent(102, "Ben Okafor", 3, "Senior Associate", false, 12),
            agent(103, "Chen Wei", 4, "Associate", true, 19),
        ];

        let catalog = CatalogResponse {
            actions: vec!["Calls".into(), "Site visits".into(), "Closings".into()],
            skillsets: vec!["Negotiation".into(), "Product knowledge".into()],
            requirements: vec!["Compliance training".into(), "Listing paperwork".into()],
        };

        let week = Week::FIRST;
        let snapshots = roster
            .iter()
            .enumerate()
            .map(|(i, a)| FixtureSnapshot {
                agent_id: a.id,
                week,
                record: SnapshotRecord {
                    actions: vec![
                        CountRecord { metric_id: 1, count: 10 + i as u32 * 5 },
                        CountRecord { metric_id: 2, count: 2 + i as u32 },
                    ],
                    skillsets: vec![SkillsetRecord {
                        metric_id: 8,
                        sub_scores: [60 + i as u32 * 10, 65, 70],
                    }],
                    requirements: vec![CountRecord { metric_id: 1, count: 1 }],
                },
            })
            .collect();

        let targets = roster
            .iter()
            .map(|a| FixtureTargets {
                agent_id: a.id,
                week,
                entries: vec![
                    TargetEntry { kind: MetricKind::Action, metric_id: 1, target: 15 },
                    TargetEntry { kind: MetricKind::Skillset, metric_id: 8, target: 70 },
                    TargetEntry { kind: MetricKind::Requirement, metric_id: 1, target: 1 },
                ],
            })
            .collect();

        Self {
            roster,
            catalog,
            snapshots,
            targets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(agent: u64, week: u8) -> WeekKey {
        WeekKey::new(AgentId(agent), Week::new(week).unwrap())
    }

    #[tokio::test]
    async fn test_writes_are_echoed() {
        let remote = InMemoryRemote::new();
        let update = TargetUpdate {
            mentor_id: 1,
            agent_id: AgentId(7),
            week: Week::new(3).unwrap(),
            kind: MetricKind::Skillset,
            metric_id: 9,
            target: 80,
        };
        remote.submit_target_update(update.clone()).await.unwrap();
        remote
            .submit_target_update(TargetUpdate { target: 85, ..update })
            .await
            .unwrap();

        let entries = remote.fetch_target_set(key(7, 3)).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].target, 85);
        assert_eq!(remote.submitted_updates().len(), 2);
    }

    #[tokio::test]
    async fn test_one_shot_and_persistent_failures() {
        let remote = InMemoryRemote::new();
        remote.fail_next(RemoteCall::Snapshot(key(1, 1)), TrackerError::RateLimited);
        assert_eq!(
            remote.fetch_snapshot(key(1, 1)).await,
            Err(TrackerError::RateLimited)
        );
        assert!(remote.fetch_snapshot(key(1, 1)).await.is_ok());

        remote.fail_always(RemoteCall::Catalog, TrackerError::Network("down".into()));
        assert!(remote.fetch_catalog().await.is_err());
        assert!(remote.fetch_catalog().await.is_err());
        remote.clear_failures();
        assert!(remote.fetch_catalog().await.is_ok());

        assert_eq!(remote.calls(RemoteCall::Snapshot(key(1, 1))), 2);
        assert_eq!(remote.total_calls(RemoteOp::Catalog), 3);
    }

    #[tokio::test]
    async fn test_rejects_id_below_offset() {
        let remote = InMemoryRemote::new();
        let result = remote
            .submit_target_update(TargetUpdate {
                mentor_id: 1,
                agent_id: AgentId(7),
                week: Week::FIRST,
                kind: MetricKind::Skillset,
                metric_id: 2,
                target: 10,
            })
            .await;
        assert!(matches!(result, Err(TrackerError::Rejected(_))));
    }

    #[test]
    fn test_fixture_json_round_trip() {
        let json = serde_json::to_string(&Fixture::sample()).unwrap();
        let fixture = Fixture::from_json(&json).unwrap();
        assert_eq!(fixture.roster.len(), 3);
        assert_eq!(fixture.snapshots[1].record.actions[0].count, 15);
    }
}
