//! Mutable weekly targets

use super::metric::{MetricId, MetricKind};
use super::week_key::{AgentId, Week};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One target triple as stored remotely
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetEntry {
    pub kind: MetricKind,
    /// Absolute remote id
    pub metric_id: MetricId,
    pub target: u32,
}

/// Targets for one WeekKey, indexed by (kind, absolute id)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetSet {
    targets: HashMap<(MetricKind, MetricId), u32>,
}

impl TargetSet {
    /// Build from remote entries; a later duplicate overrides an earlier one
    pub fn from_entries(entries: impl IntoIterator<Item = TargetEntry>) -> Self {
        let targets = entries
            .into_iter()
            .map(|e| ((e.kind, e.metric_id), e.target))
            .collect();
        Self { targets }
    }

    /// Target for a remote id, 0 when unset
    pub fn target(&self, kind: MetricKind, metric_id: MetricId) -> u32 {
        self.targets.get(&(kind, metric_id)).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Entries sorted by kind then id
    pub fn entries(&self) -> Vec<TargetEntry> {
        let mut entries: Vec<TargetEntry> = self
            .targets
            .iter()
            .map(|((kind, metric_id), target)| TargetEntry {
                kind: *kind,
                metric_id: *metric_id,
                target: *target,
            })
            .collect();
        entries.sort_by_key(|e| (e.kind, e.metric_id));
        entries
    }
}

/// Target mutation payload sent to the remote service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetUpdate {
    pub mentor_id: u64,
    pub agent_id: AgentId,
    pub week: Week,
    pub kind: MetricKind,
    /// Absolute remote id, never a catalog position
    pub metric_id: MetricId,
    pub target: u32,
}
