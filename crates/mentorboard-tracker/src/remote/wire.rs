//! Wire records exchanged with the remote data service
//!
//! Responses are converted into domain types at the cache boundary; a
//! record that fails conversion counts as a failed fetch.

use mentorboard_common::{
    Agent, Catalog, CountProgress, MetricId, MetricKind, Result, SkillsetProgress, Snapshot,
    TargetEntry, TargetSet, TrackerError,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterResponse {
    pub agents: Vec<Agent>,
}

/// Metric names per family, in catalog order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogResponse {
    pub actions: Vec<String>,
    pub skillsets: Vec<String>,
    pub requirements: Vec<String>,
}

impl CatalogResponse {
    pub fn into_catalog(self) -> Result<Catalog> {
        for (kind, names) in [
            (MetricKind::Action, &self.actions),
            (MetricKind::Skillset, &self.skillsets),
            (MetricKind::Requirement, &self.requirements),
        ] {
            if names.iter().any(|name| name.trim().is_empty()) {
                return Err(TrackerError::Malformed(format!(
                    "{} catalog contains an unnamed metric",
                    kind
                )));
            }
        }
        Ok(Catalog::from_names(
            self.actions,
            self.skillsets,
            self.requirements,
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRecord {
    pub metric_id: MetricId,
    pub count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillsetRecord {
    pub metric_id: MetricId,
    /// Three assessed sub-scores, each 0-100
    pub sub_scores: [u32; 3],
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    #[serde(default)]
    pub actions: Vec<CountRecord>,
    #[serde(default)]
    pub skillsets: Vec<SkillsetRecord>,
    #[serde(default)]
    pub requirements: Vec<CountRecord>,
}

impl SnapshotRecord {
    pub fn into_snapshot(self) -> Result<Snapshot> {
        let counts = |kind: MetricKind, records: Vec<CountRecord>| -> Result<Vec<CountProgress>> {
            records
                .into_iter()
                .map(|r| {
                    check_metric_id(kind, r.metric_id)?;
                    Ok(CountProgress {
                        metric_id: r.metric_id,
                        count: r.count,
                    })
                })
                .collect()
        };

        let skillsets = self
            .skillsets
            .into_iter()
            .map(|r| {
                check_metric_id(MetricKind::Skillset, r.metric_id)?;
                SkillsetProgress::from_sub_scores(r.metric_id, r.sub_scores)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Snapshot {
            actions: counts(MetricKind::Action, self.actions)?,
            skillsets,
            requirements: counts(MetricKind::Requirement, self.requirements)?,
        })
    }
}

/// Convert remote target records, rejecting ids no catalog position maps to
pub fn into_target_set(records: Vec<TargetEntry>) -> Result<TargetSet> {
    for record in &records {
        check_metric_id(record.kind, record.metric_id)?;
    }
    Ok(TargetSet::from_entries(records))
}

fn check_metric_id(kind: MetricKind, metric_id: MetricId) -> Result<()> {
    match kind.position_of(metric_id) {
        Some(_) => Ok(()),
        None => Err(TrackerError::Malformed(format!(
            "{} id {} is below the id offset {}",
            kind,
            metric_id,
            kind.id_offset()
        ))),
    }
}
