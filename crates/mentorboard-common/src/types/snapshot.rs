//! Remote progress snapshots for one (agent, week)

use super::metric::{MetricId, MetricKind};
use crate::error::{Result, TrackerError};
use serde::{Deserialize, Serialize};

/// Highest valid skillset score
pub const MAX_SKILLSET_SCORE: u32 = 100;

/// Observed count for an action or requirement metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountProgress {
    pub metric_id: MetricId,
    pub count: u32,
}

/// Observed score for a skillset metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillsetProgress {
    pub metric_id: MetricId,
    /// 0-100, rounded mean of three sub-scores
    pub total_score: u32,
}

impl SkillsetProgress {
    /// Derive the total score from the three assessed sub-scores
    pub fn from_sub_scores(metric_id: MetricId, sub_scores: [u32; 3]) -> Result<Self> {
        if let Some(bad) = sub_scores.iter().find(|s| **s > MAX_SKILLSET_SCORE) {
            return Err(TrackerError::Malformed(format!(
                "skillset {} sub-score {} exceeds {}",
                metric_id, bad, MAX_SKILLSET_SCORE
            )));
        }
        let sum: u32 = sub_scores.iter().sum();
        let total_score = (f64::from(sum) / 3.0).round() as u32;
        Ok(Self {
            metric_id,
            total_score,
        })
    }
}

/// Progress for one WeekKey. Immutable once fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub actions: Vec<CountProgress>,
    pub skillsets: Vec<SkillsetProgress>,
    pub requirements: Vec<CountProgress>,
}

impl Snapshot {
    /// Observed count or score for a remote id, 0 when the metric is not reported
    pub fn observed(&self, kind: MetricKind, metric_id: MetricId) -> u32 {
        match kind {
            MetricKind::Action => Self::count_of(&self.actions, metric_id),
            MetricKind::Requirement => Self::count_of(&self.requirements, metric_id),
            MetricKind::Skillset => self
                .skillsets
                .iter()
                .find(|s| s.metric_id == metric_id)
                .map(|s| s.total_score)
                .unwrap_or(0),
        }
    }

    fn count_of(entries: &[CountProgress], metric_id: MetricId) -> u32 {
        entries
            .iter()
            .find(|e| e.metric_id == metric_id)
            .map(|e| e.count)
            .unwrap_or(0)
    }
}
