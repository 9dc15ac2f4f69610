//! Weekly progress: completion = target > 0 && observed >= target
//!
//! Pure and synchronous. Every input is optional because the snapshot and
//! target fetches for a WeekKey resolve in no particular order; missing
//! data yields zero and incomplete, never an error.

use mentorboard_common::{
    Agent, AgentId, Catalog, MetricId, MetricKind, Snapshot, TargetSet, Week, WeekKey,
};
use serde::Serialize;

/// One catalog metric for one WeekKey
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricProgress {
    pub kind: MetricKind,
    pub position: usize,
    pub metric_id: MetricId,
    pub name: String,
    pub observed: u32,
    pub target: u32,
    pub complete: bool,
    /// Score as shown to the user; skillsets only
    pub display_percentage: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryProgress {
    pub kind: MetricKind,
    pub complete: usize,
    pub total: usize,
    /// complete / total; 0 when the category is empty or the snapshot absent
    pub ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyProgress {
    pub key: WeekKey,
    pub has_snapshot: bool,
    pub has_targets: bool,
    pub metrics: Vec<MetricProgress>,
    /// Action, Skillset, Requirement
    pub categories: [CategoryProgress; 3],
    /// round(100 × unweighted mean of the category ratios)
    pub percentage: u32,
}

impl WeeklyProgress {
    pub fn category(&self, kind: MetricKind) -> &CategoryProgress {
        match kind {
            MetricKind::Action => &self.categories[0],
            MetricKind::Skillset => &self.categories[1],
            MetricKind::Requirement => &self.categories[2],
        }
    }

    pub fn metric(&self, kind: MetricKind, position: usize) -> Option<&MetricProgress> {
        self.metrics
            .iter()
            .find(|m| m.kind == kind && m.position == position)
    }
}

/// Summary of the loaded weeks for one agent row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentOverview {
    pub agent_id: AgentId,
    pub name: String,
    pub weeks_loaded: usize,
    pub mean_percentage: u32,
    pub best_week: Option<Week>,
}

pub struct ProgressCalculator;

impl ProgressCalculator {
    pub fn evaluate(
        key: WeekKey,
        catalog: Option<&Catalog>,
        snapshot: Option<&Snapshot>,
        targets: Option<&TargetSet>,
    ) -> WeeklyProgress {
        let mut metrics = Vec::new();
        let categories = MetricKind::ALL.map(|kind| {
            let entries = catalog.map(|c| c.entries(kind)).unwrap_or_default();
            let mut complete = 0;

            for entry in entries {
                let metric_id = entry.metric_id();
                let observed = snapshot.map(|s| s.observed(kind, metric_id)).unwrap_or(0);
                let target = targets.map(|t| t.target(kind, metric_id)).unwrap_or(0);
                let done = Self::is_complete(observed, target);
                if done {
                    complete += 1;
                }
                metrics.push(MetricProgress {
                    kind,
                    position: entry.position,
                    metric_id,
                    name: entry.name.clone(),
                    observed,
                    target,
                    complete: done,
                    display_percentage: (kind == MetricKind::Skillset)
                        .then(|| Self::skillset_display_percentage(observed)),
                });
            }

            let total = entries.len();
            let ratio = if total == 0 || snapshot.is_none() {
                0.0
            } else {
                complete as f64 / total as f64
            };
            CategoryProgress {
                kind,
                complete,
                total,
                ratio,
            }
        });

        let mean = categories.iter().map(|c| c.ratio).sum::<f64>() / categories.len() as f64;

        WeeklyProgress {
            key,
            has_snapshot: snapshot.is_some(),
            has_targets: targets.is_some(),
            metrics,
            percentage: (mean * 100.0).round() as u32,
            categories,
        }
    }

    /// A metric without a target never counts as complete
    pub fn is_complete(observed: u32, target: u32) -> bool {
        target > 0 && observed >= target
    }

    /// Skillset scores are stored on the 0-100 scale users see
    pub fn skillset_display_percentage(score: u32) -> u32 {
        score
    }

    pub fn format_percentage(percentage: u32) -> String {
        format!("{}%", percentage)
    }

    /// Mean and best of the weeks that have a snapshot loaded
    pub fn agent_overview(agent: &Agent, weeks: &[WeeklyProgress]) -> AgentOverview {
        let loaded: Vec<&WeeklyProgress> = weeks
            .iter()
            .filter(|w| w.key.agent_id == agent.id && w.has_snapshot)
            .collect();

        let mean_percentage = if loaded.is_empty() {
            0
        } else {
            let sum: u32 = loaded.iter().map(|w| w.percentage).sum();
            (sum as f64 / loaded.len() as f64).round() as u32
        };

        // Earliest week wins a tie
        let best_week = loaded
            .iter()
            .max_by(|a, b| {
                a.percentage
                    .cmp(&b.percentage)
                    .then_with(|| b.key.week.cmp(&a.key.week))
            })
            .map(|w| w.key.week);

        AgentOverview {
            agent_id: agent.id,
            name: agent.name.clone(),
            weeks_loaded: loaded.len(),
            mean_percentage,
            best_week,
        }
    }
}
