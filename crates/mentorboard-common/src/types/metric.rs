//! Metric families, the static catalog, and the identifier offset convention
//!
//! The catalog addresses a metric by its zero-based position within its
//! family's list. The remote service addresses the same metric by an
//! absolute id:
//!
//! ```text
//! Action       id = position + 1
//! Requirement  id = position + 1
//! Skillset     id = position + 8
//! ```
//!
//! [`MetricKind::absolute_id`] and [`MetricKind::position_of`] are the only
//! places this offset is applied or undone.

use crate::error::{Result, TrackerError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Remote absolute metric id
pub type MetricId = u32;

/// Metric family
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Countable action KPIs (calls, visits, ...)
    Action,
    /// Skill assessments scored 0-100
    Skillset,
    /// Completion requirements (trainings, paperwork, ...)
    Requirement,
}

impl MetricKind {
    /// All families, in display order
    pub const ALL: [MetricKind; 3] = [
        MetricKind::Action,
        MetricKind::Skillset,
        MetricKind::Requirement,
    ];

    /// Offset between catalog position and remote absolute id
    pub const fn id_offset(self) -> u32 {
        match self {
            MetricKind::Action => 1,
            MetricKind::Skillset => 8,
            MetricKind::Requirement => 1,
        }
    }

    /// Remote id for a catalog position, `None` when the id would not fit
    pub fn absolute_id(self, position: usize) -> Option<MetricId> {
        MetricId::try_from(position)
            .ok()?
            .checked_add(self.id_offset())
    }

    /// Like [`absolute_id`](Self::absolute_id), as an `InvalidPosition` error
    pub fn checked_id(self, position: usize) -> Result<MetricId> {
        self.absolute_id(position)
            .ok_or(TrackerError::InvalidPosition { kind: self, position })
    }

    /// Catalog position for a remote id, `None` if the id lies below the offset
    pub fn position_of(self, metric_id: MetricId) -> Option<usize> {
        metric_id
            .checked_sub(self.id_offset())
            .and_then(|position| usize::try_from(position).ok())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Action => "action",
            MetricKind::Skillset => "skillset",
            MetricKind::Requirement => "requirement",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One known metric
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub kind: MetricKind,
    pub name: String,
    /// Zero-based position within the family's list
    pub position: usize,
    /// Remote id, fixed when the catalog is built
    pub metric_id: MetricId,
}

impl CatalogEntry {
    /// Remote id of this entry
    pub fn metric_id(&self) -> MetricId {
        self.metric_id
    }
}

/// Static list of known metrics, loaded once per session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    actions: Vec<CatalogEntry>,
    skillsets: Vec<CatalogEntry>,
    requirements: Vec<CatalogEntry>,
}

impl Catalog {
    /// Build a catalog from metric names; positions follow list order
    pub fn from_names<A, S, R>(actions: A, skillsets: S, requirements: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            actions: Self::entries_for(MetricKind::Action, actions),
            skillsets: Self::entries_for(MetricKind::Skillset, skillsets),
            requirements: Self::entries_for(MetricKind::Requirement, requirements),
        }
    }

    fn entries_for<I>(kind: MetricKind, names: I) -> Vec<CatalogEntry>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        names
            .into_iter()
            .enumerate()
            .map_while(|(position, name)| {
                Some(CatalogEntry {
                    kind,
                    name: name.into(),
                    position,
                    metric_id: kind.absolute_id(position)?,
                })
            })
            .collect()
    }

    pub fn entries(&self, kind: MetricKind) -> &[CatalogEntry] {
        match kind {
            MetricKind::Action => &self.actions,
            MetricKind::Skillset => &self.skillsets,
            MetricKind::Requirement => &self.requirements,
        }
    }

    pub fn len(&self, kind: MetricKind) -> usize {
        self.entries(kind).len()
    }

    pub fn is_empty(&self) -> bool {
        MetricKind::ALL.iter().all(|kind| self.len(*kind) == 0)
    }

    pub fn entry(&self, kind: MetricKind, position: usize) -> Option<&CatalogEntry> {
        self.entries(kind).get(position)
    }

    /// Look up an entry by remote id
    pub fn entry_by_id(&self, kind: MetricKind, metric_id: MetricId) -> Option<&CatalogEntry> {
        kind.position_of(metric_id)
            .and_then(|position| self.entry(kind, position))
    }

    /// Ensure a position exists in the family's list
    pub fn check_position(&self, kind: MetricKind, position: usize) -> Result<&CatalogEntry> {
        self.entry(kind, position)
            .ok_or(TrackerError::InvalidPosition { kind, position })
    }
}
