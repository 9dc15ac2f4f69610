//! Target editor state

use mentorboard_common::{MetricKind, Result, TrackerError, WeekKey};

/// Editor for one WeekKey's targets.
///
/// A focused metric plus a draft value make a complete write. After a
/// failed save the editor stays open carrying the error so the user can
/// retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetEditor {
    pub key: WeekKey,
    /// (kind, catalog position) the draft applies to
    pub focus: Option<(MetricKind, usize)>,
    pub draft: Option<u32>,
    pub last_error: Option<TrackerError>,
}

impl TargetEditor {
    pub fn new(key: WeekKey) -> Self {
        Self {
            key,
            focus: None,
            draft: None,
            last_error: None,
        }
    }

    /// Focus a metric and pre-fill the draft with its current target
    pub fn focus(&mut self, kind: MetricKind, position: usize, current: u32) {
        self.focus = Some((kind, position));
        self.draft = Some(current);
        self.last_error = None;
    }

    pub fn set_draft(&mut self, value: u32) {
        self.draft = Some(value);
    }

    /// The write this editor would submit
    pub fn pending_write(&self) -> Result<(MetricKind, usize, u32)> {
        let (kind, position) = self
            .focus
            .ok_or_else(|| TrackerError::NotReady("no metric selected".into()))?;
        let draft = self
            .draft
            .ok_or_else(|| TrackerError::NotReady("no target value entered".into()))?;
        Ok((kind, position, draft))
    }
}
