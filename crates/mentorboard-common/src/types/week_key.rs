//! Agent identity, week numbers and the composite cache key

use crate::error::{Result, TrackerError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Remote identifier of a sales agent
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub u64);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for AgentId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Week number within a 12-week programme
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Week(u8);

impl Week {
    /// First programme week, the default selection for a new agent
    pub const FIRST: Week = Week(1);

    /// Last programme week
    pub const LAST: Week = Week(12);

    /// Validate a week number
    pub fn new(number: u8) -> Result<Self> {
        if (Self::FIRST.0..=Self::LAST.0).contains(&number) {
            Ok(Self(number))
        } else {
            Err(TrackerError::InvalidWeek(number))
        }
    }

    pub fn number(self) -> u8 {
        self.0
    }

    /// All programme weeks in order
    pub fn all() -> impl Iterator<Item = Week> {
        (Self::FIRST.0..=Self::LAST.0).map(Week)
    }
}

impl Default for Week {
    fn default() -> Self {
        Self::FIRST
    }
}

impl TryFrom<u8> for Week {
    type Error = TrackerError;

    fn try_from(number: u8) -> Result<Self> {
        Week::new(number)
    }
}

impl From<Week> for u8 {
    fn from(week: Week) -> Self {
        week.0
    }
}

impl fmt::Display for Week {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// (agent, week) pair identifying one unit of cached progress and target data
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WeekKey {
    pub agent_id: AgentId,
    pub week: Week,
}

impl WeekKey {
    pub fn new(agent_id: AgentId, week: Week) -> Self {
        Self { agent_id, week }
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/w{}", self.agent_id, self.week)
    }
}
