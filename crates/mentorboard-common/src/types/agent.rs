//! Sales agents and the mentor viewing them

use super::week_key::AgentId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A sales agent on the mentor's roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    /// Remote identifier
    pub id: AgentId,
    /// Display name
    pub name: String,
    /// Intake generation number
    pub generation: u32,
    /// Current rank title
    pub rank: String,
    /// Whether the agent is still on probation
    #[serde(default)]
    pub on_probation: bool,
    /// Date the agent started
    pub started_on: NaiveDate,
    /// Property category the agent sells
    pub property_category: String,
}

/// Identity of the mentor whose roster and targets are being managed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentorContext {
    pub mentor_id: u64,
    pub display_name: String,
}

impl MentorContext {
    pub fn new(mentor_id: u64, display_name: impl Into<String>) -> Self {
        Self {
            mentor_id,
            display_name: display_name.into(),
        }
    }
}
