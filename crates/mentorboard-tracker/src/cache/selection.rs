//! Which week each agent row is showing

use dashmap::DashMap;
use mentorboard_common::{AgentId, Week, WeekKey};

#[derive(Debug, Default)]
pub struct WeekSelection {
    selected: DashMap<AgentId, Week>,
}

impl WeekSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selected week, week 1 for an agent never seeded or selected
    pub fn selected(&self, agent_id: AgentId) -> Week {
        self.selected
            .get(&agent_id)
            .map(|week| *week)
            .unwrap_or(Week::FIRST)
    }

    /// WeekKey for the agent's selected week
    pub fn key(&self, agent_id: AgentId) -> WeekKey {
        WeekKey::new(agent_id, self.selected(agent_id))
    }

    /// Returns the previously selected week
    pub fn select(&self, agent_id: AgentId, week: Week) -> Option<Week> {
        self.selected.insert(agent_id, week)
    }

    /// Seed week 1 unless a selection already exists. Returns whether it seeded.
    pub fn seed(&self, agent_id: AgentId) -> bool {
        let mut seeded = false;
        self.selected.entry(agent_id).or_insert_with(|| {
            seeded = true;
            Week::FIRST
        });
        seeded
    }

    pub fn contains(&self, agent_id: AgentId) -> bool {
        self.selected.contains_key(&agent_id)
    }

    pub fn clear(&self) {
        self.selected.clear();
    }
}
