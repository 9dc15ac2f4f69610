//! Session-local mentor comments
//!
//! Comments live only in memory and are never sent to the remote service.

use dashmap::DashMap;
use mentorboard_common::{AgentId, WeekKey};

#[derive(Debug, Default)]
pub struct CommentStore {
    comments: DashMap<WeekKey, String>,
}

impl CommentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &WeekKey) -> Option<String> {
        self.comments.get(key).map(|c| c.value().clone())
    }

    /// Store a comment; blank text removes it
    pub fn set(&self, key: WeekKey, text: impl Into<String>) {
        let text = text.into();
        if text.trim().is_empty() {
            self.comments.remove(&key);
        } else {
            self.comments.insert(key, text);
        }
    }

    pub fn remove(&self, key: &WeekKey) -> Option<String> {
        self.comments.remove(key).map(|(_, text)| text)
    }

    /// All comments for one agent, ordered by week
    pub fn for_agent(&self, agent_id: AgentId) -> Vec<(WeekKey, String)> {
        let mut comments: Vec<(WeekKey, String)> = self
            .comments
            .iter()
            .filter(|entry| entry.key().agent_id == agent_id)
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        comments.sort_by_key(|(key, _)| key.week);
        comments
    }

    pub fn clear(&self) {
        self.comments.clear();
    }
}
