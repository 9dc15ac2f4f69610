//! Mentorboard configuration

use mentorboard_common::{MentorContext, Result, TrackerError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Tracker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Mentor whose roster is loaded
    pub mentor_id: u64,
    /// Mentor display name
    pub mentor_name: String,
    /// Timing of staggered and debounced requests
    pub timing: TimingSettings,
    /// JSON fixture for the in-memory remote (demo binary)
    pub fixture: Option<PathBuf>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            mentor_id: 1,
            mentor_name: "Mentor".to_string(),
            timing: TimingSettings::default(),
            fixture: None,
        }
    }
}

impl TrackerConfig {
    /// Load configuration from `.env` and `MENTORBOARD_*` variables
    pub fn load() -> Result<Self> {
        // Try to load .env file
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source; unset variables keep defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(val) = lookup("MENTORBOARD_MENTOR_ID") {
            cfg.mentor_id = parse("MENTORBOARD_MENTOR_ID", &val)?;
        }
        if let Some(val) = lookup("MENTORBOARD_MENTOR_NAME") {
            cfg.mentor_name = val;
        }
        if let Some(val) = lookup("MENTORBOARD_FIXTURE") {
            if !val.trim().is_empty() {
                cfg.fixture = Some(PathBuf::from(val));
            }
        }

        // Timing settings
        if let Some(val) = lookup("MENTORBOARD_STAGGER_MS") {
            cfg.timing.stagger_ms = parse("MENTORBOARD_STAGGER_MS", &val)?;
        }
        if let Some(val) = lookup("MENTORBOARD_EXPAND_DEBOUNCE_MS") {
            cfg.timing.expand_debounce_ms = parse("MENTORBOARD_EXPAND_DEBOUNCE_MS", &val)?;
        }
        if let Some(val) = lookup("MENTORBOARD_WEEK_CHANGE_DELAY_MS") {
            cfg.timing.week_change_delay_ms = parse("MENTORBOARD_WEEK_CHANGE_DELAY_MS", &val)?;
        }

        Ok(cfg)
    }

    pub fn mentor(&self) -> MentorContext {
        MentorContext::new(self.mentor_id, self.mentor_name.clone())
    }
}

fn parse<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| TrackerError::Config(format!("{} is not a valid number: {:?}", name, value)))
}

/// Request pacing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingSettings {
    /// Delay between successive snapshot requests in a warm-up
    pub stagger_ms: u64,
    /// Debounce for row expansion
    pub expand_debounce_ms: u64,
    /// Delay before a week change fetches the new WeekKey
    pub week_change_delay_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            stagger_ms: crate::DEFAULT_STAGGER_MS,
            expand_debounce_ms: crate::DEFAULT_EXPAND_DEBOUNCE_MS,
            week_change_delay_ms: crate::DEFAULT_WEEK_CHANGE_DELAY_MS,
        }
    }
}

impl TimingSettings {
    pub fn stagger_step(&self) -> Duration {
        Duration::from_millis(self.stagger_ms)
    }

    pub fn expand_debounce(&self) -> Duration {
        Duration::from_millis(self.expand_debounce_ms)
    }

    pub fn week_change_delay(&self) -> Duration {
        Duration::from_millis(self.week_change_delay_ms)
    }
}
