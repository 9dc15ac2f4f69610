//! User-facing notices (toasts)
//!
//! Caches post here when a failure should reach the user; the rendering
//! layer drains the board. Rate limits never reach the board.

use mentorboard_common::{TrackerError, WeekKey};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use tracing::debug;

/// Upper bound on undrained notices; the oldest are dropped first
const MAX_PENDING_NOTICES: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    /// WeekKey the notice refers to, if any
    pub key: Option<WeekKey>,
}

#[derive(Debug, Default)]
pub struct NoticeBoard {
    pending: Mutex<VecDeque<Notice>>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(&self, message: impl Into<String>, key: Option<WeekKey>) {
        self.push(Notice {
            level: NoticeLevel::Success,
            message: message.into(),
            key,
        });
    }

    /// Post a failure notice unless the error is one users should not see.
    /// Returns whether a notice was posted.
    pub fn failure(&self, context: &str, error: &TrackerError, key: Option<WeekKey>) -> bool {
        if !error.is_user_visible() {
            debug!(context, %error, "Suppressed notice");
            return false;
        }
        self.push(Notice {
            level: NoticeLevel::Error,
            message: format!("{}: {}", context, error),
            key,
        });
        true
    }

    fn push(&self, notice: Notice) {
        let mut pending = self.pending.lock();
        if pending.len() >= MAX_PENDING_NOTICES {
            pending.pop_front();
        }
        pending.push_back(notice);
    }

    /// Take every pending notice, oldest first
    pub fn drain(&self) -> Vec<Notice> {
        self.pending.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}
