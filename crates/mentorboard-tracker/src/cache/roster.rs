//! Agent roster cache
//!
//! A successful load replaces the roster wholesale and seeds week 1 for
//! agents new to the week selection. A failed refresh keeps whatever roster
//! was already loaded.

use super::selection::WeekSelection;
use crate::notice::NoticeBoard;
use crate::remote::PerformanceRemote;
use crate::scheduler::CancelToken;
use crate::single_flight::SingleFlight;
use mentorboard_common::{Agent, AgentId, MentorContext, Result, TrackerError};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

pub struct RosterCache {
    remote: Arc<dyn PerformanceRemote>,
    mentor: MentorContext,
    agents: RwLock<Option<Arc<Vec<Agent>>>>,
    last_error: RwLock<Option<TrackerError>>,
    flight: SingleFlight<(), Arc<Vec<Agent>>>,
    selection: Arc<WeekSelection>,
    notices: Arc<NoticeBoard>,
}

impl RosterCache {
    pub fn new(
        remote: Arc<dyn PerformanceRemote>,
        mentor: MentorContext,
        selection: Arc<WeekSelection>,
        notices: Arc<NoticeBoard>,
    ) -> Self {
        Self {
            remote,
            mentor,
            agents: RwLock::new(None),
            last_error: RwLock::new(None),
            flight: SingleFlight::new(),
            selection,
            notices,
        }
    }

    pub fn agents(&self) -> Option<Arc<Vec<Agent>>> {
        self.agents.read().clone()
    }

    pub fn agent(&self, id: AgentId) -> Option<Agent> {
        self.agents
            .read()
            .as_ref()
            .and_then(|agents| agents.iter().find(|a| a.id == id).cloned())
    }

    pub fn agent_ids(&self) -> Vec<AgentId> {
        self.agents
            .read()
            .as_ref()
            .map(|agents| agents.iter().map(|a| a.id).collect())
            .unwrap_or_default()
    }

    pub fn is_loading(&self) -> bool {
        self.flight.is_in_flight(&())
    }

    pub fn last_error(&self) -> Option<TrackerError> {
        self.last_error.read().clone()
    }

    pub fn mentor(&self) -> &MentorContext {
        &self.mentor
    }

    /// Return the roster, fetching when absent or when forced.
    ///
    /// A result that lands after `token` is cancelled is discarded without
    /// touching the roster, the week selection or the notices.
    #[instrument(skip(self, token), fields(mentor = self.mentor.mentor_id))]
    pub async fn load(
        self: &Arc<Self>,
        force_refresh: bool,
        token: &CancelToken,
    ) -> Result<Arc<Vec<Agent>>> {
        let mut attempts = 0;
        loop {
            if !force_refresh {
                if let Some(agents) = self.agents() {
                    debug!("Roster cache hit");
                    return Ok(agents);
                }
            }
            attempts += 1;
            if token.is_cancelled() {
                return Err(TrackerError::Cancelled);
            }

            let cache = self.clone();
            let commit_token = token.clone();
            let result = self
                .flight
                .run((), move || async move {
                    let outcome = cache.remote.fetch_roster(&cache.mentor).await;
                    cache.commit(&commit_token, outcome.map(|response| response.agents))
                })
                .await;

            // Joined a flight owned by a view that has since gone away
            match result {
                Err(TrackerError::Cancelled) if attempts < 2 && !token.is_cancelled() => continue,
                other => return other,
            }
        }
    }

    fn commit(&self, token: &CancelToken, outcome: Result<Vec<Agent>>) -> Result<Arc<Vec<Agent>>> {
        if token.is_cancelled() {
            debug!("Discarded roster for cancelled view");
            return Err(TrackerError::Cancelled);
        }
        match outcome {
            Ok(agents) => {
                let seeded = agents
                    .iter()
                    .filter(|agent| self.selection.seed(agent.id))
                    .count();
                info!(agents = agents.len(), seeded, "Loaded roster");

                let agents = Arc::new(agents);
                *self.agents.write() = Some(agents.clone());
                *self.last_error.write() = None;
                Ok(agents)
            }
            Err(err) => {
                if err.is_rate_limited() {
                    warn!("Roster fetch rate limited");
                } else {
                    error!(error = %err, "Roster fetch failed");
                }
                self.notices.failure("Loading roster", &err, None);
                *self.last_error.write() = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Forget the roster (session end)
    pub fn clear(&self) {
        *self.agents.write() = None;
        *self.last_error.write() = None;
    }
}
