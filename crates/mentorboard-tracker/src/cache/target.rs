//! Target cache
//!
//! Mentor-set targets per WeekKey. Reads and writes take catalog positions
//! and translate them to absolute remote ids through [`MetricKind`]. A
//! successful write drops the cached set for its WeekKey; the next read
//! fetches the server's version instead of patching the local copy.

use super::catalog::CatalogCache;
use super::keyed::KeyedStore;
use super::LoadState;
use crate::notice::NoticeBoard;
use crate::remote::{wire, PerformanceRemote};
use crate::scheduler::CancelToken;
use mentorboard_common::{
    MentorContext, MetricKind, Result, TargetSet, TargetUpdate, TrackerError, WeekKey,
};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

pub struct TargetCache {
    remote: Arc<dyn PerformanceRemote>,
    mentor: MentorContext,
    catalog: Arc<CatalogCache>,
    store: Arc<KeyedStore<TargetSet>>,
}

impl TargetCache {
    pub fn new(
        remote: Arc<dyn PerformanceRemote>,
        mentor: MentorContext,
        catalog: Arc<CatalogCache>,
        notices: Arc<NoticeBoard>,
    ) -> Self {
        Self {
            remote,
            mentor,
            catalog,
            store: Arc::new(KeyedStore::new("targets", notices)),
        }
    }

    pub fn get(&self, key: &WeekKey) -> Option<Arc<TargetSet>> {
        self.store.get(key)
    }

    pub fn contains(&self, key: &WeekKey) -> bool {
        self.store.contains(key)
    }

    pub fn state(&self, key: &WeekKey) -> LoadState {
        self.store.state(key)
    }

    pub fn is_loading(&self, key: &WeekKey) -> bool {
        self.store.is_in_flight(key)
    }

    pub fn last_error(&self, key: &WeekKey) -> Option<TrackerError> {
        self.store.state(key).error().cloned()
    }

    /// Fetch the target set unless cached and not forced; single-flight per key
    #[instrument(skip(self, token), fields(key = %key))]
    pub async fn ensure(
        &self,
        key: WeekKey,
        force_refresh: bool,
        token: &CancelToken,
    ) -> Result<Arc<TargetSet>> {
        let remote = self.remote.clone();
        self.store
            .ensure(key, force_refresh, token, move || {
                let remote = remote.clone();
                async move { wire::into_target_set(remote.fetch_target_set(key).await?) }
            })
            .await
    }

    /// Target for a catalog position; 0 when unset, not loaded, or the
    /// position has no remote id
    pub fn lookup(&self, kind: MetricKind, position: usize, key: &WeekKey) -> u32 {
        let Some(metric_id) = kind.absolute_id(position) else {
            return 0;
        };
        self.store
            .get(key)
            .map(|targets| targets.target(kind, metric_id))
            .unwrap_or(0)
    }

    /// Write one target.
    ///
    /// On success the cached set for `key` is invalidated. On failure the
    /// cache is left as it was and the error is returned; posting a notice
    /// is left to the caller, which owns the editor the user retries from.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn update(
        &self,
        key: WeekKey,
        kind: MetricKind,
        position: usize,
        new_count: u32,
    ) -> Result<()> {
        let metric_id = match self.catalog.get() {
            Some(catalog) => catalog.check_position(kind, position)?.metric_id(),
            None => kind.checked_id(position)?,
        };

        let update = TargetUpdate {
            mentor_id: self.mentor.mentor_id,
            agent_id: key.agent_id,
            week: key.week,
            kind,
            metric_id,
            target: new_count,
        };

        match self.remote.submit_target_update(update).await {
            Ok(()) => {
                self.store.invalidate(&key);
                info!(%kind, position, metric_id, target = new_count, "Target updated");
                Ok(())
            }
            Err(err) => {
                if err.is_rate_limited() {
                    warn!(%kind, metric_id, "Target update rate limited");
                } else {
                    error!(%kind, metric_id, error = %err, "Target update failed");
                }
                Err(err)
            }
        }
    }

    pub fn invalidate(&self, key: &WeekKey) -> bool {
        self.store.invalidate(key)
    }

    pub fn clear(&self) {
        self.store.clear();
    }
}
