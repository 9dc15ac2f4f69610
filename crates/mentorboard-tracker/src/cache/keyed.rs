//! Per-WeekKey store shared by the snapshot and target caches
//!
//! Holds the committed values, per-key load state and invalidation epochs,
//! and the single-flight map. A fetch commits only when its view is still
//! live and the key has not been invalidated since the fetch began.

use super::LoadState;
use crate::notice::NoticeBoard;
use crate::scheduler::CancelToken;
use crate::single_flight::SingleFlight;
use dashmap::DashMap;
use mentorboard_common::{Result, TrackerError, WeekKey};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// (session generation, per-key epoch) captured when a fetch starts
type Epoch = (u64, u64);

pub(crate) struct KeyedStore<V> {
    /// Used in logs and notices ("snapshot", "targets")
    label: &'static str,
    entries: DashMap<WeekKey, Arc<V>>,
    states: DashMap<WeekKey, LoadState>,
    epochs: DashMap<WeekKey, u64>,
    generation: AtomicU64,
    flights: SingleFlight<WeekKey, Arc<V>>,
    notices: Arc<NoticeBoard>,
}

impl<V> KeyedStore<V>
where
    V: Send + Sync + 'static,
{
    pub(crate) fn new(label: &'static str, notices: Arc<NoticeBoard>) -> Self {
        Self {
            label,
            entries: DashMap::new(),
            states: DashMap::new(),
            epochs: DashMap::new(),
            generation: AtomicU64::new(0),
            flights: SingleFlight::new(),
            notices,
        }
    }

    pub(crate) fn get(&self, key: &WeekKey) -> Option<Arc<V>> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub(crate) fn contains(&self, key: &WeekKey) -> bool {
        self.entries.contains_key(key)
    }

    pub(crate) fn state(&self, key: &WeekKey) -> LoadState {
        self.states
            .get(key)
            .map(|state| state.value().clone())
            .unwrap_or(LoadState::Idle)
    }

    pub(crate) fn is_in_flight(&self, key: &WeekKey) -> bool {
        self.flights.is_in_flight(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    fn epoch(&self, key: &WeekKey) -> Epoch {
        let per_key = self.epochs.get(key).map(|e| *e).unwrap_or(0);
        (self.generation.load(Ordering::Acquire), per_key)
    }

    /// Fetch unless cached (and not forced), joining any outstanding fetch
    /// for the same key.
    pub(crate) async fn ensure<F, Fut>(
        self: &Arc<Self>,
        key: WeekKey,
        force_refresh: bool,
        token: &CancelToken,
        fetch: F,
    ) -> Result<Arc<V>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        if !force_refresh {
            if let Some(value) = self.get(&key) {
                debug!(cache = self.label, key = %key, "Cache hit");
                return Ok(value);
            }
        }

        // A joined fetch that started before an invalidation is discarded on
        // commit; one fresh attempt follows it so the caller still gets data.
        let mut attempts = 0;
        loop {
            attempts += 1;
            if token.is_cancelled() {
                return Err(TrackerError::Cancelled);
            }

            let store = self.clone();
            let commit_token = token.clone();
            let result = self
                .flights
                .run(key, || {
                    let epoch = store.epoch(&key);
                    store.states.insert(key, LoadState::Loading);
                    debug!(cache = store.label, key = %key, "Fetching");
                    let fetching = fetch();
                    async move {
                        let outcome = fetching.await;
                        store.commit(key, epoch, &commit_token, outcome)
                    }
                })
                .await;

            match result {
                Err(TrackerError::Cancelled) if attempts < 2 && !token.is_cancelled() => {
                    if !force_refresh {
                        if let Some(value) = self.get(&key) {
                            return Ok(value);
                        }
                    }
                    continue;
                }
                other => return other,
            }
        }
    }

    fn commit(
        &self,
        key: WeekKey,
        started: Epoch,
        token: &CancelToken,
        outcome: Result<V>,
    ) -> Result<Arc<V>> {
        if token.is_cancelled() {
            debug!(cache = self.label, key = %key, "Discarded result for cancelled view");
            self.settle(key);
            return Err(TrackerError::Cancelled);
        }
        if self.epoch(&key) != started {
            debug!(cache = self.label, key = %key, "Discarded result for invalidated key");
            self.settle(key);
            return Err(TrackerError::Cancelled);
        }

        match outcome {
            Ok(value) => {
                let value = Arc::new(value);
                self.entries.insert(key, value.clone());
                self.states.insert(key, LoadState::Loaded);
                debug!(cache = self.label, key = %key, "Committed");
                Ok(value)
            }
            Err(err) => {
                if err.is_rate_limited() {
                    warn!(cache = self.label, key = %key, "Fetch rate limited");
                } else {
                    error!(cache = self.label, key = %key, error = %err, "Fetch failed");
                }
                self.notices
                    .failure(&format!("Loading {} for {}", self.label, key), &err, Some(key));
                self.states.insert(key, LoadState::Failed(err.clone()));
                Err(err)
            }
        }
    }

    /// Return a key's state to what its committed data says
    fn settle(&self, key: WeekKey) {
        if self.entries.contains_key(&key) {
            self.states.insert(key, LoadState::Loaded);
        } else {
            self.states.remove(&key);
        }
    }

    /// Drop the committed value and fence off fetches already under way
    pub(crate) fn invalidate(&self, key: &WeekKey) -> bool {
        *self.epochs.entry(*key).or_insert(0) += 1;
        let removed = self.entries.remove(key).is_some();
        if !self.flights.is_in_flight(key) {
            self.states.remove(key);
        }
        removed
    }

    /// Drop everything; fetches under way will not commit
    pub(crate) fn clear(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.entries.clear();
        let in_flight = self.flights.keys();
        self.states.retain(|key, _| in_flight.contains(key));
    }
}
