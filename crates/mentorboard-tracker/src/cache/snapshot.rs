//! Snapshot cache
//!
//! Observed progress per WeekKey. Fetches are deduplicated per key and bulk
//! warm-ups are staggered on the scheduler so the remote service never sees
//! a burst of snapshot requests.

use super::keyed::KeyedStore;
use super::LoadState;
use crate::notice::NoticeBoard;
use crate::remote::PerformanceRemote;
use crate::scheduler::{CancelToken, Scheduler, TaskId};
use mentorboard_common::{Result, Snapshot, TrackerError, WeekKey};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Spacing between successive snapshot requests in a warm-up
pub const DEFAULT_STAGGER_STEP: Duration = Duration::from_millis(crate::DEFAULT_STAGGER_MS);

pub struct SnapshotCache {
    remote: Arc<dyn PerformanceRemote>,
    store: Arc<KeyedStore<Snapshot>>,
    stagger_step: Duration,
}

impl SnapshotCache {
    pub fn new(remote: Arc<dyn PerformanceRemote>, notices: Arc<NoticeBoard>) -> Self {
        Self {
            remote,
            store: Arc::new(KeyedStore::new("snapshot", notices)),
            stagger_step: DEFAULT_STAGGER_STEP,
        }
    }

    /// Spacing between warm-up requests
    pub fn with_stagger_step(mut self, step: Duration) -> Self {
        self.stagger_step = step;
        self
    }

    pub fn stagger_step(&self) -> Duration {
        self.stagger_step
    }

    pub fn get(&self, key: &WeekKey) -> Option<Arc<Snapshot>> {
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

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.len() == 0
    }

    /// Fetch the snapshot unless it is cached and `force_refresh` is false.
    ///
    /// Joins an outstanding fetch for the same key instead of issuing a
    /// second request.
    #[instrument(skip(self, token), fields(key = %key))]
    pub async fn ensure(
        &self,
        key: WeekKey,
        force_refresh: bool,
        token: &CancelToken,
    ) -> Result<Arc<Snapshot>> {
        let remote = self.remote.clone();
        self.store
            .ensure(key, force_refresh, token, move || {
                let remote = remote.clone();
                async move { remote.fetch_snapshot(key).await?.into_snapshot() }
            })
            .await
    }

    /// Warm several keys, one request per stagger step.
    ///
    /// Without `force_refresh`, keys already cached are skipped and do not
    /// consume a slot. A failure for one key does not touch the others.
    pub fn warm(
        self: &Arc<Self>,
        scheduler: &Scheduler,
        keys: impl IntoIterator<Item = WeekKey>,
        force_refresh: bool,
        token: &CancelToken,
    ) -> Vec<TaskId> {
        let pending: Vec<WeekKey> = keys
            .into_iter()
            .filter(|key| force_refresh || !self.contains(key))
            .collect();
        debug!(
            keys = pending.len(),
            step_ms = self.stagger_step.as_millis() as u64,
            "Staggering snapshot warm-up"
        );

        let task_token = token.clone();
        scheduler.stagger(self.stagger_step, token.clone(), pending, |key| {
            let cache = self.clone();
            let token = task_token.clone();
            async move {
                // Failures are recorded in the key's load state
                let _ = cache.ensure(key, force_refresh, &token).await;
            }
        })
    }

    pub fn invalidate(&self, key: &WeekKey) -> bool {
        self.store.invalidate(key)
    }

    pub fn clear(&self) {
        self.store.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{CountRecord, InMemoryRemote, RemoteCall, RemoteOp, SnapshotRecord};
    use mentorboard_common::{AgentId, MetricKind, Week};

    fn key(agent: u64, week: u8) -> WeekKey {
        WeekKey::new(AgentId(agent), Week::new(week).unwrap())
    }

    fn setup() -> (Arc<InMemoryRemote>, Arc<SnapshotCache>, Arc<NoticeBoard>) {
        let remote = Arc::new(InMemoryRemote::new().with_latency(Duration::from_millis(200)));
        remote.set_snapshot(
            key(1, 3),
            SnapshotRecord {
                actions: vec![CountRecord { metric_id: 1, count: 5 }],
                ..Default::default()
            },
        );
        let notices = Arc::new(NoticeBoard::new());
        let cache = Arc::new(SnapshotCache::new(remote.clone(), notices.clone()));
        (remote, cache, notices)
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_ensure_issues_one_call() {
        let (remote, cache, _) = setup();
        let token = CancelToken::new();

        let (a, b) = tokio::join!(
            cache.ensure(key(1, 3), false, &token),
            cache.ensure(key(1, 3), false, &token),
        );
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(remote.calls(RemoteCall::Snapshot(key(1, 3))), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_forced_ensure_joins_in_flight_fetch() {
        let (remote, cache, _) = setup();
        let token = CancelToken::new();

        let (a, b) = tokio::join!(
            cache.ensure(key(1, 3), false, &token),
            cache.ensure(key(1, 3), true, &token),
        );
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(remote.calls(RemoteCall::Snapshot(key(1, 3))), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_ensure_is_idempotent() {
        let (remote, cache, _) = setup();
        let token = CancelToken::new();

        let snapshot = cache.ensure(key(1, 3), false, &token).await.unwrap();
        assert_eq!(snapshot.observed(MetricKind::Action, 1), 5);
        cache.ensure(key(1, 3), false, &token).await.unwrap();
        assert_eq!(remote.calls(RemoteCall::Snapshot(key(1, 3))), 1);

        cache.ensure(key(1, 3), true, &token).await.unwrap();
        assert_eq!(remote.calls(RemoteCall::Snapshot(key(1, 3))), 2);
        assert_eq!(cache.state(&key(1, 3)), LoadState::Loaded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_fetch_is_silent_and_retryable() {
        let (remote, cache, notices) = setup();
        let token = CancelToken::new();
        remote.fail_next(RemoteCall::Snapshot(key(2, 1)), TrackerError::RateLimited);

        let result = cache.ensure(key(2, 1), false, &token).await;
        assert_eq!(result, Err(TrackerError::RateLimited));
        assert!(notices.is_empty());
        assert!(!cache.is_loading(&key(2, 1)));
        assert!(cache.get(&key(2, 1)).is_none());
        assert_eq!(cache.last_error(&key(2, 1)), Some(TrackerError::RateLimited));

        cache.ensure(key(2, 1), false, &token).await.unwrap();
        assert_eq!(remote.calls(RemoteCall::Snapshot(key(2, 1))), 2);
        assert!(cache.last_error(&key(2, 1)).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_failures_notify() {
        let (remote, cache, notices) = setup();
        remote.fail_next(RemoteCall::Snapshot(key(1, 3)), TrackerError::Network("reset".into()));

        assert!(cache.ensure(key(1, 3), false, &CancelToken::new()).await.is_err());
        let notices = notices.drain();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].key, Some(key(1, 3)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_view_discards_result() {
        let (_, cache, notices) = setup();
        let token = CancelToken::new();

        let pending = {
            let cache = cache.clone();
            let token = token.clone();
            tokio::spawn(async move { cache.ensure(key(1, 3), false, &token).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cache.is_loading(&key(1, 3)));
        token.cancel();

        assert_eq!(pending.await.unwrap(), Err(TrackerError::Cancelled));
        assert!(cache.get(&key(1, 3)).is_none());
        assert_eq!(cache.state(&key(1, 3)), LoadState::Idle);
        assert!(notices.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_warm_staggers_requests() {
        let (remote, cache, _) = setup();
        let scheduler = Scheduler::new();
        let token = CancelToken::new();
        let keys = vec![key(1, 1), key(2, 1), key(3, 1)];

        let tasks = cache.warm(&scheduler, keys.clone(), false, &token);
        assert_eq!(tasks.len(), 3);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(remote.total_calls(RemoteOp::Snapshot), 1);

        tokio::time::sleep(Duration::from_millis(800)).await;
        assert_eq!(remote.total_calls(RemoteOp::Snapshot), 2);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(remote.total_calls(RemoteOp::Snapshot), 3);
        assert!(keys.iter().all(|k| cache.contains(k)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_warm_failure_does_not_abort_others() {
        let (remote, cache, _) = setup();
        let scheduler = Scheduler::new();
        remote.fail_next(RemoteCall::Snapshot(key(1, 1)), TrackerError::Network("down".into()));

        cache.warm(&scheduler, vec![key(1, 1), key(2, 1)], false, &CancelToken::new());
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert!(cache.get(&key(1, 1)).is_none());
        assert!(cache.get(&key(2, 1)).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_warm_skips_cached_keys() {
        let (remote, cache, _) = setup();
        let scheduler = Scheduler::new();
        let token = CancelToken::new();
        cache.ensure(key(1, 3), false, &token).await.unwrap();

        let tasks = cache.warm(&scheduler, vec![key(1, 3), key(2, 3)], false, &token);
        assert_eq!(tasks.len(), 1);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(remote.calls(RemoteCall::Snapshot(key(1, 3))), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_during_fetch_refetches() {
        let (remote, cache, _) = setup();
        let token = CancelToken::new();

        let waiting = {
            let cache = cache.clone();
            let token = token.clone();
            tokio::spawn(async move { cache.ensure(key(1, 3), false, &token).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        cache.invalidate(&key(1, 3));

        // The first response predates the invalidation and is dropped; the
        // waiter gets the result of a second fetch instead.
        assert!(waiting.await.unwrap().is_ok());
        assert!(cache.get(&key(1, 3)).is_some());
        assert_eq!(remote.calls(RemoteCall::Snapshot(key(1, 3))), 2);
    }
}
