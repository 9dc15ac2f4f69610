//! Request deduplication keyed by cache key
//!
//! The first caller for a key starts the fetch; callers arriving while it is
//! outstanding await the same shared future. The key leaves the in-flight
//! map as soon as the fetch resolves. Fetches are driven by a detached task,
//! so aborting a waiting caller never strands an entry in the map.

use futures::future::{BoxFuture, FutureExt, Shared};
use mentorboard_common::Result;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

type Flight<V> = Shared<BoxFuture<'static, Result<V>>>;

/// Single-flight guard: at most one outstanding fetch per key
pub struct SingleFlight<K, V> {
    inflight: Arc<Mutex<HashMap<K, Flight<V>>>>,
}

impl<K, V> Default for SingleFlight<K, V> {
    fn default() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a fetch for `key` is outstanding
    pub fn is_in_flight(&self, key: &K) -> bool {
        self.inflight.lock().contains_key(key)
    }

    /// Keys with an outstanding fetch
    pub fn keys(&self) -> HashSet<K> {
        self.inflight.lock().keys().cloned().collect()
    }

    pub fn in_flight_count(&self) -> usize {
        self.inflight.lock().len()
    }

    /// Run `start()` for `key` unless a fetch is already outstanding, in
    /// which case join it. `start` is only invoked by the leader.
    pub async fn run<F, Fut>(&self, key: K, start: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let flight = {
            let mut inflight = self.inflight.lock();
            match inflight.get(&key) {
                Some(flight) => flight.clone(),
                None => {
                    let map = self.inflight.clone();
                    let owned_key = key.clone();
                    let fetch = start();
                    let flight = async move {
                        let result = fetch.await;
                        map.lock().remove(&owned_key);
                        result
                    }
                    .boxed()
                    .shared();
                    inflight.insert(key, flight.clone());
                    tokio::spawn(flight.clone());
                    flight
                }
            }
        };
        flight.await
    }
}
