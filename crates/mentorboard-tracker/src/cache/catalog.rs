//! Metric catalog cache
//!
//! Loaded once per session. Concurrent loads share one fetch; a failed load
//! leaves the catalog absent and is not retried until `load` is called
//! again.

use crate::notice::NoticeBoard;
use crate::remote::PerformanceRemote;
use crate::scheduler::CancelToken;
use crate::single_flight::SingleFlight;
use mentorboard_common::{Catalog, MetricKind, Result, TrackerError};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

pub struct CatalogCache {
    remote: Arc<dyn PerformanceRemote>,
    catalog: RwLock<Option<Arc<Catalog>>>,
    last_error: RwLock<Option<TrackerError>>,
    flight: SingleFlight<(), Arc<Catalog>>,
    notices: Arc<NoticeBoard>,
}

impl CatalogCache {
    pub fn new(remote: Arc<dyn PerformanceRemote>, notices: Arc<NoticeBoard>) -> Self {
        Self {
            remote,
            catalog: RwLock::new(None),
            last_error: RwLock::new(None),
            flight: SingleFlight::new(),
            notices,
        }
    }

    pub fn get(&self) -> Option<Arc<Catalog>> {
        self.catalog.read().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.flight.is_in_flight(&())
    }

    pub fn last_error(&self) -> Option<TrackerError> {
        self.last_error.read().clone()
    }

    /// Return the catalog, fetching it on first use
    pub async fn load(self: &Arc<Self>, token: &CancelToken) -> Result<Arc<Catalog>> {
        if let Some(catalog) = self.get() {
            debug!("Catalog cache hit");
            return Ok(catalog);
        }
        self.fetch(false, token).await
    }

    /// Fetch again and replace the catalog wholesale on success
    pub async fn reload(self: &Arc<Self>, token: &CancelToken) -> Result<Arc<Catalog>> {
        self.fetch(true, token).await
    }

    #[instrument(skip(self, token))]
    async fn fetch(self: &Arc<Self>, force_refresh: bool, token: &CancelToken) -> Result<Arc<Catalog>> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            if token.is_cancelled() {
                return Err(TrackerError::Cancelled);
            }

            let cache = self.clone();
            let commit_token = token.clone();
            let result = self
                .flight
                .run((), move || async move {
                    let outcome = match cache.remote.fetch_catalog().await {
                        Ok(response) => response.into_catalog(),
                        Err(err) => Err(err),
                    };
                    cache.commit(&commit_token, outcome)
                })
                .await;

            match result {
                Err(TrackerError::Cancelled) if attempts < 2 && !token.is_cancelled() => {
                    if !force_refresh {
                        if let Some(catalog) = self.get() {
                            return Ok(catalog);
                        }
                    }
                    continue;
                }
                other => return other,
            }
        }
    }

    fn commit(&self, token: &CancelToken, outcome: Result<Catalog>) -> Result<Arc<Catalog>> {
        if token.is_cancelled() {
            debug!("Discarded catalog for cancelled view");
            return Err(TrackerError::Cancelled);
        }
        match outcome {
            Ok(catalog) => {
                let catalog = Arc::new(catalog);
                info!(
                    actions = catalog.len(MetricKind::Action),
                    skillsets = catalog.len(MetricKind::Skillset),
                    requirements = catalog.len(MetricKind::Requirement),
                    "Loaded metric catalog"
                );
                *self.catalog.write() = Some(catalog.clone());
                *self.last_error.write() = None;
                Ok(catalog)
            }
            Err(err) => {
                if err.is_rate_limited() {
                    warn!("Catalog fetch rate limited");
                } else {
                    error!(error = %err, "Catalog fetch failed");
                }
                self.notices.failure("Loading metric catalog", &err, None);
                *self.last_error.write() = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Forget the catalog (session end)
    pub fn clear(&self) {
        *self.catalog.write() = None;
        *self.last_error.write() = None;
    }
}
