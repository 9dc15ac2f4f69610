//! View coordinator
//!
//! Owns one session's caches, the scheduler and the live [`CancelToken`].
//! Decides which WeekKeys are active (the expanded row, each agent's
//! selected week) and asks the caches for them, debounced or staggered.
//! Rendering reads everything back through the accessors; nothing here
//! returns an error for a failed background fetch, it lands in the cache's
//! load state instead.

pub mod editor;

pub use editor::TargetEditor;

use crate::cache::{
    CatalogCache, CommentStore, RosterCache, SnapshotCache, TargetCache, WeekSelection,
};
use crate::config::{TimingSettings, TrackerConfig};
use crate::notice::NoticeBoard;
use crate::progress::{AgentOverview, ProgressCalculator, WeeklyProgress};
use crate::remote::PerformanceRemote;
use crate::scheduler::{CancelToken, Scheduler};
use mentorboard_common::{
    Agent, AgentId, Catalog, MentorContext, MetricKind, Result, Snapshot, TargetSet,
    TrackerError, Week, WeekKey,
};
use parking_lot::{Mutex, RwLock};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Debounce slot for row expansion
const EXPAND_SLOT: &str = "expand";

fn week_slot(agent_id: AgentId) -> String {
    format!("week:{}", agent_id)
}

pub struct ViewCoordinator {
    timing: TimingSettings,
    notices: Arc<NoticeBoard>,
    selection: Arc<WeekSelection>,
    catalog: Arc<CatalogCache>,
    roster: Arc<RosterCache>,
    snapshots: Arc<SnapshotCache>,
    targets: Arc<TargetCache>,
    comments: CommentStore,
    scheduler: Scheduler,
    token: RwLock<CancelToken>,
    expanded: RwLock<Option<AgentId>>,
    editor: Mutex<Option<TargetEditor>>,
}

impl ViewCoordinator {
    pub fn new(
        remote: Arc<dyn PerformanceRemote>,
        mentor: MentorContext,
        timing: TimingSettings,
    ) -> Self {
        let notices = Arc::new(NoticeBoard::new());
        let selection = Arc::new(WeekSelection::new());
        let catalog = Arc::new(CatalogCache::new(remote.clone(), notices.clone()));
        let roster = Arc::new(RosterCache::new(
            remote.clone(),
            mentor.clone(),
            selection.clone(),
            notices.clone(),
        ));
        let snapshots = Arc::new(
            SnapshotCache::new(remote.clone(), notices.clone())
                .with_stagger_step(timing.stagger_step()),
        );
        let targets = Arc::new(TargetCache::new(remote, mentor, catalog.clone(), notices.clone()));

        Self {
            timing,
            notices,
            selection,
            catalog,
            roster,
            snapshots,
            targets,
            comments: CommentStore::new(),
            scheduler: Scheduler::new(),
            token: RwLock::new(CancelToken::new()),
            expanded: RwLock::new(None),
            editor: Mutex::new(None),
        }
    }

    pub fn from_config(remote: Arc<dyn PerformanceRemote>, config: &TrackerConfig) -> Self {
        Self::new(remote, config.mentor(), config.timing.clone())
    }

    fn token(&self) -> CancelToken {
        self.token.read().clone()
    }

    /// Swap in a fresh token and drop every pending task of the old view
    fn supersede(&self) -> CancelToken {
        let fresh = CancelToken::new();
        let previous = std::mem::replace(&mut *self.token.write(), fresh.clone());
        previous.cancel();
        let cancelled = self.scheduler.cancel_all();
        debug!(cancelled, "Superseded previous view");
        fresh
    }

    /// Load roster and catalog, then warm each agent's selected week
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<()> {
        let token = self.token();
        let (_, roster) = tokio::join!(self.catalog.load(&token), self.roster.load(false, &token));
        let agents = roster?;

        let tasks = self.snapshots.warm(
            &self.scheduler,
            self.selected_keys(&agents),
            false,
            &token,
        );
        info!(agents = agents.len(), warming = tasks.len(), "Session started");
        Ok(())
    }

    fn selected_keys(&self, agents: &[Agent]) -> Vec<WeekKey> {
        agents.iter().map(|a| self.selection.key(a.id)).collect()
    }

    /// Snapshot (unless cached) and targets for the WeekKey `key_of`
    /// resolves to when the task fires
    fn fetch_row<K>(
        &self,
        key_of: K,
        token: CancelToken,
    ) -> impl Future<Output = ()> + Send + 'static
    where
        K: FnOnce() -> WeekKey + Send + 'static,
    {
        let snapshots = self.snapshots.clone();
        let targets = self.targets.clone();
        async move {
            let key = key_of();
            let snapshot = async {
                if !snapshots.contains(&key) {
                    let _ = snapshots.ensure(key, false, &token).await;
                }
            };
            let target_set = targets.ensure(key, false, &token);
            let _ = tokio::join!(snapshot, target_set);
        }
    }

    /// Change an agent's week; fetches after the week-change delay if the
    /// row is expanded
    pub fn select_week(&self, agent_id: AgentId, week: Week) {
        let previous = self.selection.select(agent_id, week);
        if previous == Some(week) || self.expanded_agent() != Some(agent_id) {
            return;
        }

        let key = WeekKey::new(agent_id, week);
        debug!(key = %key, "Week changed on expanded row");
        let token = self.token();
        self.scheduler.schedule_slot(
            week_slot(agent_id),
            self.timing.week_change_delay(),
            token.clone(),
            self.fetch_row(move || key, token),
        );
    }

    /// Expand one row (collapsing any other) and fetch its selected week
    /// after the debounce
    pub fn expand_agent(&self, agent_id: AgentId) {
        let previous = self.expanded.write().replace(agent_id);
        if let Some(other) = previous.filter(|other| *other != agent_id) {
            self.scheduler.cancel_slot(&week_slot(other));
        }

        let token = self.token();
        let selection = self.selection.clone();
        // Week is read when the debounce fires, not when it was armed
        let fetch = self.fetch_row(move || selection.key(agent_id), token.clone());
        info!(agent = %agent_id, "Expanding agent row");
        self.scheduler
            .schedule_slot(EXPAND_SLOT, self.timing.expand_debounce(), token, fetch);
    }

    pub fn collapse_agent(&self) {
        if let Some(agent_id) = self.expanded.write().take() {
            self.scheduler.cancel_slot(EXPAND_SLOT);
            self.scheduler.cancel_slot(&week_slot(agent_id));
            debug!(agent = %agent_id, "Collapsed agent row");
        }
    }

    /// Expand a collapsed row or collapse the expanded one
    pub fn toggle_agent(&self, agent_id: AgentId) {
        if self.expanded_agent() == Some(agent_id) {
            self.collapse_agent();
        } else {
            self.expand_agent(agent_id);
        }
    }

    /// Open the editor for a WeekKey, replacing any open editor
    pub fn open_target_editor(&self, agent_id: AgentId, week: Week) {
        let key = WeekKey::new(agent_id, week);
        *self.editor.lock() = Some(TargetEditor::new(key));

        if !self.targets.contains(&key) {
            let token = self.token();
            let targets = self.targets.clone();
            let task_token = token.clone();
            self.scheduler.schedule(Duration::ZERO, token, async move {
                let _ = targets.ensure(key, false, &task_token).await;
            });
        }
    }

    /// Choose the metric the draft applies to; the draft starts at its
    /// current target
    pub fn focus_target_metric(&self, kind: MetricKind, position: usize) -> Result<()> {
        let mut guard = self.editor.lock();
        let editor = guard
            .as_mut()
            .ok_or_else(|| TrackerError::NotReady("no target editor open".into()))?;
        if let Some(catalog) = self.catalog.get() {
            catalog.check_position(kind, position)?;
        }
        let current = self.targets.lookup(kind, position, &editor.key);
        editor.focus(kind, position, current);
        Ok(())
    }

    pub fn set_target_draft_value(&self, value: u32) -> Result<()> {
        let mut guard = self.editor.lock();
        let editor = guard
            .as_mut()
            .ok_or_else(|| TrackerError::NotReady("no target editor open".into()))?;
        editor.set_draft(value);
        Ok(())
    }

    /// Submit the editor's draft.
    ///
    /// Success closes the editor and refetches the WeekKey's targets. Failure
    /// keeps the editor open with the error and posts a notice unless the
    /// write was rate limited.
    #[instrument(skip(self))]
    pub async fn save_target(&self) -> Result<()> {
        let (key, (kind, position, value)) = {
            let guard = self.editor.lock();
            let editor = guard
                .as_ref()
                .ok_or_else(|| TrackerError::NotReady("no target editor open".into()))?;
            (editor.key, editor.pending_write()?)
        };
        let token = self.token();

        match self.targets.update(key, kind, position, value).await {
            Ok(()) => {
                if token.is_cancelled() {
                    return Ok(());
                }
                {
                    let mut guard = self.editor.lock();
                    if guard.as_ref().map(|e| e.key) == Some(key) {
                        *guard = None;
                    }
                }
                self.notices.success(
                    format!("Target saved for agent {} week {}", key.agent_id, key.week),
                    Some(key),
                );
                let _ = self.targets.ensure(key, true, &token).await;
                Ok(())
            }
            Err(err) => {
                if !token.is_cancelled() {
                    if let Some(editor) = self.editor.lock().as_mut().filter(|e| e.key == key) {
                        editor.last_error = Some(err.clone());
                    }
                    self.notices.failure("Saving target", &err, Some(key));
                }
                Err(err)
            }
        }
    }

    pub fn close_target_editor(&self) {
        *self.editor.lock() = None;
    }

    /// Supersede the current view and reload everything.
    ///
    /// The roster is force-reloaded, every agent's selected week is
    /// force-warmed on the stagger, and the expanded row's targets are
    /// refetched. A catalog that never loaded is retried.
    #[instrument(skip(self))]
    pub async fn refresh_all(&self) -> Result<()> {
        let token = self.supersede();

        let catalog = async {
            if self.catalog.get().is_none() {
                let _ = self.catalog.load(&token).await;
            }
        };
        let (_, roster) = tokio::join!(catalog, self.roster.load(true, &token));

        // A failed reload keeps the previous roster, which is still warmed
        let agents = self.roster.agents().unwrap_or_default();
        let tasks = self.snapshots.warm(
            &self.scheduler,
            self.selected_keys(&agents),
            true,
            &token,
        );

        if let Some(agent_id) = self.expanded_agent() {
            let key = self.selection.key(agent_id);
            let _ = self.targets.ensure(key, true, &token).await;
        }

        info!(agents = agents.len(), warming = tasks.len(), "Refreshed all");
        roster.map(|_| ())
    }

    /// Stop the view: pending tasks are aborted and fetches still under way
    /// will not commit
    pub fn teardown(&self) {
        self.token.read().cancel();
        let cancelled = self.scheduler.cancel_all();
        *self.expanded.write() = None;
        *self.editor.lock() = None;
        info!(cancelled, "View torn down");
    }

    /// Tear down and forget all session data (logout). A later `start`
    /// begins a fresh view.
    pub fn end_session(&self) {
        self.teardown();
        *self.token.write() = CancelToken::new();
        self.snapshots.clear();
        self.targets.clear();
        self.roster.clear();
        self.catalog.clear();
        self.selection.clear();
        self.comments.clear();
        self.notices.drain();
    }

    pub fn roster(&self) -> Option<Arc<Vec<Agent>>> {
        self.roster.agents()
    }

    pub fn catalog(&self) -> Option<Arc<Catalog>> {
        self.catalog.get()
    }

    pub fn mentor(&self) -> &MentorContext {
        self.roster.mentor()
    }

    pub fn selected_week(&self, agent_id: AgentId) -> Week {
        self.selection.selected(agent_id)
    }

    pub fn expanded_agent(&self) -> Option<AgentId> {
        *self.expanded.read()
    }

    pub fn snapshot(&self, key: &WeekKey) -> Option<Arc<Snapshot>> {
        self.snapshots.get(key)
    }

    pub fn targets(&self, key: &WeekKey) -> Option<Arc<TargetSet>> {
        self.targets.get(key)
    }

    pub fn target(&self, kind: MetricKind, position: usize, key: &WeekKey) -> u32 {
        self.targets.lookup(kind, position, key)
    }

    /// Derived progress from whatever is cached; never fetches
    pub fn progress(&self, key: &WeekKey) -> WeeklyProgress {
        let catalog = self.catalog.get();
        let snapshot = self.snapshots.get(key);
        let targets = self.targets.get(key);
        ProgressCalculator::evaluate(*key, catalog.as_deref(), snapshot.as_deref(), targets.as_deref())
    }

    /// Summary over the agent's weeks that have a snapshot cached
    pub fn overview(&self, agent_id: AgentId) -> Option<AgentOverview> {
        let agent = self.roster.agent(agent_id)?;
        let weeks: Vec<WeeklyProgress> = Week::all()
            .map(|week| WeekKey::new(agent_id, week))
            .filter(|key| self.snapshots.contains(key))
            .map(|key| self.progress(&key))
            .collect();
        Some(ProgressCalculator::agent_overview(&agent, &weeks))
    }

    /// Whether either fetch for the WeekKey is outstanding
    pub fn is_loading(&self, key: &WeekKey) -> bool {
        self.snapshots.is_loading(key) || self.targets.is_loading(key)
    }

    /// Last failure for the WeekKey, snapshot first
    pub fn last_error(&self, key: &WeekKey) -> Option<TrackerError> {
        self.snapshots
            .last_error(key)
            .or_else(|| self.targets.last_error(key))
    }

    pub fn roster_loading(&self) -> bool {
        self.roster.is_loading() || self.catalog.is_loading()
    }

    pub fn editor(&self) -> Option<TargetEditor> {
        self.editor.lock().clone()
    }

    pub fn comments(&self) -> &CommentStore {
        &self.comments
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    /// Scheduled tasks not yet finished
    pub fn pending_tasks(&self) -> usize {
        self.scheduler.pending()
    }
}

impl Drop for ViewCoordinator {
    fn drop(&mut self) {
        self.token.get_mut().cancel();
        self.scheduler.cancel_all();
    }
}
