//! Integration tests for the Mentorboard tracker
//!
//! Drives a whole session through [`ViewCoordinator`] against the in-memory
//! remote with the tokio clock paused:
//! - debounced expansion and delayed week changes
//! - target editing round trip and offset translation
//! - rate-limited and failed fetches and writes
//! - refresh superseding an earlier warm-up

use std::sync::Arc;
use std::time::Duration;

use mentorboard_common::{AgentId, MentorContext, MetricKind, TrackerError, Week, WeekKey};
use mentorboard_tracker::remote::{CountRecord, RemoteCall, RemoteOp, SnapshotRecord};
use mentorboard_tracker::{
    Fixture, InMemoryRemote, NoticeLevel, TimingSettings, ViewCoordinator,
};

const ANA: AgentId = AgentId(101);
const BEN: AgentId = AgentId(102);
const CHEN: AgentId = AgentId(103);

fn week(n: u8) -> Week {
    Week::new(n).unwrap()
}

/// Test harness: sample fixture, 50 ms remote latency, default timings
struct TestHarness {
    remote: Arc<InMemoryRemote>,
    coordinator: ViewCoordinator,
}

impl TestHarness {
    fn new() -> Self {
        let remote = Arc::new(
            InMemoryRemote::from_fixture(Fixture::sample()).with_latency(Duration::from_millis(50)),
        );
        // Ana, week 3: five calls logged, no targets set yet
        remote.set_snapshot(
            WeekKey::new(ANA, week(3)),
            SnapshotRecord {
                actions: vec![CountRecord { metric_id: 1, count: 5 }],
                ..Default::default()
            },
        );
        let coordinator = ViewCoordinator::new(
            remote.clone(),
            MentorContext::new(7, "Dana Mentor"),
            TimingSettings::default(),
        );
        Self { remote, coordinator }
    }

    async fn started() -> Self {
        let harness = Self::new();
        harness.coordinator.start().await.unwrap();
        harness.settle().await;
        harness
    }

    /// Let every stagger and debounce task run to completion
    async fn settle(&self) {
        tokio::time::sleep(Duration::from_secs(5)).await;
    }

    /// Expand `agent` on `week` and wait for its row to load
    async fn open_row(&self, agent: AgentId, week: Week) {
        self.coordinator.select_week(agent, week);
        self.coordinator.expand_agent(agent);
        self.settle().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_double_expand_inside_debounce_issues_one_call_pair() {
    let harness = TestHarness::new();
    let key = WeekKey::new(CHEN, Week::FIRST);

    harness.coordinator.expand_agent(CHEN);
    tokio::time::sleep(Duration::from_millis(150)).await;
    harness.coordinator.expand_agent(CHEN);
    harness.settle().await;

    assert_eq!(harness.remote.calls(RemoteCall::Snapshot(key)), 1);
    assert_eq!(harness.remote.calls(RemoteCall::TargetSet(key)), 1);
    assert!(harness.coordinator.snapshot(&key).is_some());
    assert!(harness.coordinator.targets(&key).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_expand_skips_snapshot_already_warmed() {
    let harness = TestHarness::started().await;
    let key = WeekKey::new(BEN, Week::FIRST);
    assert_eq!(harness.remote.calls(RemoteCall::Snapshot(key)), 1);

    harness.open_row(BEN, Week::FIRST).await;
    assert_eq!(harness.remote.calls(RemoteCall::Snapshot(key)), 1);
    assert_eq!(harness.remote.calls(RemoteCall::TargetSet(key)), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unset_target_is_zero_and_incomplete() {
    let harness = TestHarness::started().await;
    let key = WeekKey::new(ANA, week(3));
    harness.open_row(ANA, week(3)).await;

    assert_eq!(harness.coordinator.target(MetricKind::Action, 0, &key), 0);
    let progress = harness.coordinator.progress(&key);
    let calls = progress.metric(MetricKind::Action, 0).unwrap();
    assert_eq!(calls.name, "Calls");
    assert_eq!(calls.observed, 5);
    assert!(!calls.complete);
    assert_eq!(progress.category(MetricKind::Action).complete, 0);
}

#[tokio::test(start_paused = true)]
async fn test_saved_target_round_trips_into_progress() {
    let harness = TestHarness::started().await;
    let key = WeekKey::new(ANA, week(3));
    harness.open_row(ANA, week(3)).await;

    let coordinator = &harness.coordinator;
    coordinator.open_target_editor(ANA, week(3));
    coordinator.focus_target_metric(MetricKind::Action, 0).unwrap();
    coordinator.set_target_draft_value(5).unwrap();
    coordinator.save_target().await.unwrap();

    assert!(coordinator.editor().is_none());
    assert_eq!(harness.remote.calls(RemoteCall::TargetSet(key)), 2);
    assert_eq!(coordinator.target(MetricKind::Action, 0, &key), 5);

    let actions = coordinator.progress(&key).category(MetricKind::Action).clone();
    assert_eq!(actions.complete, 1);
    assert_eq!(actions.total, 3);
    assert!((actions.ratio - 1.0 / 3.0).abs() < f64::EPSILON);

    let notices = coordinator.notices().drain();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Success);
    assert_eq!(notices[0].key, Some(key));
}

#[tokio::test(start_paused = true)]
async fn test_skillset_positions_map_to_offset_ids_everywhere() {
    let harness = TestHarness::started().await;
    let key = WeekKey::new(CHEN, Week::FIRST);
    harness.open_row(CHEN, Week::FIRST).await;

    let coordinator = &harness.coordinator;
    for position in 0..2 {
        coordinator.open_target_editor(CHEN, Week::FIRST);
        coordinator.focus_target_metric(MetricKind::Skillset, position).unwrap();
        coordinator.set_target_draft_value(50 + position as u32).unwrap();
        coordinator.save_target().await.unwrap();
    }

    let sent = harness.remote.submitted_updates();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].metric_id, 8);
    assert_eq!(sent[1].metric_id, 9);
    assert!(sent.iter().all(|u| u.mentor_id == 7 && u.kind == MetricKind::Skillset));

    let progress = coordinator.progress(&key);
    for position in 0..2 {
        assert_eq!(coordinator.target(MetricKind::Skillset, position, &key), 50 + position as u32);
        let metric = progress.metric(MetricKind::Skillset, position).unwrap();
        assert_eq!(metric.metric_id, position as u32 + 8);
        assert_eq!(metric.target, 50 + position as u32);
    }
    // Chen's Negotiation score is round((80 + 65 + 70) / 3) = 72
    assert_eq!(progress.metric(MetricKind::Skillset, 0).unwrap().observed, 72);
    assert_eq!(progress.metric(MetricKind::Skillset, 0).unwrap().display_percentage, Some(72));
}

#[tokio::test(start_paused = true)]
async fn test_rejected_save_keeps_editor_open() {
    let harness = TestHarness::started().await;
    let key = WeekKey::new(ANA, Week::FIRST);
    harness.open_row(ANA, Week::FIRST).await;

    let coordinator = &harness.coordinator;
    coordinator.open_target_editor(ANA, Week::FIRST);
    coordinator.focus_target_metric(MetricKind::Requirement, 1).unwrap();
    coordinator.set_target_draft_value(2).unwrap();

    harness.remote.fail_next(
        RemoteCall::TargetUpdate(key),
        TrackerError::Server { status: 500, message: "boom".into() },
    );
    assert!(coordinator.save_target().await.is_err());

    let editor = coordinator.editor().unwrap();
    assert_eq!(editor.draft, Some(2));
    assert!(matches!(editor.last_error, Some(TrackerError::Server { status: 500, .. })));
    assert!(coordinator.targets(&key).is_some());

    let notices = coordinator.notices().drain();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);

    // Retry from the same editor
    coordinator.save_target().await.unwrap();
    assert!(coordinator.editor().is_none());
    assert_eq!(coordinator.target(MetricKind::Requirement, 1, &key), 2);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_save_is_quiet() {
    let harness = TestHarness::started().await;
    let key = WeekKey::new(BEN, Week::FIRST);

    let coordinator = &harness.coordinator;
    coordinator.open_target_editor(BEN, Week::FIRST);
    coordinator.focus_target_metric(MetricKind::Action, 2).unwrap();
    coordinator.set_target_draft_value(1).unwrap();
    harness.remote.fail_next(RemoteCall::TargetUpdate(key), TrackerError::RateLimited);

    assert_eq!(coordinator.save_target().await, Err(TrackerError::RateLimited));
    assert_eq!(coordinator.editor().unwrap().last_error, Some(TrackerError::RateLimited));
    assert!(coordinator.notices().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_snapshot_is_silent_until_refresh() {
    let harness = TestHarness::new();
    let key = WeekKey::new(BEN, Week::FIRST);
    harness.remote.fail_next(RemoteCall::Snapshot(key), TrackerError::RateLimited);

    harness.coordinator.start().await.unwrap();
    harness.settle().await;

    assert!(harness.coordinator.notices().is_empty());
    assert!(!harness.coordinator.is_loading(&key));
    assert!(harness.coordinator.snapshot(&key).is_none());
    assert_eq!(harness.coordinator.last_error(&key), Some(TrackerError::RateLimited));
    // Other agents loaded regardless
    assert!(harness.coordinator.snapshot(&WeekKey::new(CHEN, Week::FIRST)).is_some());

    harness.coordinator.refresh_all().await.unwrap();
    harness.settle().await;

    assert_eq!(harness.remote.calls(RemoteCall::Snapshot(key)), 2);
    assert!(harness.coordinator.snapshot(&key).is_some());
    assert!(harness.coordinator.last_error(&key).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_malformed_snapshot_surfaces_notice() {
    let harness = TestHarness::new();
    let key = WeekKey::new(ANA, week(2));
    harness.remote.set_snapshot(
        key,
        SnapshotRecord {
            actions: vec![CountRecord { metric_id: 0, count: 1 }],
            ..Default::default()
        },
    );
    harness.coordinator.start().await.unwrap();
    harness.open_row(ANA, week(2)).await;

    assert!(harness.coordinator.snapshot(&key).is_none());
    assert!(matches!(
        harness.coordinator.last_error(&key),
        Some(TrackerError::Malformed(_))
    ));
    let notices = harness.coordinator.notices().drain();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].key, Some(key));
}

#[tokio::test(start_paused = true)]
async fn test_refresh_supersedes_pending_warm_up() {
    let harness = TestHarness::new();
    harness.coordinator.start().await.unwrap();
    // Nothing from the first warm-up has run yet
    harness.coordinator.refresh_all().await.unwrap();
    harness.settle().await;

    assert_eq!(harness.remote.total_calls(RemoteOp::Snapshot), 3);
    assert_eq!(harness.remote.calls(RemoteCall::Roster), 2);
    assert_eq!(harness.remote.calls(RemoteCall::Catalog), 1);
    for agent in [ANA, BEN, CHEN] {
        let key = WeekKey::new(agent, Week::FIRST);
        assert!(harness.coordinator.progress(&key).has_snapshot);
    }
    assert_eq!(harness.coordinator.pending_tasks(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_forces_expanded_row_targets() {
    let harness = TestHarness::started().await;
    let key = WeekKey::new(ANA, Week::FIRST);
    harness.open_row(ANA, Week::FIRST).await;
    assert_eq!(harness.remote.calls(RemoteCall::TargetSet(key)), 1);

    harness.coordinator.refresh_all().await.unwrap();
    assert_eq!(harness.remote.calls(RemoteCall::TargetSet(key)), 2);
    harness.settle().await;
    assert_eq!(harness.remote.calls(RemoteCall::Snapshot(key)), 2);
}

#[tokio::test(start_paused = true)]
async fn test_overview_counts_loaded_weeks() {
    let harness = TestHarness::started().await;
    harness.open_row(ANA, Week::FIRST).await;
    harness.open_row(ANA, week(3)).await;

    let overview = harness.coordinator.overview(ANA).unwrap();
    assert_eq!(overview.weeks_loaded, 2);
    assert_eq!(overview.best_week, Some(Week::FIRST));
    assert!(harness.coordinator.overview(AgentId(999)).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_teardown_stops_pending_expansion() {
    let harness = TestHarness::started().await;
    let key = WeekKey::new(CHEN, week(5));

    harness.coordinator.select_week(CHEN, week(5));
    harness.coordinator.expand_agent(CHEN);
    harness.coordinator.teardown();
    harness.settle().await;

    assert_eq!(harness.remote.calls(RemoteCall::TargetSet(key)), 0);
    assert!(harness.coordinator.snapshot(&key).is_none());
    assert!(harness.coordinator.expanded_agent().is_none());
}
