//! Mentorboard demo binary
//!
//! Runs one session against an in-memory remote seeded from a JSON fixture
//! (or the built-in sample) and logs every agent's weekly progress.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use mentorboard_common::WeekKey;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mentorboard_tracker::{
    config::TrackerConfig, Fixture, InMemoryRemote, ProgressCalculator, ViewCoordinator,
    TRACKER_VERSION,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Mentorboard tracker v{}", TRACKER_VERSION);

    // Load configuration
    let config = TrackerConfig::load()?;
    info!("Loaded configuration: {:?}", config);

    let fixture = match &config.fixture {
        Some(path) => {
            let json = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading fixture {}", path.display()))?;
            Fixture::from_json(&json)?
        }
        None => Fixture::sample(),
    };
    let remote = Arc::new(InMemoryRemote::from_fixture(fixture));
    let coordinator = ViewCoordinator::from_config(remote, &config);

    coordinator.start().await?;
    let agents = coordinator.roster().unwrap_or_default();
    info!(
        "Roster loaded: {} agents for mentor {}",
        agents.len(),
        coordinator.mentor().display_name
    );

    // Expand each row in turn so targets load alongside the warmed snapshots
    for agent in agents.iter() {
        coordinator.expand_agent(agent.id);
        tokio::time::sleep(config.timing.expand_debounce() + Duration::from_millis(50)).await;
    }
    coordinator.collapse_agent();

    // Wait out the stagger warm-up
    let slots = u32::try_from(agents.len()).unwrap_or(u32::MAX);
    let warm_up = config.timing.stagger_step().saturating_mul(slots);
    tokio::time::sleep(warm_up).await;

    for agent in agents.iter() {
        let key = WeekKey::new(agent.id, coordinator.selected_week(agent.id));
        if let Some(err) = coordinator.last_error(&key) {
            warn!(agent = %agent.id, error = %err, "Progress incomplete");
        }
        let progress = coordinator.progress(&key);
        info!(
            agent = %agent.id,
            week = %key.week,
            "{} progress {}",
            agent.name,
            serde_json::to_string(&progress)?
        );
        for metric in &progress.metrics {
            if let Some(percentage) = metric.display_percentage {
                info!(
                    agent = %agent.id,
                    "{} {}",
                    metric.name,
                    ProgressCalculator::format_percentage(percentage)
                );
            }
        }
        if let Some(overview) = coordinator.overview(agent.id) {
            info!(agent = %agent.id, "Overview {}", serde_json::to_string(&overview)?);
        }
    }

    for notice in coordinator.notices().drain() {
        info!(level = ?notice.level, "{}", notice.message);
    }

    coordinator.teardown();
    info!("Shutting down Mentorboard tracker");
    Ok(())
}
