//! Entry point for the Traverse rover bot.
//!
//! The runner joins a game (over HTTP, or against the in-process simulator
//! when `TRAVERSE_OFFLINE=true`), warms the knowledge base from the terrain
//! cache, and plays one mission to the end.
//!
//! # Flow
//!
//! ```text
//! join teams --> load terrain cache --> play --> final snapshot + report
//!                                        |
//!                              periodic snapshots, Ctrl-C cancels
//! ```

mod config;
mod error;
mod offline;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use traverse_client::HttpArbiter;
use traverse_core::arbiter::Arbiter;
use traverse_core::cancel::CancelScope;
use traverse_core::config::MissionConfig;
use traverse_core::mission::{Mission, MissionReport};
use traverse_core::names::RandomNames;
use traverse_types::LowResTile;
use traverse_world::{KnowledgeBase, terrain_cache};

use crate::config::RunnerConfig;
use crate::offline::offline_arbiter;

/// Application entry point.
///
/// Initializes logging, loads configuration, and runs one mission against
/// the configured arbiter.
///
/// # Errors
///
/// Returns an error if configuration is invalid or no team can join.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    info!("traverse-runner starting");

    let config = RunnerConfig::from_env()?;
    let mission_config = match &config.config_path {
        Some(path) => MissionConfig::from_file(path)
            .with_context(|| format!("loading mission config {}", path.display()))?,
        None => MissionConfig::parse("")?,
    };
    info!(
        server_url = config.server_url,
        offline = config.offline,
        cache_dir = ?config.cache_dir,
        game_id = mission_config.game_id,
        teams = mission_config.teams,
        recon_teams = mission_config.recon_teams,
        strategy = ?mission_config.effective_strategy(),
        heuristic = ?mission_config.heuristic,
        "configuration loaded"
    );

    let report = if config.offline {
        let arbiter = Arc::new(offline_arbiter(config.offline_seed));
        run(arbiter, &config, mission_config).await?
    } else {
        let arbiter = Arc::new(HttpArbiter::new(&config.server_url)?);
        run(arbiter, &config, mission_config).await?
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Join, warm the cache, and play one mission.
async fn run<A: Arbiter + 'static>(
    arbiter: Arc<A>,
    config: &RunnerConfig,
    mission_config: MissionConfig,
) -> anyhow::Result<MissionReport> {
    let knowledge = Arc::new(KnowledgeBase::new());
    let mut mission = Mission::new(
        arbiter,
        Arc::clone(&knowledge),
        mission_config,
        RandomNames::new(),
    );
    mission.join_configured().await?;

    let tiles: Vec<LowResTile> = mission.board().map(|b| b.tiles.clone()).unwrap_or_default();
    if let Some(dir) = &config.cache_dir {
        match terrain_cache::load_into(&knowledge, dir, &tiles) {
            Ok(loaded) => info!(loaded, known = knowledge.len(), "terrain cache loaded"),
            Err(err) => warn!(error = %err, "terrain cache unreadable, starting cold"),
        }
    }

    let interrupt = mission.scope().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling mission");
            interrupt.cancel();
        }
    });

    let snapshots = CancelScope::new();
    let snapshot_task = config.cache_dir.clone().map(|dir| {
        tokio::spawn(snapshot_loop(
            Arc::clone(&knowledge),
            dir,
            tiles.clone(),
            config.snapshot_interval,
            snapshots.clone(),
        ))
    });

    let report = mission.play().await;

    snapshots.cancel();
    if let Some(task) = snapshot_task {
        if let Err(err) = task.await {
            warn!(error = %err, "snapshot task did not finish");
        }
    }
    if let Some(dir) = &config.cache_dir {
        save_snapshot(&knowledge, dir, &tiles);
    }

    info!(
        state = ?report.state,
        winner = ?report.winner,
        known_cells = report.known_cells,
        "run complete"
    );
    Ok(report)
}

/// Save the knowledge base every `interval` until `scope` is cancelled.
async fn snapshot_loop(
    knowledge: Arc<KnowledgeBase>,
    dir: PathBuf,
    tiles: Vec<LowResTile>,
    interval: Duration,
    scope: CancelScope,
) {
    while scope.sleep(interval).await {
        save_snapshot(&knowledge, &dir, &tiles);
    }
}

fn save_snapshot(knowledge: &KnowledgeBase, dir: &std::path::Path, tiles: &[LowResTile]) {
    match terrain_cache::save(knowledge, dir, tiles) {
        Ok(Some(path)) => info!(path = %path.display(), cells = knowledge.len(), "terrain snapshot saved"),
        Ok(None) => {}
        Err(err) => warn!(error = %err, "terrain snapshot failed"),
    }
}
