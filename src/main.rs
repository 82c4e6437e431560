//! PROPEDGE: player-prop edge scoring and parlay ranking engine
//!
//! Entry point. Loads configuration, initialises structured logging,
//! restores saved snapshots, starts the dashboard and runs the feed
//! refresh loop with graceful shutdown.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use propedge::analytics::export;
use propedge::config;
use propedge::dashboard::{self, routes::{AppState, DashboardState, RefreshLogEntry}};
use propedge::engine::board::SlateBoard;
use propedge::engine::feed::FileFeed;
use propedge::engine::refresher::{RefreshReport, Refresher};
use propedge::storage::{self, ProjectionStore};
use propedge::strategy::Pipeline;
use propedge::types::{FilterCriteria, ViewRequest};

const BANNER: &str = r#"
 ____  ____   ___  ____  _____ ____   ____ _____
|  _ \|  _ \ / _ \|  _ \| ____|  _ \ / ___| ____|
| |_) | |_) | | | | |_) |  _| | | | | |  _|  _|
|  __/|  _ <| |_| |  __/| |___| |_| | |_| | |___
|_|   |_| \_\\___/|_|   |_____|____/ \____|_____|

  Player-prop edge scoring and parlay ranking
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML
    let cfg = config::AppConfig::load(&config::AppConfig::default_path())?;

    // Initialise structured logging
    init_logging();

    // Print startup banner
    println!("{BANNER}");
    info!(
        service = %cfg.service.name,
        refresh_interval_secs = cfg.service.refresh_interval_secs,
        feed = %cfg.feed.path,
        "PROPEDGE starting up"
    );

    // Invalid engine parameters are fatal before anything runs.
    let pipeline_config = cfg.pipeline().context("Invalid [engine] configuration")?;
    let pipeline = Pipeline::new(pipeline_config)?;

    // -- Restore or create store -----------------------------------------

    let store_path = cfg.storage.path.as_deref();
    let store = match store_path {
        Some(path) => match storage::load_store(Some(path))? {
            Some(store) => {
                info!(slates = store.len(), "Resumed from saved snapshots");
                store
            }
            None => ProjectionStore::new(),
        },
        None => ProjectionStore::new(),
    };

    let board = Arc::new(SlateBoard::new(pipeline, store));
    let refresher = Refresher::new(Arc::new(FileFeed::new(&cfg.feed.path)), Arc::clone(&board));

    let state: AppState = Arc::new(DashboardState::new(
        Arc::clone(&board),
        &cfg.dashboard.default_sport,
        &cfg.dashboard.default_slate,
    ));
    if cfg.dashboard.enabled {
        dashboard::spawn_dashboard(Arc::clone(&state), cfg.dashboard.port);
    }

    // -- Main loop -------------------------------------------------------

    let mut interval = tokio::time::interval(Duration::from_secs(cfg.service.refresh_interval_secs.max(1)));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        interval_secs = cfg.service.refresh_interval_secs,
        "Entering refresh loop. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match refresher.refresh().await {
                    Ok(report) => {
                        state.record_refresh(log_entry(&report, "ok")).await;
                        if let Some(path) = store_path {
                            if let Err(e) = board.save(Some(path)).await {
                                error!(error = %e, "Failed to save snapshots");
                            }
                        }
                        if let Some(path) = cfg.output.export_path.as_deref() {
                            if let Err(e) = export_default_view(&state, path).await {
                                error!(error = %e, "Export failed");
                            }
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "Refresh failed, serving previous snapshots");
                        state.record_refresh(log_entry(&RefreshReport::default(), "failed")).await;
                    }
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    if let Some(path) = store_path {
        board.save(Some(path)).await?;
    }
    info!(slates = board.slates().await.len(), "PROPEDGE shut down cleanly.");

    Ok(())
}

fn log_entry(report: &RefreshReport, status: &str) -> RefreshLogEntry {
    RefreshLogEntry {
        timestamp: chrono::Utc::now().to_rfc3339(),
        batches: report.batches,
        props_received: report.props_received,
        slates: report.summaries.iter().map(|s| s.source.to_string()).collect(),
        status: status.to_string(),
    }
}

/// Write the unfiltered default-slate view.
async fn export_default_view(state: &DashboardState, path: &str) -> Result<()> {
    let Some(evaluation) = state
        .board
        .evaluation(&state.default_sport, &state.default_slate)
        .await
    else {
        warn!(
            sport = %state.default_sport,
            slate = %state.default_slate,
            "Default slate not in feed, nothing to export"
        );
        return Ok(());
    };

    let request = ViewRequest {
        criteria: FilterCriteria::new(&state.default_sport, &state.default_slate),
        ..ViewRequest::default()
    };
    export::write_view(path, &evaluation.view(&request), &evaluation.summary)
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("propedge=info"));

    let json_logging = std::env::var("PROPEDGE_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
