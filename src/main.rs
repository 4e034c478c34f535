//! Pomodoro Server - per-user Pomodoro timers behind an HTTP API
//!
//! This is the main entry point for the pomodoro-server application.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use pomodoro_server::{
    api::create_router,
    config::Config,
    state::AppState,
    storage::{CachedStore, SqliteStore, TimerStore},
    tasks::orphan_sweep_task,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("pomodoro_server={},tower_http=info", config.log_level()))
        .init();

    info!("Starting pomodoro-server v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: host={}, port={}, database={}, tick={}ms, orphans={:?}",
        config.host, config.port, config.database, config.tick_ms, config.orphan_policy
    );

    let db = Arc::new(if config.database == ":memory:" {
        SqliteStore::open_in_memory()?
    } else {
        SqliteStore::open(&config.database)?
    });

    let timer_store: Arc<dyn TimerStore> = match config.cache_ttl() {
        Some(ttl) => {
            info!("Timer cache enabled (ttl {:?})", ttl);
            Arc::new(CachedStore::new(db.clone(), ttl))
        }
        None => db.clone(),
    };

    let state = Arc::new(AppState::new(
        timer_store,
        db.clone(),
        db,
        config.tick_interval(),
        config.port,
        config.host.clone(),
    ));

    // Timers flagged running by a previous process have no driver anymore
    let report = state.timer.reconcile_orphans(config.orphan_policy).await?;
    if !report.is_empty() {
        warn!(
            "Recovered orphaned timers on startup: stopped {:?}, resumed {:?}",
            report.stopped, report.resumed
        );
    }

    if let Some(period) = config.sweep_interval() {
        let sweep_state = state.clone();
        let policy = config.orphan_policy;
        tokio::spawn(async move {
            orphan_sweep_task(sweep_state, policy, period).await;
        });
    }

    // Create HTTP router with all endpoints
    let app = create_router(state);

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints (identity via X-User-Id header):");
    info!("  GET    /pomodoro-settings        - Timer settings (created on first fetch)");
    info!("  GET    /pomodoro-timer-status    - Live countdown status");
    info!("  POST   /pomodoro-update-settings - Update durations and auto-transition");
    info!("  POST   /pomodoro-start           - Start the timer");
    info!("  POST   /pomodoro-stop            - Stop the timer");
    info!("  POST   /pomodoro-phase           - Switch phase");
    info!("  POST   /pomodoro-auto-mode       - Toggle auto-transition");
    info!("  POST   /pomodoro-reset           - Reset the long-break cycle");
    info!("  GET    /stats                    - Streaks and hours");
    info!("  POST   /stats/update-streak      - Count today's visit");
    info!("  POST   /start-session            - Open a usage session");
    info!("  POST   /end-session              - Close the usage session");
    info!("  GET    /tasks                    - Task list (hideCompleted, showTodayOnly)");
    info!("  POST   /tasks-create             - Create a task");
    info!("  PUT    /task/...                 - Edit, complete, reorder tasks");
    info!("  DELETE /task/...                 - Delete one, all or completed tasks");
    info!("  DELETE /user-data                - Remove all user data");
    info!("  GET    /health                   - Health check");

    // Setup graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            info!("Shutdown signal received");
        })
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
