use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use postframe_api::config::ServerConfig;
use postframe_api::router::build_app_router;
use postframe_api::state::AppState;
use postframe_events::{EventBus, EventLog};
use postframe_pipeline::{ActionExecutor, PipelineConfig, TriggerDispatcher, TriggerListener};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    // --- Configuration ---
    let config = ServerConfig::from_env().context("Invalid server configuration")?;
    let pipeline_config = PipelineConfig::from_env().context("Invalid pipeline configuration")?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        dispatch_mode = %pipeline_config.dispatch_mode,
        "Loaded server configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = postframe_db::create_pool(&database_url)
        .await
        .context("Failed to connect to database")?;
    postframe_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    tracing::info!("Database health check passed");

    postframe_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    let cancel = CancellationToken::new();
    let log_handle = tokio::spawn(EventLog::run(event_bus.subscribe()));

    // --- Mapping pipeline ---
    let executor = Arc::new(ActionExecutor::new(
        pool.clone(),
        &pipeline_config,
        Some(Arc::clone(&event_bus)),
    ));
    let dispatcher = Arc::new(TriggerDispatcher::new(executor, &pipeline_config));
    let listener_handle = tokio::spawn(TriggerListener::run(
        Arc::clone(&dispatcher),
        event_bus.subscribe(),
        cancel.clone(),
    ));

    // --- App state ---
    let state = AppState {
        pool: pool.clone(),
        config: Arc::new(config.clone()),
        dispatcher,
        event_bus: Arc::clone(&event_bus),
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = config.bind_addr().context("Invalid HOST or PORT")?;
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // --- Cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);

    cancel.cancel();
    if tokio::time::timeout(shutdown_timeout, listener_handle)
        .await
        .is_err()
    {
        tracing::warn!("Trigger listener did not stop in time");
    }

    // Dropping the last bus handle closes the channel and ends the event log.
    drop(event_bus);
    let _ = tokio::time::timeout(shutdown_timeout, log_handle).await;

    pool.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// `EnvFilter` from `RUST_LOG`; JSON lines when `LOG_FORMAT=json`.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "postframe_api=debug,postframe_pipeline=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT (Ctrl-C), shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
