use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use postframe_pipeline::{ActionExecutor, PipelineConfig};
use postframe_worker::{maintenance, MappingWorker, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    // --- Configuration ---
    let pipeline_config = PipelineConfig::from_env().context("Invalid pipeline configuration")?;
    let worker_config = WorkerConfig::from_env().context("Invalid worker configuration")?;
    tracing::info!(
        batch_size = pipeline_config.batch_size,
        page_size = pipeline_config.page_size,
        poll_interval_ms = worker_config.poll_interval.as_millis() as u64,
        "Loaded worker configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = postframe_db::create_pool(&database_url)
        .await
        .context("Failed to connect to database")?;
    postframe_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    tracing::info!("Database connection pool created");

    // --- Background tasks ---
    let cancel = CancellationToken::new();
    let executor = Arc::new(ActionExecutor::new(pool.clone(), &pipeline_config, None));
    let worker = MappingWorker::new(executor, &worker_config);

    let mut handles = Vec::new();
    let worker_cancel = cancel.clone();
    handles.push(tokio::spawn(async move {
        worker.run(worker_cancel).await;
    }));
    handles.push(tokio::spawn(maintenance::run_stale_recovery(
        pool.clone(),
        worker_config.stale_check_interval,
        worker_config.stale_after,
        cancel.clone(),
    )));
    if let Some(every) = worker_config.purge_interval {
        handles.push(tokio::spawn(maintenance::run_event_purge(
            pool.clone(),
            every,
            cancel.clone(),
        )));
    }

    shutdown_signal().await;
    cancel.cancel();
    for handle in handles {
        let _ = tokio::time::timeout(Duration::from_secs(30), handle).await;
    }
    pool.close().await;
    tracing::info!("Worker shut down");
    Ok(())
}

/// `EnvFilter` from `RUST_LOG`; JSON lines when `LOG_FORMAT=json`.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "postframe_worker=debug,postframe_pipeline=debug".into());
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
