//! TenderDesk API Gateway
//!
//! Entry point: loads configuration, prepares the store and capabilities,
//! then serves the router until a shutdown signal arrives.

use anyhow::Context;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tenderdesk_common::{
    config::{AppConfig, ObservabilityConfig},
    db::DbPool,
    extraction::create_extractor,
    metrics::{self, LATENCY_BUCKETS},
    prediction::create_predictor,
};
use tenderdesk_gateway::{create_router, AppState};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// How often idle rate-limit buckets are dropped
const LIMITER_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing
    init_tracing(&config.observability);

    info!("Starting TenderDesk API Gateway v{}", tenderdesk_common::VERSION);

    if config.uses_dev_secret() {
        warn!("auth.jwt_secret is the development default; set APP__AUTH__JWT_SECRET in production");
    }

    // Initialize metrics
    let metrics_handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            LATENCY_BUCKETS,
        )?
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;
    metrics::register_metrics();

    // Initialize database connection
    let pool = DbPool::new(&config.database).await?;

    // Scoring model and document extraction
    let prediction_config = config.prediction.clone();
    let predictor = tokio::task::spawn_blocking(move || create_predictor(&prediction_config))
        .await
        .context("Scoring model initialisation panicked")?;
    info!(model = predictor.model_name(), "Scoring model ready");

    let extractor = create_extractor(&config.extraction);
    info!(extractor = extractor.name(), "Text extraction ready");

    tokio::fs::create_dir_all(&config.server.upload_dir)
        .await
        .with_context(|| format!("Failed to create {}", config.server.upload_dir.display()))?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server.host / server.port")?;
    let seed_demo_user = config.bootstrap.demo_user;

    // Create app state
    let state = AppState::new(config, pool, predictor, extractor, Some(metrics_handle));

    if seed_demo_user {
        if let Err(e) = state.accounts.ensure_demo_user().await {
            warn!(error = %e, "Failed to create demo user");
        }
    }

    let limits = state.limits.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(LIMITER_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            limits.retain_recent();
        }
    });

    // Build the router
    let app = create_router(state);

    // Start the server
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
