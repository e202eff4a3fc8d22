//! Bank Marketing Predictor - Main Entry Point
//!
//! Loads the trained artifacts once, then serves the input form and the
//! prediction API until interrupted.

use anyhow::{Context, Result};
use bank_marketing_predictor::{
    config::{AppConfig, LoggingConfig},
    metrics::{MetricsReporter, PredictionMetrics},
    models::{inference::InferenceEngine, loader::ArtifactLoader},
    server::{build_router, AppState},
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Serve subscription predictions for bank marketing campaigns.
#[derive(Parser)]
#[command(name = "bank-marketing-predictor", version)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = AppConfig::DEFAULT_PATH)]
    config: PathBuf,

    /// Override the bind address from the configuration.
    #[arg(short, long)]
    bind: Option<String>,
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    // RUST_LOG wins over the configured level
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&logging.level)
            .with_context(|| format!("Invalid logging.level {:?}", logging.level))?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::load_from_path(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config.display()))?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    init_logging(&config.logging)?;
    info!("Starting Bank Marketing Predictor");
    info!(
        "Decision threshold: {:.2}, positive class: {}",
        config.prediction.decision_threshold, config.prediction.positive_class
    );

    // Artifacts are loaded exactly once; any failure is fatal
    let artifacts = ArtifactLoader::new(&config.artifacts)
        .load()
        .context("Failed to load trained artifacts")?;
    let engine = Arc::new(InferenceEngine::new(artifacts, &config.prediction));

    let metrics = Arc::new(PredictionMetrics::new());
    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    } else {
        warn!("Periodic metrics reporting disabled");
    }

    let state = AppState::new(engine, metrics.clone(), config.prediction.insight.clone());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    info!("Serving prediction form on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await
        .context("Server error")?;

    info!("Predictor shutting down...");
    metrics.print_summary();

    Ok(())
}
