//! Swap Submitter - token swap submission service
//!
//! Accepts confirmed swap quotes over HTTP, approves and executes them on
//! chain, and reports each swap's progress.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

use swap_submitter::api::{self, AppState};
use swap_submitter::chain::ChainProvider;
use swap_submitter::config::Settings;
use swap_submitter::metrics::{self, MetricsServer};
use swap_submitter::state::SwapRegistry;
use swap_submitter::swap::{HttpExecutionQuoteClient, SwapOrchestrator};
use swap_submitter::tx::TransactionSender;

/// Seconds between chain health checks
const HEALTH_CHECK_INTERVAL_SECS: u64 = 30;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    info!("Starting Swap Submitter v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let settings = Settings::load()?;
    info!(
        "Loaded configuration for chain {} ({})",
        settings.chain.name, settings.chain.chain_id
    );

    // Connect to the chain
    let provider = Arc::new(ChainProvider::new(settings.chain.clone())?);
    provider
        .verify_chain_id()
        .await
        .context("Chain verification failed")?;

    let sender = TransactionSender::new(
        provider.clone(),
        &settings.wallet,
        settings.submitter.clone(),
    )
    .await
    .context("Failed to initialize transaction sender")?;

    let quote_client = HttpExecutionQuoteClient::new(&settings.swap)?;

    let orchestrator = Arc::new(SwapOrchestrator::new(
        Arc::new(sender),
        Arc::new(quote_client),
        settings.swap.max_slippage_percent,
    ));
    info!(
        "Swap orchestrator initialized with {}% max slippage",
        settings.swap.max_slippage_percent
    );

    // Track swap progress for the API
    let registry = Arc::new(SwapRegistry::new());
    let tracker_handle = tokio::spawn({
        let registry = registry.clone();
        let events = orchestrator.subscribe();
        async move { registry.track(events).await }
    });

    // Start API server
    let api_handle = tokio::spawn({
        let config = settings.api.clone();
        let state = AppState {
            registry: registry.clone(),
            orchestrator: orchestrator.clone(),
            provider: provider.clone(),
        };
        async move {
            if let Err(e) = api::run_server(config, state).await {
                error!("API server error: {}", e);
            }
        }
    });

    // Start metrics server
    let metrics_handle = if settings.metrics.enabled {
        let server = MetricsServer::new(settings.metrics.port);
        Some(tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("Metrics server error: {}", e);
            }
        }))
    } else {
        None
    };

    // Health check and swap record pruning loop
    let health_handle = tokio::spawn({
        let provider = provider.clone();
        let registry = registry.clone();
        let record_ttl = chrono::Duration::seconds(settings.api.record_ttl_secs as i64);
        async move {
            loop {
                tokio::time::sleep(tokio::time::Duration::from_secs(HEALTH_CHECK_INTERVAL_SECS))
                    .await;

                let healthy = provider.health_check().await;
                metrics::record_chain_health(provider.chain_id(), healthy);
                if healthy {
                    metrics::record_health_check();
                } else {
                    warn!("Chain {} health check failed", provider.chain_id());
                    metrics::record_health_check_failure();
                }

                registry.prune_terminal(record_ttl);
            }
        }
    });

    info!("Swap Submitter is running");
    info!("API server: http://{}:{}", settings.api.host, settings.api.port);
    if settings.metrics.enabled {
        info!("Metrics: http://0.0.0.0:{}/metrics", settings.metrics.port);
    }

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutdown signal received, stopping...");

    // In-flight swaps are abandoned; the user restarts them
    let stats = registry.get_stats();
    if stats.approving + stats.executing > 0 {
        warn!(
            "Abandoning {} in-flight swaps",
            stats.approving + stats.executing
        );
    }

    api_handle.abort();
    health_handle.abort();
    tracker_handle.abort();
    if let Some(h) = metrics_handle {
        h.abort();
    }

    info!("Swap Submitter stopped");
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,swap_submitter=debug,hyper=warn"));

    // LOG_FORMAT=json switches to one JSON object per line
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_thread_ids(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
