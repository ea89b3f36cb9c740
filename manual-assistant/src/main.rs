use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod api;
mod assistants;
mod config;
mod error;
mod i18n;
mod search;
mod service;
mod tools;

#[cfg(test)]
mod test_support;

use crate::api::AppState;
use crate::config::AppConfig;
use crate::i18n::I18n;
use crate::service::GatewayService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_logging();

    info!(
        "Starting manual assistant gateway v{}",
        env!("CARGO_PKG_VERSION")
    );

    let config = AppConfig::load()?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        locale = %config.locale,
        "Configuration loaded"
    );

    let metrics = PrometheusBuilder::new().install_recorder()?;

    let i18n = Arc::new(I18n::new(&config.locale));
    let shutdown = CancellationToken::new();

    // Creates assistants for personas without a configured id
    let service =
        Arc::new(GatewayService::from_config(&config, i18n, shutdown.clone()).await?);

    let state = Arc::new(AppState::new(
        service,
        config.auth.api_key.clone(),
        metrics,
    ));
    let app = api::router(state);

    // Start the server
    let addr = config.server_address();
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    Ok(())
}

/// Wait for Ctrl+C, then cancel in-flight run polling
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
    shutdown.cancel();
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let format = fmt::format()
        .with_target(true)
        .with_thread_ids(true)
        .compact();

    // Use RUST_LOG if set, otherwise default to info level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("manual_assistant=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().event_format(format))
        .with(filter)
        .init();
}
