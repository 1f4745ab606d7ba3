use std::time::Duration;

use anyhow::Result;
use fleetgate_core::config::{AppConfig, LoadOptions};
use fleetgate_server::{bootstrap_with_config, logging::init_logging, serve};

#[tokio::main]
async fn main() -> Result<()> {
    // Config first so the subscriber honours the configured level and format.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config.logging)?;

    let app = bootstrap_with_config(config).await?;
    let address = app.config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "fleetgate-server listening"
    );

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    serve(listener, app.state, wait_for_shutdown(), grace).await?;

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "fleetgate-server stopping"
    );
    app.db_pool.close().await;
    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            event_name = "system.server.signal_error",
            correlation_id = "shutdown",
            error = %error,
            "failed to listen for shutdown signal"
        );
    }
}
