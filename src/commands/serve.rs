use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use endor::config::Config;
use endor::server::{EndorServer, ServerConfig};
use endor::service::EndorService;

/// Parameters for the serve command
#[derive(Debug, Clone, Default)]
pub struct ServeParams {
    /// Bind address override from the command line
    pub bind: Option<String>,
}

/// Run the HTTP service until a shutdown signal arrives
pub async fn serve(config: &Config, params: ServeParams) -> Result<()> {
    if let Err(e) = endor::metrics::init_metrics() {
        tracing::warn!("Metrics initialization failed: {}", e);
    }

    let bind = params
        .bind
        .unwrap_or_else(|| config.server.bind_address.clone());

    let server_config = ServerConfig::builder()
        .bind_address_str(&bind)?
        .enable_cors(config.server.enable_cors)
        .enable_request_logging(config.server.enable_request_logging)
        .request_timeout_secs(config.server.request_timeout_secs)
        .build()?;
    let grace = server_config.shutdown_grace();

    let service =
        Arc::new(EndorService::from_config(config).context("Failed to configure attack service")?);
    let pool = service.pool().clone();
    let server = EndorServer::new(server_config, service).context("Failed to create server")?;

    println!("{}", server.info().display());
    println!();
    println!("API Endpoints:");
    println!("  POST /attack       - Select a target and fire");
    println!("  GET  /api/health   - Health check");
    println!("  GET  /api/cannons  - Query every ion cannon");
    println!("  GET  /metrics      - Prometheus metrics endpoint");
    println!();

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_signals(shutdown.clone()));

    let serving = server.start_with_shutdown(shutdown.clone().cancelled_owned());
    tokio::pin!(serving);

    tokio::select! {
        result = &mut serving => result?,
        () = grace_expired(&shutdown, grace) => {
            // Attacks still waiting for a slot must not reach a cannon now
            pool.close();
            tracing::error!(
                grace_secs = grace.as_secs(),
                "Graceful shutdown timed out, in-flight requests abandoned"
            );
            anyhow::bail!("graceful shutdown timed out after {}s", grace.as_secs());
        }
    }

    println!("Endor server stopped.");
    Ok(())
}

async fn grace_expired(shutdown: &CancellationToken, grace: Duration) {
    shutdown.cancelled().await;
    tokio::time::sleep(grace).await;
}

async fn watch_signals(shutdown: CancellationToken) {
    match wait_for_signal().await {
        Ok(signal) => tracing::info!(signal, "Shutdown signal received"),
        Err(e) => tracing::error!("Failed to listen for shutdown signals: {}", e),
    }
    shutdown.cancel();
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    let mut hangup = signal(SignalKind::hangup())?;
    let mut quit = signal(SignalKind::quit())?;

    let name = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            "SIGINT"
        }
        _ = terminate.recv() => "SIGTERM",
        _ = hangup.recv() => "SIGHUP",
        _ = quit.recv() => "SIGQUIT",
    };

    Ok(name)
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}
