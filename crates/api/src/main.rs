//! Faultline - failure classification and resilience for HTTP services
//!
//! Main entry point for the HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use faultline_api::utils::logging::init_tracing;
use faultline_api::{router, AppContext};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Read .env before the subscriber so RUST_LOG and FAULTLINE_LOG_FORMAT apply
    let dotenv = dotenvy::dotenv();
    init_tracing().context("failed to install tracing subscriber")?;
    match dotenv {
        Ok(path) => info!(path = %path.display(), "Loaded .env"),
        Err(e) => debug!(error = %e, "No .env file loaded"),
    }

    let config = faultline_infra::config::load().context("failed to load configuration")?;
    let ctx = Arc::new(AppContext::new(config).await?);

    let listener = TcpListener::bind(&ctx.config.server.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", ctx.config.server.bind_address))?;
    info!(
        address = %listener.local_addr()?,
        fault_routes = ctx.config.server.enable_fault_routes,
        "Faultline listening"
    );

    let app = router(Arc::clone(&ctx));
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal(ctx.shutdown_token()))
        .await
        .context("server error")?;

    ctx.shutdown().await?;
    info!("Faultline stopped");

    Ok(())
}

/// Resolve on ctrl-c and cancel the application token
///
/// Cancelling first aborts retry delays so in-flight requests drain quickly.
async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for ctrl-c");
                shutdown.cancelled().await;
            }
        },
        _ = shutdown.cancelled() => {}
    }
    shutdown.cancel();
}
