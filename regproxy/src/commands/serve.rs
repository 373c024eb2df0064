use crate::context::AppContext;
use anyhow::{Context, Result};
use libregproxy::ProxyServer;
use tracing::{info, warn};

/// Handle the serve command: run until Ctrl+C or SIGTERM.
pub async fn handle_serve(ctx: &AppContext) -> Result<()> {
    let config = &ctx.config;
    info!(
        bind = %config.server.bind,
        scheme = %config.upstream.scheme,
        config = ?ctx.config_path,
        "Starting regproxy"
    );

    let server = ProxyServer::new(config).context("Failed to initialize proxy")?;
    server
        .run_with_shutdown(shutdown_signal())
        .await
        .context("Proxy server failed")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
