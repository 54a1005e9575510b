use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Cancels `shutdown` on Ctrl+C or, on Unix, SIGTERM.
pub async fn wait_for_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                    _ = shutdown.cancelled() => return,
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler, listening for Ctrl+C only");
                wait_for_ctrl_c(&shutdown).await;
            }
        }
    }

    #[cfg(not(unix))]
    wait_for_ctrl_c(&shutdown).await;

    shutdown.cancel();
}

async fn wait_for_ctrl_c(shutdown: &CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl+C"),
        },
        _ = shutdown.cancelled() => {}
    }
}
