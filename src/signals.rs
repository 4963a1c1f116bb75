//! Signal handling for operator-requested shutdown.

use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

/// Cancels `token` on the first Ctrl+C (SIGINT) or SIGTERM.
///
/// The listener runs as a background task; its only job is to flip the
/// token, everything else is up to whoever observes it.
pub fn watch_signals(token: CancellationToken) {
    tokio::spawn(async move {
        let signal = wait_for_shutdown_signal().await;
        warn!("Cancelling execution due to {}", signal);
        token.cancel();
    });
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to register SIGTERM handler: {}", e);
            return wait_for_ctrl_c().await;
        }
    };

    tokio::select! {
        name = wait_for_ctrl_c() => name,
        _ = sigterm.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> &'static str {
    wait_for_ctrl_c().await
}

async fn wait_for_ctrl_c() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C signal: {}", e);
        // Without a listener there is nothing to wait for.
        std::future::pending::<()>().await;
    }
    "interrupt"
}
