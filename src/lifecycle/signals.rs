//! OS signal handling.
//!
//! SIGINT and SIGTERM cancel the run's root token. A second signal is not special:
//! the grace period on each server bounds how long shutdown can take.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Resolve once SIGINT (Ctrl+C) or, on Unix, SIGTERM arrives.
pub async fn wait_for_shutdown() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term = signal(SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res?,
            _ = term.recv() => {}
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}

/// Cancel `cancel` on the first shutdown signal.
pub fn cancel_on_signal(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            res = wait_for_shutdown() => {
                match res {
                    Ok(()) => tracing::info!("shutdown: signal received"),
                    Err(e) => tracing::warn!(error = %e, "shutdown: signal listener failed, stopping"),
                }
                cancel.cancel();
            }
            _ = cancel.cancelled() => {}
        }
    })
}
