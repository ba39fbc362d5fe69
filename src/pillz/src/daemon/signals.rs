use crate::daemon::lifecycle::{LifecycleHandle, LifecycleRequest};
use anyhow::{Context, Result};
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Turns SIGINT and SIGTERM into [`LifecycleRequest::Shutdown`].
pub fn spawn_signal_watcher(
    handle: LifecycleHandle,
    cancellation_token: CancellationToken,
) -> Result<JoinHandle<()>> {
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to listen for SIGINT")?;
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to listen for SIGTERM")?;

    Ok(tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    debug!("Signal watcher cancelled");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT");
                    handle.request(LifecycleRequest::Shutdown);
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM");
                    handle.request(LifecycleRequest::Shutdown);
                }
            }
        }
    }))
}
