use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::constants::CONFIG_CHANGE_DEBOUNCE;
use crate::daemon::config_watcher::ConfigWatcher;
use crate::daemon::lifecycle::{self, LifecycleRequest};
use crate::daemon::signals::spawn_signal_watcher;
use crate::manager::PillManager;

pub struct DaemonSettings {
    pub scan_interval: Duration,
    /// Watched for changes; `None` disables the restart-on-change behaviour.
    pub config_path: Option<PathBuf>,
}

/// Drives `manager` until a shutdown or restart is requested, then reverts to the
/// default pill and returns the process exit code.
pub async fn run(manager: PillManager, settings: DaemonSettings) -> Result<i32> {
    let cancellation_token = CancellationToken::new();
    let (handle, mut requests) = lifecycle::channel();

    let signals = spawn_signal_watcher(handle.clone(), cancellation_token.clone())?;
    let config_watcher = match &settings.config_path {
        Some(path) => match ConfigWatcher::spawn(
            path,
            handle.clone(),
            cancellation_token.clone(),
            CONFIG_CHANGE_DEBOUNCE,
        ) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                warn!("Config changes won't be picked up: {:#}", e);
                None
            }
        },
        None => None,
    };

    let mut interval = tokio::time::interval(settings.scan_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!("Scanning every {:?}", settings.scan_interval);

    let mut manager = manager;
    let request = loop {
        tokio::select! {
            biased;

            request = requests.recv() => {
                break request.unwrap_or(LifecycleRequest::Shutdown);
            }
            _ = interval.tick() => {
                // scans block on /proc and the system bus
                manager = tokio::task::spawn_blocking(move || {
                    manager.scan();
                    manager
                })
                .await
                .context("Scan task failed")?;
            }
        }
    };

    info!("{:?} requested, reverting to the default pill", request);
    let reset = tokio::task::spawn_blocking(move || manager.reset());
    await_reset(reset, &mut requests).await?;
    cancellation_token.cancel();

    if let Err(e) = signals.await {
        debug!("Signal watcher ended abnormally: {}", e);
    }
    if let Some(watcher) = config_watcher {
        if let Err(e) = watcher.task.await {
            debug!("Config watcher ended abnormally: {}", e);
        }
    }
    drop(handle);

    Ok(request.exit_code())
}

/// Waits for the final reset while signals are still watched, so a second shutdown
/// request stops waiting on a reset stuck in bus retries.
async fn await_reset(
    mut reset: JoinHandle<()>,
    requests: &mut mpsc::Receiver<LifecycleRequest>,
) -> Result<()> {
    loop {
        tokio::select! {
            result = &mut reset => {
                result.context("Reset task failed")?;
                return Ok(());
            }
            request = requests.recv() => match request {
                Some(LifecycleRequest::Shutdown) | None => {
                    warn!("Shutdown requested again, not waiting for the reset to finish");
                    return Ok(());
                }
                Some(LifecycleRequest::Restart) => {
                    debug!("Ignoring a restart request while resetting");
                }
            }
        }
    }
}
