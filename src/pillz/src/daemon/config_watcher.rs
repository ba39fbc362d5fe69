use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::daemon::lifecycle::{LifecycleHandle, LifecycleRequest};

/// Requests a restart once the configuration file has been quiet for the debounce
/// delay after a change. Dropping it stops the file watch.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    pub task: JoinHandle<()>,
}

impl ConfigWatcher {
    /// Watches the directory holding `path`, so editors that replace the file on save
    /// are noticed too.
    pub fn spawn(
        path: &Path,
        handle: LifecycleHandle,
        cancellation_token: CancellationToken,
        debounce: Duration,
    ) -> Result<Self> {
        let file_name = path
            .file_name()
            .context("Config path has no file name")?
            .to_os_string();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => Path::new(".").to_path_buf(),
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) if touches(&event, &file_name) => {
                    let _ = tx.send(());
                }
                Ok(_) => {}
                Err(e) => warn!("Config watch error: {}", e),
            }
        })
        .context("Failed to create the config watcher")?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", dir.display()))?;
        info!("Watching {} for changes", path.display());

        let task = tokio::spawn(debounce_changes(rx, handle, cancellation_token, debounce));
        Ok(Self {
            _watcher: watcher,
            task,
        })
    }
}

fn touches(event: &Event, file_name: &OsString) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event
        .paths
        .iter()
        .any(|path| path.file_name() == Some(file_name.as_os_str()))
}

/// Collapses bursts of change notifications into one restart request.
async fn debounce_changes(
    mut changes: mpsc::UnboundedReceiver<()>,
    handle: LifecycleHandle,
    cancellation_token: CancellationToken,
    debounce: Duration,
) {
    loop {
        tokio::select! {
            _ = cancellation_token.cancelled() => break,
            change = changes.recv() => {
                if change.is_none() {
                    break;
                }
                debug!("Config file changed, waiting {:?} for it to settle", debounce);
                tokio::select! {
                    _ = cancellation_token.cancelled() => break,
                    _ = tokio::time::sleep(debounce) => {}
                }
                while changes.try_recv().is_ok() {}
                info!("Config file changed, requesting a restart");
                handle.request(LifecycleRequest::Restart);
            }
        }
    }
}
