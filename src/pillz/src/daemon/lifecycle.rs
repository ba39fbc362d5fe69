use crate::constants::{EXIT_RESTART_REQUESTED, EXIT_SUCCESS};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

/// Why the daemon is about to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleRequest {
    Shutdown,
    /// The configuration changed; the supervisor is expected to start us again.
    Restart,
}

impl LifecycleRequest {
    pub fn exit_code(self) -> i32 {
        match self {
            LifecycleRequest::Shutdown => EXIT_SUCCESS,
            LifecycleRequest::Restart => EXIT_RESTART_REQUESTED,
        }
    }
}

/// Sending half of the single-slot request channel.
///
/// At most one request is ever pending: later ones are dropped until the loop picks
/// the first one up.
#[derive(Debug, Clone)]
pub struct LifecycleHandle {
    tx: mpsc::Sender<LifecycleRequest>,
}

impl LifecycleHandle {
    /// Returns `true` if the request was queued.
    pub fn request(&self, request: LifecycleRequest) -> bool {
        match self.tx.try_send(request) {
            Ok(()) => true,
            Err(TrySendError::Full(dropped)) => {
                debug!("{:?} dropped, another request is already pending", dropped);
                false
            }
            Err(TrySendError::Closed(dropped)) => {
                debug!("{:?} dropped, the daemon is already stopping", dropped);
                false
            }
        }
    }
}

pub fn channel() -> (LifecycleHandle, mpsc::Receiver<LifecycleRequest>) {
    let (tx, rx) = mpsc::channel(1);
    (LifecycleHandle { tx }, rx)
}
