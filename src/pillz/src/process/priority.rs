use crate::pills::Niceness;
use crate::process::cache::{ProcessCache, Renice};
use crate::process::source::ProcessEntry;
use mockall::automock;
use std::collections::HashSet;
use std::io;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum PriorityError {
    #[error("not allowed to renice process {pid}: {source}")]
    PermissionDenied {
        pid: u32,
        #[source]
        source: io::Error,
    },

    #[error("process {0} vanished before it could be reniced")]
    ProcessVanished(u32),

    #[error("couldn't renice process {pid}: {source}")]
    Os {
        pid: u32,
        #[source]
        source: io::Error,
    },
}

#[automock]
pub trait PriorityControl: Send {
    fn set_nice(&self, pid: u32, nice: Niceness) -> Result<(), PriorityError>;
}

/// `setpriority(2)` on a single process.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsPriority;

impl PriorityControl for OsPriority {
    fn set_nice(&self, pid: u32, nice: Niceness) -> Result<(), PriorityError> {
        // SAFETY: setpriority only reads its integer arguments.
        let result =
            unsafe { libc::setpriority(libc::PRIO_PROCESS, pid as libc::id_t, nice.get()) };
        if result == 0 {
            return Ok(());
        }

        let source = io::Error::last_os_error();
        Err(match source.raw_os_error() {
            Some(libc::EPERM) | Some(libc::EACCES) => PriorityError::PermissionDenied { pid, source },
            Some(libc::ESRCH) => PriorityError::ProcessVanished(pid),
            _ => PriorityError::Os { pid, source },
        })
    }
}

/// The nice target of the active pill and the tree it applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropagationWindow {
    pub nice: Niceness,
    pub anchor: u32,
    pub valid_parent: u32,
}

/// One breadth step of nice propagation over a scan.
///
/// A pending, user-owned process is reniced when it is the anchor, when its parent is
/// the valid parent, or when its parent was already reniced in this window. Listings
/// are flat, so a process whose parent qualifies later in the scan waits for the next
/// one: a tree of depth `d` is covered within `d` scans. That latency is accepted.
///
/// A failed attempt is recorded as [`Renice::Failed`] and not retried in this window,
/// and its children don't inherit eligibility from it.
pub fn propagate(
    window: &PropagationWindow,
    entries: &[ProcessEntry],
    cache: &mut ProcessCache,
    blacklist: &HashSet<String>,
    control: &dyn PriorityControl,
) -> usize {
    let mut applied = 0;

    for entry in entries {
        let Some(record) = cache.get(entry.pid) else {
            continue;
        };
        if record.renice != Renice::Pending
            || !record.is_owned_by(cache.user())
            || blacklist.contains(&record.name)
        {
            continue;
        }

        let parent_reniced = entry
            .parent
            .and_then(|parent| cache.renice_of(parent))
            .is_some_and(|renice| renice == Renice::Applied);
        let eligible = parent_reniced
            || entry.parent == Some(window.valid_parent)
            || entry.pid == window.anchor;
        if !eligible {
            continue;
        }

        let name = record.name.clone();
        let outcome = match control.set_nice(entry.pid, window.nice) {
            Ok(()) => {
                info!("Reniced {} (PID {}) to {}", name, entry.pid, window.nice);
                applied += 1;
                Renice::Applied
            }
            Err(PriorityError::ProcessVanished(pid)) => {
                debug!("Process {} vanished before it could be reniced", pid);
                Renice::Failed
            }
            Err(e) => {
                warn!("Couldn't change nice value of {}: {}", name, e);
                Renice::Failed
            }
        };
        cache.set_renice(entry.pid, outcome);
    }

    applied
}
