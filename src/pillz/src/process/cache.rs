use crate::process::source::{ProcessEntry, ProcessSource, ScanError};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Where a process stands in the current propagation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Renice {
    #[default]
    Pending,
    Applied,
    /// The OS refused. Not retried until the next pill application.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecord {
    pub pid: u32,
    pub start_time: u64,
    pub user: String,
    /// Empty for processes owned by someone else: they are never matched.
    pub cmdline: String,
    pub name: String,
    pub renice: Renice,
}

impl ProcessRecord {
    pub fn is_owned_by(&self, user: &str) -> bool {
        self.user == user
    }
}

/// Per-pid memo of what a scan learned about each process.
///
/// Records are resolved once, on first sighting, and dropped as soon as a scan
/// doesn't list their pid.
#[derive(Debug, Default)]
pub struct ProcessCache {
    user: String,
    records: HashMap<u32, ProcessRecord>,
    seen: HashSet<u32>,
}

impl ProcessCache {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            records: HashMap::new(),
            seen: HashSet::new(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Starts a new scan pass.
    pub fn begin_scan(&mut self) {
        self.seen.clear();
    }

    /// Marks `entry` as seen and returns its record, resolving it if the pid is new
    /// or was reused since the last scan. Returns `None` when the process couldn't be
    /// resolved; it is retried on the next scan.
    pub fn observe(
        &mut self,
        entry: &ProcessEntry,
        source: &mut dyn ProcessSource,
    ) -> Option<&ProcessRecord> {
        self.seen.insert(entry.pid);

        let stale = self
            .records
            .get(&entry.pid)
            .is_some_and(|record| record.start_time != entry.start_time);
        if stale {
            debug!("PID {} was reused, dropping its cached record", entry.pid);
            self.records.remove(&entry.pid);
        }

        if !self.records.contains_key(&entry.pid) {
            match self.resolve(entry, source) {
                Ok(record) => {
                    self.records.insert(entry.pid, record);
                }
                Err(ScanError::ProcessVanished(pid)) => {
                    debug!("Process {} vanished before it could be inspected", pid);
                    return None;
                }
                Err(e) => {
                    warn!("Skipping process {} for this scan: {}", entry.pid, e);
                    return None;
                }
            }
        }

        self.records.get(&entry.pid)
    }

    fn resolve(
        &self,
        entry: &ProcessEntry,
        source: &mut dyn ProcessSource,
    ) -> Result<ProcessRecord, ScanError> {
        let user = source.owner(entry.pid)?;

        // other users' processes are remembered only to skip them cheaply
        let (cmdline, name) = if user == self.user {
            (source.cmdline(entry.pid)?, source.name(entry.pid)?)
        } else {
            (String::new(), String::new())
        };

        Ok(ProcessRecord {
            pid: entry.pid,
            start_time: entry.start_time,
            user,
            cmdline,
            name,
            renice: Renice::Pending,
        })
    }

    /// Drops every record whose pid was not seen since [`Self::begin_scan`].
    pub fn prune(&mut self) -> usize {
        let before = self.records.len();
        let seen = &self.seen;
        self.records.retain(|pid, _| seen.contains(pid));
        before - self.records.len()
    }

    /// Opens a fresh propagation window.
    pub fn reset_renice(&mut self) {
        for record in self.records.values_mut() {
            record.renice = Renice::Pending;
        }
    }

    pub fn get(&self, pid: u32) -> Option<&ProcessRecord> {
        self.records.get(&pid)
    }

    pub fn set_renice(&mut self, pid: u32, renice: Renice) {
        if let Some(record) = self.records.get_mut(&pid) {
            record.renice = renice;
        }
    }

    pub fn renice_of(&self, pid: u32) -> Option<Renice> {
        self.records.get(&pid).map(|record| record.renice)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
