use anyhow::{Context, Result};
use mockall::automock;
use nix::unistd::{Uid, User};
use std::collections::HashMap;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// The pid was listed but is gone by the time it was queried. A common race.
    #[error("process {0} vanished")]
    ProcessVanished(u32),

    #[error("couldn't resolve the {field} of process {pid}: {reason}")]
    Unresolved {
        pid: u32,
        field: &'static str,
        reason: String,
    },

    #[error("couldn't list running processes: {0}")]
    Enumeration(String),
}

/// One row of a process listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessEntry {
    pub pid: u32,
    pub parent: Option<u32>,
    /// Seconds since the epoch. Distinguishes a reused pid from the original owner.
    pub start_time: u64,
}

/// Flat view of the processes visible to the caller.
///
/// `list` takes a fresh snapshot; the lookups answer from that snapshot and
/// fail with [`ScanError::ProcessVanished`] for pids that are not in it.
#[automock]
pub trait ProcessSource: Send {
    /// Lists every process, sorted by ascending pid.
    fn list(&mut self) -> Result<Vec<ProcessEntry>, ScanError>;

    fn owner(&mut self, pid: u32) -> Result<String, ScanError>;

    fn cmdline(&mut self, pid: u32) -> Result<String, ScanError>;

    fn name(&mut self, pid: u32) -> Result<String, ScanError>;
}

pub struct SysinfoSource {
    system: System,
    user_names: HashMap<u32, String>,
}

impl SysinfoSource {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            user_names: HashMap::new(),
        }
    }

    fn process(&self, pid: u32) -> Result<&sysinfo::Process, ScanError> {
        self.system
            .process(Pid::from_u32(pid))
            .ok_or(ScanError::ProcessVanished(pid))
    }
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSource for SysinfoSource {
    fn list(&mut self) -> Result<Vec<ProcessEntry>, ScanError> {
        let refresh_kind = ProcessRefreshKind::nothing()
            .with_user(UpdateKind::OnlyIfNotSet)
            .with_cmd(UpdateKind::OnlyIfNotSet);
        self.system
            .refresh_processes_specifics(ProcessesToUpdate::All, true, refresh_kind);

        let mut entries: Vec<ProcessEntry> = self
            .system
            .processes()
            .iter()
            // sysinfo lists userland threads next to processes on Linux
            .filter(|(_, process)| process.thread_kind().is_none())
            .map(|(pid, process)| ProcessEntry {
                pid: pid.as_u32(),
                parent: process.parent().map(|parent| parent.as_u32()),
                start_time: process.start_time(),
            })
            .collect();

        if entries.is_empty() {
            return Err(ScanError::Enumeration("no process is visible".to_string()));
        }

        entries.sort_unstable_by_key(|entry| entry.pid);
        trace!("Listed {} processes", entries.len());
        Ok(entries)
    }

    fn owner(&mut self, pid: u32) -> Result<String, ScanError> {
        let uid: u32 = **self.process(pid)?.user_id().ok_or(ScanError::Unresolved {
            pid,
            field: "owner",
            reason: "no uid reported".to_string(),
        })?;

        if let Some(name) = self.user_names.get(&uid) {
            return Ok(name.clone());
        }

        let name = user_name(uid).map_err(|e| ScanError::Unresolved {
            pid,
            field: "owner",
            reason: e.to_string(),
        })?;
        self.user_names.insert(uid, name.clone());
        Ok(name)
    }

    fn cmdline(&mut self, pid: u32) -> Result<String, ScanError> {
        let process = self.process(pid)?;
        Ok(process
            .cmd()
            .iter()
            .map(|arg| arg.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" "))
    }

    fn name(&mut self, pid: u32) -> Result<String, ScanError> {
        Ok(self.process(pid)?.name().to_string_lossy().to_string())
    }
}

fn user_name(uid: u32) -> Result<String> {
    User::from_uid(Uid::from_raw(uid))
        .with_context(|| format!("failed to look up uid {}", uid))?
        .map(|user| user.name)
        .with_context(|| format!("uid {} has no passwd entry", uid))
}

/// Name of the user running this daemon.
pub fn current_user_name() -> Result<String> {
    user_name(Uid::current().as_raw()).context("couldn't find the current user's name")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_contains_current_process() {
        let mut source = SysinfoSource::new();
        let entries = source.list().unwrap();

        let own_pid = std::process::id();
        assert!(entries.iter().any(|entry| entry.pid == own_pid));
        assert!(entries.windows(2).all(|pair| pair[0].pid < pair[1].pid));
    }

    #[test]
    fn test_current_process_is_owned_by_current_user() {
        let mut source = SysinfoSource::new();
        source.list().unwrap();

        let own_pid = std::process::id();
        assert_eq!(source.owner(own_pid).unwrap(), current_user_name().unwrap());
        assert!(!source.name(own_pid).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_pid_has_vanished() {
        let mut source = SysinfoSource::new();
        source.list().unwrap();

        assert_eq!(
            source.cmdline(u32::MAX),
            Err(ScanError::ProcessVanished(u32::MAX))
        );
    }
}
