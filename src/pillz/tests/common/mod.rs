#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pillz::config::{Config, ConfigLoader};
use pillz::control::{
    BusConnector, ControlBridge, ControlError, ControlResult, ControlSession, RetryPolicy,
    Service,
};
use pillz::manager::{Backends, PillManager};
use pillz::pills::Niceness;
use pillz::process::{PriorityControl, PriorityError, ProcessEntry, ProcessSource, ScanError};

pub const USER: &str = "alice";

pub const GAME_CONFIG: &str = r#"
scan_interval: 1
triggers:
  game.exe: game
pills:
  default:
    scx: none
    tuned: desktop
  game:
    tuned: gaming
    scx: lavd 1
    nice: -10
"#;

#[derive(Debug, Clone)]
pub struct FakeProcess {
    pub pid: u32,
    pub parent: u32,
    pub start_time: u64,
    pub user: String,
    pub name: String,
    pub cmdline: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusCall {
    SwitchScheduler(String, u32),
    StopScheduler,
    SwitchTuned(String),
}

/// Everything the fakes share with the test body.
#[derive(Clone)]
pub struct World {
    processes: Arc<Mutex<BTreeMap<u32, FakeProcess>>>,
    unreadable: Arc<Mutex<HashSet<u32>>>,
    clock: Arc<Mutex<u64>>,
    calls: Arc<Mutex<Vec<BusCall>>>,
    schedulers: Arc<Mutex<Vec<String>>>,
    renices: Arc<Mutex<Vec<(u32, i32)>>>,
    denied: Arc<Mutex<HashSet<u32>>>,
}

impl World {
    pub fn new() -> Self {
        let world = Self {
            processes: Arc::default(),
            unreadable: Arc::default(),
            clock: Arc::new(Mutex::new(1_000)),
            calls: Arc::default(),
            schedulers: Arc::new(Mutex::new(vec!["lavd".to_string(), "bpfland".to_string()])),
            renices: Arc::default(),
            denied: Arc::default(),
        };
        world.spawn_as(1, 0, "root", "systemd", "/sbin/init");
        world.spawn(500, 1, "plasmashell", "/usr/bin/plasmashell");
        world
    }

    pub fn spawn(&self, pid: u32, parent: u32, name: &str, cmdline: &str) {
        self.spawn_as(pid, parent, USER, name, cmdline);
    }

    pub fn spawn_as(&self, pid: u32, parent: u32, user: &str, name: &str, cmdline: &str) {
        let start_time = {
            let mut clock = self.clock.lock().unwrap();
            *clock += 1;
            *clock
        };
        self.processes.lock().unwrap().insert(
            pid,
            FakeProcess {
                pid,
                parent,
                start_time,
                user: user.to_string(),
                name: name.to_string(),
                cmdline: cmdline.to_string(),
            },
        );
    }

    pub fn kill(&self, pid: u32) {
        self.processes.lock().unwrap().remove(&pid);
    }

    /// Owner lookups for `pid` fail until [`Self::make_readable`].
    pub fn make_unreadable(&self, pid: u32) {
        self.unreadable.lock().unwrap().insert(pid);
    }

    pub fn make_readable(&self, pid: u32) {
        self.unreadable.lock().unwrap().remove(&pid);
    }

    pub fn advertise_schedulers(&self, names: &[&str]) {
        *self.schedulers.lock().unwrap() = names.iter().map(|name| name.to_string()).collect();
    }

    pub fn deny_renice(&self, pid: u32) {
        self.denied.lock().unwrap().insert(pid);
    }

    /// Bus calls made since the last call to this method.
    pub fn take_calls(&self) -> Vec<BusCall> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }

    /// Successful renices since the last call to this method.
    pub fn take_renices(&self) -> Vec<(u32, i32)> {
        std::mem::take(&mut *self.renices.lock().unwrap())
    }

    pub fn manager(&self, config: &Config) -> PillManager {
        let bridge = ControlBridge::new(
            Box::new(RecordingBus {
                world: self.clone(),
            }),
            RetryPolicy {
                max_attempts: 3,
                delay: Duration::ZERO,
            },
        );
        let backends = Backends {
            source: Box::new(FakeSource {
                world: self.clone(),
            }),
            bridge,
            priority: Box::new(RecordingPriority {
                world: self.clone(),
            }),
        };
        PillManager::new(config, USER, backends)
    }
}

pub fn game_config() -> Config {
    ConfigLoader::load_str(GAME_CONFIG).unwrap()
}

pub fn stop_and_desktop() -> Vec<BusCall> {
    vec![BusCall::StopScheduler, BusCall::SwitchTuned("desktop".to_string())]
}

pub fn gaming_and_lavd() -> Vec<BusCall> {
    vec![
        BusCall::SwitchTuned("gaming".to_string()),
        BusCall::SwitchScheduler("lavd".to_string(), 1),
    ]
}

struct FakeSource {
    world: World,
}

impl FakeSource {
    fn with_process<T>(
        &self,
        pid: u32,
        read: impl FnOnce(&FakeProcess) -> T,
    ) -> Result<T, ScanError> {
        let processes = self.world.processes.lock().unwrap();
        processes
            .get(&pid)
            .map(read)
            .ok_or(ScanError::ProcessVanished(pid))
    }
}

impl ProcessSource for FakeSource {
    fn list(&mut self) -> Result<Vec<ProcessEntry>, ScanError> {
        let processes = self.world.processes.lock().unwrap();
        Ok(processes
            .values()
            .map(|process| ProcessEntry {
                pid: process.pid,
                parent: (process.parent != 0).then_some(process.parent),
                start_time: process.start_time,
            })
            .collect())
    }

    fn owner(&mut self, pid: u32) -> Result<String, ScanError> {
        if self.world.unreadable.lock().unwrap().contains(&pid) {
            return Err(ScanError::Unresolved {
                pid,
                field: "owner",
                reason: "permission denied".to_string(),
            });
        }
        self.with_process(pid, |process| process.user.clone())
    }

    fn cmdline(&mut self, pid: u32) -> Result<String, ScanError> {
        self.with_process(pid, |process| process.cmdline.clone())
    }

    fn name(&mut self, pid: u32) -> Result<String, ScanError> {
        self.with_process(pid, |process| process.name.clone())
    }
}

struct RecordingBus {
    world: World,
}

impl BusConnector for RecordingBus {
    fn connect(&self) -> ControlResult<Box<dyn ControlSession>> {
        Ok(Box::new(RecordingSession {
            world: self.world.clone(),
        }))
    }
}

struct RecordingSession {
    world: World,
}

impl RecordingSession {
    fn record(&self, call: BusCall) -> ControlResult<()> {
        self.world.calls.lock().unwrap().push(call);
        Ok(())
    }
}

impl ControlSession for RecordingSession {
    fn supported_schedulers(&self) -> ControlResult<Vec<String>> {
        Ok(self.world.schedulers.lock().unwrap().clone())
    }

    fn switch_scheduler(&self, name: &str, mode: u32) -> ControlResult<()> {
        self.record(BusCall::SwitchScheduler(name.to_string(), mode))
    }

    fn stop_scheduler(&self) -> ControlResult<()> {
        self.record(BusCall::StopScheduler)
    }

    fn tuned_profiles(&self) -> ControlResult<Vec<String>> {
        Ok(vec![
            "desktop".to_string(),
            "gaming".to_string(),
            "powersave".to_string(),
        ])
    }

    fn switch_tuned_profile(&self, name: &str) -> ControlResult<()> {
        if name == "powersave" {
            return Err(ControlError::Refused {
                service: Service::Tuned,
                message: "profile is broken".to_string(),
            });
        }
        self.record(BusCall::SwitchTuned(name.to_string()))
    }
}

struct RecordingPriority {
    world: World,
}

impl PriorityControl for RecordingPriority {
    fn set_nice(&self, pid: u32, nice: Niceness) -> Result<(), PriorityError> {
        if self.world.denied.lock().unwrap().contains(&pid) {
            return Err(PriorityError::PermissionDenied {
                pid,
                source: std::io::Error::from_raw_os_error(libc::EPERM),
            });
        }
        if !self.world.processes.lock().unwrap().contains_key(&pid) {
            return Err(PriorityError::ProcessVanished(pid));
        }
        self.world.renices.lock().unwrap().push((pid, nice.get()));
        Ok(())
    }
}
