use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "process_pillz.yaml";
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 3;

/// The pill every other activation falls back to. It may never carry a nice target.
pub const DEFAULT_PILL: &str = "default";

pub const SETTING_SCHEDULER: &str = "scx";
pub const SETTING_TUNED: &str = "tuned";
pub const SETTING_NICE: &str = "nice";
pub const SCHEDULER_NONE: &str = "none";

pub const NICE_MIN: i32 = -20;
pub const NICE_MAX: i32 = 20;
pub const SCHEDULER_MODE_MAX: u32 = 4;

/// Ancestors that say nothing about which application a process belongs to.
pub const OPAQUE_PARENTS: &[&str] = &["systemd", "init", "bash", "sh", "dash", "zsh", "fish"];

pub const CONTROL_MAX_ATTEMPTS: usize = 3;
pub const CONTROL_RETRY_DELAY: Duration = Duration::from_secs(2);

pub const CONFIG_CHANGE_DEBOUNCE: Duration = Duration::from_secs(2);

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_RESTART_REQUESTED: i32 = 42;
