mod config_watcher;
mod daemon_run;
pub mod lifecycle;
mod signals;

pub use config_watcher::ConfigWatcher;
pub use daemon_run::{run, DaemonSettings};
pub use lifecycle::{LifecycleHandle, LifecycleRequest};
