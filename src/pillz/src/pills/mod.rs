mod catalog;
mod pill;
mod trigger;

pub use catalog::PillCatalog;
pub use pill::{Niceness, Pill, PillError, PillSetting, SchedulerSpec};
pub use trigger::TriggerMap;
