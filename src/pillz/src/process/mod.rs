pub mod cache;
pub mod lineage;
pub mod priority;
pub mod source;

pub use cache::{ProcessCache, ProcessRecord, Renice};
pub use priority::{propagate, OsPriority, PriorityControl, PriorityError, PropagationWindow};
pub use source::{current_user_name, ProcessEntry, ProcessSource, ScanError, SysinfoSource};
