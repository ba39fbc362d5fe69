use crate::constants::DEFAULT_PILL;
use crate::pills::Niceness;

/// What the control loop currently believes. Owned by [`super::PillManager`] and only
/// changed by applying a decision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagerState {
    /// Empty until the first pill is applied.
    pub pill: String,
    /// Process justifying the active pill, 0 for none.
    pub anchor: u32,
    /// Start time of the anchor when it was chosen. A pid listed with any other start
    /// time belongs to a different process.
    pub anchor_start: u64,
    /// Parent whose children share the anchor's pill, 0 for none.
    pub valid_parent: u32,
    /// Resolved when the pill was applied; `None` disables renicing.
    pub nice: Option<Niceness>,
}

impl ManagerState {
    pub fn is_default(&self) -> bool {
        self.pill == DEFAULT_PILL
    }

    pub fn has_anchor(&self) -> bool {
        self.anchor != 0
    }

    pub fn is_anchor(&self, pid: u32, start_time: u64) -> bool {
        self.has_anchor() && pid == self.anchor && start_time == self.anchor_start
    }
}
