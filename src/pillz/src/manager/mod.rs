mod applier;
mod decision;
mod pill_manager;
mod state;

pub use decision::{decide, Decision, Observation, TriggerMatch};
pub use pill_manager::{Backends, PillManager};
pub use state::ManagerState;
