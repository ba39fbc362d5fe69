pub mod bridge;
pub mod bus;
pub mod error;

pub use bridge::{ControlBridge, RetryPolicy};
pub use bus::{BusConnector, ControlSession, SystemBus};
pub use error::{ControlError, ControlResult, Service};
