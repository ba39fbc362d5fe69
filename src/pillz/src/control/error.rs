use std::fmt;
use thiserror::Error;

/// The two services a pill can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    ScxLoader,
    Tuned,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::ScxLoader => f.write_str("scx_loader"),
            Service::Tuned => f.write_str("TuneD"),
        }
    }
}

/// Errors raised while talking to the control services
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("couldn't connect to the system bus: {0}")]
    Connection(#[source] zbus::Error),

    #[error("call to {service} failed: {source}")]
    Call {
        service: Service,
        #[source]
        source: zbus::Error,
    },

    #[error("invalid {service} name '{name}', available: [{available}]")]
    Unsupported {
        service: Service,
        name: String,
        available: String,
    },

    #[error("{service} refused the request: {message}")]
    Refused { service: Service, message: String },

    #[error("{operation} failed after {attempts} attempts: {last}")]
    Exhausted {
        operation: String,
        attempts: usize,
        #[source]
        last: Box<ControlError>,
    },
}

impl ControlError {
    pub fn call(service: Service, source: zbus::Error) -> Self {
        ControlError::Call { service, source }
    }

    /// Transport failures are worth a reconnect; answers from the service are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            ControlError::Connection(_) => true,
            ControlError::Call { .. } => true,
            ControlError::Unsupported { .. } => false,
            ControlError::Refused { .. } => false,
            ControlError::Exhausted { .. } => false,
        }
    }
}

pub type ControlResult<T> = Result<T, ControlError>;
