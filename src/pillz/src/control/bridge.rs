use crate::constants::{CONTROL_MAX_ATTEMPTS, CONTROL_RETRY_DELAY};
use crate::control::bus::{BusConnector, ControlSession};
use crate::control::error::{ControlError, ControlResult, Service};
use crate::pills::SchedulerSpec;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: CONTROL_MAX_ATTEMPTS,
            delay: CONTROL_RETRY_DELAY,
        }
    }
}

enum Attempt {
    Done,
    /// The service answered and said no: retrying won't change that.
    Rejected(ControlError),
    /// Transport failure: drop the connection and try again.
    Failed(ControlError),
}

/// Bounded-retry, reconnecting wrapper around the scheduler loader and TuneD.
///
/// Every call validates the requested name against the list the service currently
/// advertises. Calls are blocking and take at most
/// `max_attempts * (call time + delay)`.
pub struct ControlBridge {
    connector: Box<dyn BusConnector>,
    session: Option<Box<dyn ControlSession>>,
    policy: RetryPolicy,
}

impl ControlBridge {
    pub fn new(connector: Box<dyn BusConnector>, policy: RetryPolicy) -> Self {
        Self {
            connector,
            session: None,
            policy,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Opens the connection ahead of the first call.
    pub fn connect(&mut self) -> ControlResult<()> {
        self.ensure_session().map(|_| ())
    }

    pub fn apply_scheduler(&mut self, spec: &SchedulerSpec) -> ControlResult<()> {
        match spec {
            SchedulerSpec::Stop => self.call("StopScheduler", |session| session.stop_scheduler()),
            SchedulerSpec::Switch { name, mode } => {
                self.call("SwitchScheduler", |session| {
                    let supported = session.supported_schedulers()?;
                    ensure_advertised(Service::ScxLoader, name, &supported)?;
                    session.switch_scheduler(name, *mode)
                })
            }
        }
    }

    pub fn switch_tuned_profile(&mut self, name: &str) -> ControlResult<()> {
        self.call("SwitchTunedProfile", |session| {
            let profiles = session.tuned_profiles()?;
            ensure_advertised(Service::Tuned, name, &profiles)?;
            session.switch_tuned_profile(name)
        })
    }

    fn call<F>(&mut self, operation: &str, op: F) -> ControlResult<()>
    where
        F: Fn(&dyn ControlSession) -> ControlResult<()>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.attempt(&op) {
                Attempt::Done => {
                    debug!("{} succeeded on attempt {}", operation, attempt);
                    return Ok(());
                }
                Attempt::Rejected(e) => return Err(e),
                Attempt::Failed(e) => {
                    self.session = None;
                    if attempt >= max_attempts {
                        return Err(ControlError::Exhausted {
                            operation: operation.to_string(),
                            attempts: attempt,
                            last: Box::new(e),
                        });
                    }
                    warn!(
                        "{} failed (try {}/{}), reconnecting: {}",
                        operation, attempt, max_attempts, e
                    );
                    std::thread::sleep(self.policy.delay);
                    attempt += 1;
                }
            }
        }
    }

    fn attempt<F>(&mut self, op: &F) -> Attempt
    where
        F: Fn(&dyn ControlSession) -> ControlResult<()>,
    {
        let session = match self.ensure_session() {
            Ok(session) => session,
            Err(e) => return Attempt::Failed(e),
        };
        match op(session) {
            Ok(()) => Attempt::Done,
            Err(e) if e.is_retryable() => Attempt::Failed(e),
            Err(e) => Attempt::Rejected(e),
        }
    }

    fn ensure_session(&mut self) -> ControlResult<&dyn ControlSession> {
        let session = match self.session.take() {
            Some(session) => session,
            None => {
                let session = self.connector.connect()?;
                info!("Control bus connection established");
                session
            }
        };
        Ok(&**self.session.insert(session))
    }
}

fn ensure_advertised(service: Service, name: &str, advertised: &[String]) -> ControlResult<()> {
    if advertised.iter().any(|candidate| candidate == name) {
        Ok(())
    } else {
        Err(ControlError::Unsupported {
            service,
            name: name.to_string(),
            available: advertised.join(", "),
        })
    }
}
