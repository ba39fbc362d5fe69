use crate::constants::DEFAULT_PILL;
use crate::control::{ControlBridge, ControlError};
use crate::pills::{Niceness, Pill, PillSetting};
use tracing::{error, info, warn};

/// Runs every declared action of `pill` in declaration order and returns the nice
/// target for the activation it starts.
///
/// Control failures are logged and skipped; the remaining settings still run.
pub fn dispatch(pill: &Pill, bridge: &mut ControlBridge) -> Option<Niceness> {
    let mut nice = None;

    for setting in &pill.settings {
        match setting {
            PillSetting::Scheduler(spec) => {
                info!("Setting scheduler to {}", spec);
                if let Err(e) = bridge.apply_scheduler(spec) {
                    report("scheduler", &e);
                }
            }
            PillSetting::TunedProfile(profile) => {
                info!("Setting TuneD profile to {}", profile);
                if let Err(e) = bridge.switch_tuned_profile(profile) {
                    report("TuneD profile", &e);
                }
            }
            PillSetting::Nice(raw) if pill.name == DEFAULT_PILL => {
                warn!(
                    "Ignoring nice value '{}': the '{}' pill never renices",
                    raw, DEFAULT_PILL
                );
            }
            PillSetting::Nice(raw) => match raw.parse::<Niceness>() {
                Ok(value) => nice = Some(value),
                Err(e) => warn!("{} in pill '{}', renicing disabled", e, pill.name),
            },
            PillSetting::Unknown { key, .. } => {
                warn!("Unknown setting '{}' in pill '{}'", key, pill.name);
            }
        }
    }

    nice
}

fn report(what: &str, e: &ControlError) {
    match e {
        ControlError::Unsupported { .. } | ControlError::Refused { .. } => {
            warn!("Couldn't set {}: {}", what, e)
        }
        _ => error!("Couldn't set {}: {}", what, e),
    }
}
