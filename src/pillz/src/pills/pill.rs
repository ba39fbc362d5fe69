use crate::constants::{
    NICE_MAX, NICE_MIN, SCHEDULER_MODE_MAX, SCHEDULER_NONE, SETTING_NICE, SETTING_SCHEDULER,
    SETTING_TUNED,
};
use std::fmt;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PillError {
    #[error("invalid nice value '{0}', expected an integer in [-20, 20]")]
    InvalidNiceValue(String),

    #[error("invalid scheduler specification '{0}'")]
    InvalidScheduler(String),
}

/// A validated niceness level in [-20, 20].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Niceness(i32);

impl Niceness {
    pub fn get(self) -> i32 {
        self.0
    }
}

impl TryFrom<i32> for Niceness {
    type Error = PillError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        if (NICE_MIN..=NICE_MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(PillError::InvalidNiceValue(value.to_string()))
        }
    }
}

impl std::str::FromStr for Niceness {
    type Err = PillError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        raw.trim()
            .parse::<i32>()
            .map_err(|_| PillError::InvalidNiceValue(raw.to_string()))
            .and_then(Niceness::try_from)
    }
}

impl fmt::Display for Niceness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a pill asks of the scheduler loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerSpec {
    Stop,
    Switch { name: String, mode: u32 },
}

impl SchedulerSpec {
    /// Parses `"none"` or `"<name> [mode]"`.
    ///
    /// A mode that is not a number in 0..=4 falls back to 0 with a warning, the same
    /// way scx_loader treats an unspecified mode.
    pub fn parse(raw: &str) -> Result<Self, PillError> {
        let mut parts = raw.split_whitespace();
        let name = parts
            .next()
            .ok_or_else(|| PillError::InvalidScheduler(raw.to_string()))?;

        if name == SCHEDULER_NONE {
            return Ok(SchedulerSpec::Stop);
        }

        let mode = match parts.next() {
            None => 0,
            Some(mode) => match mode.parse::<u32>() {
                Ok(mode) if mode <= SCHEDULER_MODE_MAX => mode,
                _ => {
                    warn!("Wrong scheduler mode '{}' for {}, using default (0)", mode, name);
                    0
                }
            },
        };

        Ok(SchedulerSpec::Switch {
            name: name.to_string(),
            mode,
        })
    }
}

impl fmt::Display for SchedulerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerSpec::Stop => f.write_str(SCHEDULER_NONE),
            SchedulerSpec::Switch { name, mode } => write!(f, "{} (mode {})", name, mode),
        }
    }
}

/// One declared key of a pill, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PillSetting {
    Scheduler(SchedulerSpec),
    TunedProfile(String),
    /// Kept raw: validity is judged per activation.
    Nice(String),
    Unknown { key: String, value: String },
}

impl PillSetting {
    pub fn parse(key: &str, value: &str) -> Result<Self, PillError> {
        Ok(match key {
            SETTING_SCHEDULER => PillSetting::Scheduler(SchedulerSpec::parse(value)?),
            SETTING_TUNED => PillSetting::TunedProfile(value.to_string()),
            SETTING_NICE => PillSetting::Nice(value.to_string()),
            _ => PillSetting::Unknown {
                key: key.to_string(),
                value: value.to_string(),
            },
        })
    }

    pub fn key(&self) -> &str {
        match self {
            PillSetting::Scheduler(_) => SETTING_SCHEDULER,
            PillSetting::TunedProfile(_) => SETTING_TUNED,
            PillSetting::Nice(_) => SETTING_NICE,
            PillSetting::Unknown { key, .. } => key,
        }
    }
}

impl fmt::Display for PillSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PillSetting::Scheduler(spec) => write!(f, "{}: {}", SETTING_SCHEDULER, spec),
            PillSetting::TunedProfile(profile) => write!(f, "{}: {}", SETTING_TUNED, profile),
            PillSetting::Nice(raw) => write!(f, "{}: {}", SETTING_NICE, raw),
            PillSetting::Unknown { key, value } => write!(f, "{}: {} (unknown)", key, value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pill {
    pub name: String,
    pub settings: Vec<PillSetting>,
}

impl Pill {
    pub fn new(name: impl Into<String>, settings: Vec<PillSetting>) -> Self {
        Self {
            name: name.into(),
            settings,
        }
    }

    /// Builds a pill from raw `key: value` pairs.
    pub fn from_pairs<K, V>(name: impl Into<String>, pairs: &[(K, V)]) -> Result<Self, PillError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let settings = pairs
            .iter()
            .map(|(key, value)| PillSetting::parse(key.as_ref(), value.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(name, settings))
    }

    /// The declared nice target, if any, validated.
    pub fn nice(&self) -> Option<Result<Niceness, PillError>> {
        self.settings.iter().find_map(|setting| match setting {
            PillSetting::Nice(raw) => Some(raw.parse::<Niceness>()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::lowest("-20", Some(-20))]
    #[case::highest("20", Some(20))]
    #[case::padded(" -10 ", Some(-10))]
    #[case::below_range("-21", None)]
    #[case::above_range("21", None)]
    #[case::not_a_number("fast", None)]
    #[case::empty("", None)]
    fn test_niceness_parsing(#[case] raw: &str, #[case] expected: Option<i32>) {
        assert_eq!(raw.parse::<Niceness>().ok().map(Niceness::get), expected);
    }

    #[rstest]
    #[case::stop("none", SchedulerSpec::Stop)]
    #[case::name_only("bpfland", SchedulerSpec::Switch { name: "bpfland".into(), mode: 0 })]
    #[case::with_mode("lavd 1", SchedulerSpec::Switch { name: "lavd".into(), mode: 1 })]
    #[case::mode_out_of_range("lavd 9", SchedulerSpec::Switch { name: "lavd".into(), mode: 0 })]
    #[case::mode_not_numeric("rusty gaming", SchedulerSpec::Switch { name: "rusty".into(), mode: 0 })]
    fn test_scheduler_spec_parsing(#[case] raw: &str, #[case] expected: SchedulerSpec) {
        assert_eq!(SchedulerSpec::parse(raw).unwrap(), expected);
    }

    #[test]
    fn test_blank_scheduler_is_rejected() {
        assert!(matches!(
            SchedulerSpec::parse("   "),
            Err(PillError::InvalidScheduler(_))
        ));
    }

    #[test]
    fn test_pill_from_pairs_keeps_declaration_order() {
        let pill = Pill::from_pairs(
            "game",
            &[("tuned", "gaming"), ("scx", "lavd 1"), ("nice", "-10"), ("turbo", "on")],
        )
        .unwrap();

        let keys: Vec<&str> = pill.settings.iter().map(PillSetting::key).collect();
        assert_eq!(keys, vec!["tuned", "scx", "nice", "turbo"]);
        assert_eq!(pill.nice(), Some(Ok(Niceness::try_from(-10).unwrap())));
    }

    #[test]
    fn test_pill_without_nice() {
        let pill = Pill::from_pairs("default", &[("scx", "none")]).unwrap();
        assert_eq!(pill.nice(), None);
    }

    #[test]
    fn test_pill_with_invalid_nice() {
        let pill = Pill::from_pairs("broken", &[("nice", "-99")]).unwrap();
        assert!(matches!(pill.nice(), Some(Err(PillError::InvalidNiceValue(_)))));
    }
}
