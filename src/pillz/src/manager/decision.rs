use crate::manager::state::ManagerState;
use crate::pills::PillCatalog;
use tracing::debug;

/// The first process of a scan whose command line hit a trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerMatch {
    pub pid: u32,
    pub parent: Option<u32>,
    pub pill: String,
}

/// What one scan saw.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Observation {
    pub anchor_present: bool,
    pub first_match: Option<TriggerMatch>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Keep,
    /// The anchor is gone: go back to the default pill.
    Revert,
    Switch {
        pid: u32,
        parent: Option<u32>,
        pill: String,
    },
    /// Same pill, but another process now justifies it.
    Reanchor { pid: u32, parent: Option<u32> },
}

/// Chooses at most one transition per scan, in priority order: revert, switch, reanchor.
pub fn decide(state: &ManagerState, observation: &Observation, pills: &PillCatalog) -> Decision {
    if !observation.anchor_present && !state.is_default() {
        return Decision::Revert;
    }

    let Some(found) = &observation.first_match else {
        return Decision::Keep;
    };

    if found.pill != state.pill {
        if pills.contains(&found.pill) {
            return Decision::Switch {
                pid: found.pid,
                parent: found.parent,
                pill: found.pill.clone(),
            };
        }
        debug!(
            "PID {} matches a trigger for pill '{}', which is not defined",
            found.pid, found.pill
        );
        return Decision::Keep;
    }

    if found.pid != state.anchor {
        return Decision::Reanchor {
            pid: found.pid,
            parent: found.parent,
        };
    }

    Decision::Keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pills::Pill;
    use rstest::{fixture, rstest};

    #[fixture]
    fn pills() -> PillCatalog {
        PillCatalog::new(vec![
            Pill::from_pairs("default", &[("scx", "none")]).unwrap(),
            Pill::from_pairs("game", &[("tuned", "gaming")]).unwrap(),
        ])
    }

    fn state(pill: &str, anchor: u32) -> ManagerState {
        ManagerState {
            pill: pill.to_string(),
            anchor,
            anchor_start: 1,
            valid_parent: anchor,
            nice: None,
        }
    }

    fn seen(anchor_present: bool, first_match: Option<(u32, &str)>) -> Observation {
        Observation {
            anchor_present,
            first_match: first_match.map(|(pid, pill)| TriggerMatch {
                pid,
                parent: Some(1),
                pill: pill.to_string(),
            }),
        }
    }

    #[rstest]
    fn test_startup_applies_default(pills: PillCatalog) {
        let decision = decide(&state("", 0), &seen(false, Some((100, "game"))), &pills);
        assert_eq!(decision, Decision::Revert);
    }

    #[rstest]
    fn test_vanished_anchor_reverts(pills: PillCatalog) {
        assert_eq!(
            decide(&state("game", 100), &seen(false, None), &pills),
            Decision::Revert
        );
    }

    #[rstest]
    fn test_default_is_not_reverted_again(pills: PillCatalog) {
        assert_eq!(
            decide(&state("default", 0), &seen(false, None), &pills),
            Decision::Keep
        );
    }

    #[rstest]
    fn test_match_switches_pill(pills: PillCatalog) {
        assert_eq!(
            decide(&state("default", 0), &seen(false, Some((100, "game"))), &pills),
            Decision::Switch {
                pid: 100,
                parent: Some(1),
                pill: "game".to_string()
            }
        );
    }

    #[rstest]
    fn test_match_for_undefined_pill_is_ignored(pills: PillCatalog) {
        assert_eq!(
            decide(&state("default", 0), &seen(false, Some((100, "work"))), &pills),
            Decision::Keep
        );
    }

    #[rstest]
    fn test_same_pill_new_process_reanchors(pills: PillCatalog) {
        assert_eq!(
            decide(&state("game", 100), &seen(true, Some((90, "game"))), &pills),
            Decision::Reanchor {
                pid: 90,
                parent: Some(1)
            }
        );
    }

    #[rstest]
    fn test_stable_anchor_is_kept(pills: PillCatalog) {
        assert_eq!(
            decide(&state("game", 100), &seen(true, Some((100, "game"))), &pills),
            Decision::Keep
        );
    }

    #[rstest]
    fn test_revert_takes_priority_over_switch(pills: PillCatalog) {
        assert_eq!(
            decide(&state("game", 100), &seen(false, Some((200, "game"))), &pills),
            Decision::Revert
        );
    }
}
