use std::collections::HashSet;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::constants::DEFAULT_PILL;
use crate::control::ControlBridge;
use crate::manager::applier;
use crate::manager::decision::{decide, Decision, Observation, TriggerMatch};
use crate::manager::state::ManagerState;
use crate::pills::{PillCatalog, TriggerMap};
use crate::process::{
    lineage, propagate, PriorityControl, ProcessCache, ProcessEntry, ProcessSource,
    PropagationWindow,
};

/// The outside world a [`PillManager`] observes and acts on.
pub struct Backends {
    pub source: Box<dyn ProcessSource>,
    pub bridge: ControlBridge,
    pub priority: Box<dyn PriorityControl>,
}

/// Owns everything one control loop needs. Scans never overlap, so nothing here is
/// shared or locked.
pub struct PillManager {
    triggers: TriggerMap,
    pills: PillCatalog,
    blacklist: HashSet<String>,
    state: ManagerState,
    cache: ProcessCache,
    source: Box<dyn ProcessSource>,
    bridge: ControlBridge,
    priority: Box<dyn PriorityControl>,
}

impl PillManager {
    pub fn new(config: &Config, user: impl Into<String>, backends: Backends) -> Self {
        Self {
            triggers: config.triggers.clone(),
            pills: config.pills.clone(),
            blacklist: config.blacklist.clone(),
            state: ManagerState::default(),
            cache: ProcessCache::new(user),
            source: backends.source,
            bridge: backends.bridge,
            priority: backends.priority,
        }
    }

    pub fn state(&self) -> &ManagerState {
        &self.state
    }

    pub fn cache(&self) -> &ProcessCache {
        &self.cache
    }

    /// One full cycle: refresh the cache, decide, apply, then propagate nice over the
    /// same scan.
    pub fn scan(&mut self) -> Decision {
        let entries = match self.source.list() {
            Ok(entries) => entries,
            Err(e) => {
                error!("Couldn't list running processes: {}", e);
                return Decision::Keep;
            }
        };

        let observation = self.observe(&entries);
        let decision = decide(&self.state, &observation, &self.pills);

        match &decision {
            Decision::Keep => {}
            Decision::Revert => {
                if self.state.has_anchor() {
                    info!("PID {} is gone", self.state.anchor);
                }
                self.apply(None, DEFAULT_PILL);
            }
            Decision::Switch { pid, parent, pill } => {
                self.apply(Some((*pid, *parent)), pill);
            }
            Decision::Reanchor { pid, parent } => {
                let valid_parent = self.valid_parent_of(*pid, *parent);
                info!(
                    "'{}' is now held by PID {} (was {})",
                    self.state.pill, pid, self.state.anchor
                );
                self.state.anchor = *pid;
                self.state.anchor_start = self.start_time_of(*pid);
                self.state.valid_parent = valid_parent;
            }
        }

        let reniced = self.propagate(&entries);
        if reniced > 0 {
            debug!("Reniced {} processes this scan", reniced);
        }

        decision
    }

    /// Runs `pill`'s actions and makes it current, anchored on `anchor` when given.
    pub fn apply(&mut self, anchor: Option<(u32, Option<u32>)>, pill: &str) {
        info!("Applying pill '{}'", pill);

        let nice = match self.pills.get(pill) {
            Some(definition) => applier::dispatch(definition, &mut self.bridge),
            None => {
                error!("No pill named '{}' is defined", pill);
                None
            }
        };

        self.cache.reset_renice();

        let (anchor, anchor_start, valid_parent) = match anchor {
            Some((pid, parent)) => (
                pid,
                self.start_time_of(pid),
                self.valid_parent_of(pid, parent),
            ),
            None => (0, 0, 0),
        };
        debug!("Anchor PID {}, valid parent {}", anchor, valid_parent);

        self.state = ManagerState {
            pill: pill.to_string(),
            anchor,
            anchor_start,
            valid_parent,
            nice,
        };
    }

    /// Falls back to the default pill with no anchor. Used on shutdown and restart.
    pub fn reset(&mut self) {
        self.apply(None, DEFAULT_PILL);
    }

    fn observe(&mut self, entries: &[ProcessEntry]) -> Observation {
        self.cache.begin_scan();
        let mut observation = Observation::default();

        for entry in entries {
            if self.state.is_anchor(entry.pid, entry.start_time) {
                observation.anchor_present = true;
            }
            if self.cache.observe(entry, self.source.as_mut()).is_none() {
                continue;
            }
            if observation.first_match.is_some() {
                continue;
            }
            let Some(record) = self.cache.get(entry.pid) else {
                continue;
            };
            if !record.is_owned_by(self.cache.user()) || self.blacklist.contains(&record.name) {
                continue;
            }
            if let Some(pill) = self.triggers.find(&record.cmdline) {
                observation.first_match = Some(TriggerMatch {
                    pid: entry.pid,
                    parent: entry.parent,
                    pill: pill.to_string(),
                });
            }
        }

        let pruned = self.cache.prune();
        if pruned > 0 {
            debug!("Dropped {} exited processes from the cache", pruned);
        }

        observation
    }

    fn propagate(&mut self, entries: &[ProcessEntry]) -> usize {
        if self.state.is_default() || !self.state.has_anchor() {
            return 0;
        }
        let Some(nice) = self.state.nice else {
            return 0;
        };

        let window = PropagationWindow {
            nice,
            anchor: self.state.anchor,
            valid_parent: self.state.valid_parent,
        };
        propagate(
            &window,
            entries,
            &mut self.cache,
            &self.blacklist,
            self.priority.as_ref(),
        )
    }

    /// Anchors are always taken from the cache, which holds the start time the current
    /// scan listed. An uncached pid gets 0 and reads as absent on the next scan.
    fn start_time_of(&self, pid: u32) -> u64 {
        self.cache.get(pid).map_or(0, |record| record.start_time)
    }

    fn valid_parent_of(&mut self, pid: u32, parent: Option<u32>) -> u32 {
        let parent_name = parent.and_then(|parent| self.source.name(parent).ok());
        lineage::valid_parent(pid, parent, parent_name.as_deref())
    }
}
