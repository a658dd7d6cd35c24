//! Pure reducer that advances consequence chains.
//!
//! Every function takes the host-owned [`ConsequenceState`] by reference and
//! returns a fresh copy; nothing is remembered between calls.

use crate::catalog::{ChainCatalog, ChainStageDefinition};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Trigger used to push a chain off its final stage when it expires.
pub const AUTO_ADVANCE_TRIGGER: &str = "auto_advance";

/// Runtime progress of one chain. At most one exists per chain id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveChainInstance {
    pub chain_id: String,
    pub current_stage: String,
    pub stage_start_week: u32,
    /// Triggers that created or advanced this instance, oldest first.
    pub triggers: Vec<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_week: Option<u32>,
}

impl ActiveChainInstance {
    /// Whole weeks spent in the current stage as of `week`.
    pub fn weeks_in_stage(&self, week: u32) -> u32 {
        week.saturating_sub(self.stage_start_week)
    }
}

/// All chain instances plus the week they are evaluated against.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsequenceState {
    pub active_chains: Vec<ActiveChainInstance>,
    pub current_week: u32,
}

impl ConsequenceState {
    pub fn new(current_week: u32) -> Self {
        Self {
            active_chains: Vec::new(),
            current_week,
        }
    }

    pub fn instance(&self, chain_id: &str) -> Option<&ActiveChainInstance> {
        self.active_chains.iter().find(|c| c.chain_id == chain_id)
    }
}

/// Offer `trigger` to one chain and return the resulting state.
///
/// Unknown chains and triggers that match neither the entry stage (no
/// instance yet) nor the next stage leave the state as it was. An instance
/// sitting on its last stage is marked completed by any trigger, and a
/// completed instance never changes again.
pub fn progress_chain(
    catalog: &ChainCatalog,
    chain_id: &str,
    trigger: &str,
    state: &ConsequenceState,
) -> ConsequenceState {
    let mut next = state.clone();
    let Some(chain) = catalog.get(chain_id) else {
        return next;
    };
    let week = state.current_week;

    let Some(pos) = next.active_chains.iter().position(|c| c.chain_id == chain_id) else {
        let Some(entry) = chain.entry_stage() else {
            return next;
        };
        if entry.triggers.contains(trigger) {
            debug!(chain = chain_id, stage = %entry.id, trigger, week, "chain started");
            next.active_chains.push(ActiveChainInstance {
                chain_id: chain_id.to_string(),
                current_stage: entry.id.clone(),
                stage_start_week: week,
                triggers: vec![trigger.to_string()],
                completed: false,
                completed_week: None,
            });
        }
        return next;
    };

    let instance = &next.active_chains[pos];
    if instance.completed {
        return next;
    }
    let Some(index) = chain.stage_index(&instance.current_stage) else {
        warn!(chain = chain_id, stage = %instance.current_stage, "unknown stage on active chain");
        return next;
    };

    let updated = match chain.stages.get(index + 1) {
        Some(stage) if stage.triggers.contains(trigger) => {
            debug!(chain = chain_id, stage = %stage.id, trigger, week, "chain advanced");
            let mut triggers = instance.triggers.clone();
            triggers.push(trigger.to_string());
            ActiveChainInstance {
                chain_id: instance.chain_id.clone(),
                current_stage: stage.id.clone(),
                stage_start_week: week,
                triggers,
                completed: false,
                completed_week: None,
            }
        }
        Some(_) => return next,
        None => {
            debug!(chain = chain_id, stage = %instance.current_stage, week, "chain completed");
            ActiveChainInstance {
                completed: true,
                completed_week: Some(week),
                ..instance.clone()
            }
        }
    };
    next.active_chains[pos] = updated;
    next
}

/// True once the instance has sat in its stage for `duration.max` weeks.
///
/// `duration.min` is not consulted. Completed instances and instances of
/// unknown chains never auto-progress.
pub fn should_auto_progress_chain(
    catalog: &ChainCatalog,
    chain_id: &str,
    instance: &ActiveChainInstance,
    current_week: u32,
) -> bool {
    if instance.completed {
        return false;
    }
    catalog
        .get(chain_id)
        .and_then(|chain| chain.stage(&instance.current_stage))
        .is_some_and(|stage| instance.weeks_in_stage(current_week) >= stage.duration.max)
}

/// Force every expired instance one step forward.
///
/// The synthetic trigger is the first (lexicographic) trigger of the next
/// stage, or [`AUTO_ADVANCE_TRIGGER`] when the instance is on its last stage.
pub fn auto_progress_chains(catalog: &ChainCatalog, state: &ConsequenceState) -> ConsequenceState {
    let mut next = state.clone();
    for instance in &state.active_chains {
        if !should_auto_progress_chain(catalog, &instance.chain_id, instance, state.current_week) {
            continue;
        }
        let Some(chain) = catalog.get(&instance.chain_id) else {
            continue;
        };
        let trigger = chain
            .stage_index(&instance.current_stage)
            .and_then(|i| chain.stages.get(i + 1))
            .and_then(|stage| stage.triggers.iter().next())
            .map(String::as_str)
            .unwrap_or(AUTO_ADVANCE_TRIGGER);
        debug!(chain = %instance.chain_id, trigger, "stage expired");
        next = progress_chain(catalog, &instance.chain_id, trigger, &next);
    }
    next
}

/// Stage definition the chain's instance currently sits in.
///
/// Falls back to the entry stage if the recorded stage id is not part of the
/// chain; `None` when the chain is unknown or has no instance.
pub fn get_chain_stage<'a>(
    catalog: &'a ChainCatalog,
    chain_id: &str,
    state: &ConsequenceState,
) -> Option<&'a ChainStageDefinition> {
    let chain = catalog.get(chain_id)?;
    let instance = state.instance(chain_id)?;
    chain
        .stage(&instance.current_stage)
        .or_else(|| chain.entry_stage())
}

/// Continuation events of every running instance, in catalog order.
///
/// Duplicates across chains are kept.
pub fn get_chain_continuation_events(
    catalog: &ChainCatalog,
    state: &ConsequenceState,
) -> Vec<String> {
    let mut events = Vec::new();
    for chain in catalog.iter() {
        let Some(instance) = state.instance(&chain.id) else {
            continue;
        };
        if instance.completed {
            continue;
        }
        if let Some(stage) = chain.stage(&instance.current_stage) {
            events.extend(stage.continuation_events.iter().cloned());
        }
    }
    events
}
