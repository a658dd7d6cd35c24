//! Per-playthrough tick driver.
//!
//! Owns the state the pure engines hand back between ticks: consequence
//! chains, the last goal report and the latched verdict.

use band_chains::{
    auto_progress_chains, get_chain_continuation_events, progress_chain, ActiveChainInstance,
    ChainCatalog, ChainDefinition, ConsequenceState, AUTO_ADVANCE_TRIGGER,
};
use band_core::{GameState, ScenarioDefinition};
use band_goals::{evaluate_with, update_goal_progress, GoalProgressReport, VictoryRules, VictoryVerdict};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Runtime configuration parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Seed for the featured-event RNG.
    pub rng_seed: u64,
    /// Push chains forward once a stage outlives `duration.max`.
    pub auto_advance: bool,
    /// Probability in [0, 1] of featuring one continuation event per tick.
    pub featured_event_chance: f64,
    pub victory: VictoryRules,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            rng_seed: 42,
            auto_advance: true,
            featured_event_chance: 0.5,
            victory: VictoryRules::default(),
        }
    }
}

/// A stage change observed during a tick.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainTransition {
    Started { chain_id: String, stage: String },
    Advanced { chain_id: String, from: String, to: String },
    Completed { chain_id: String, stage: String },
}

impl ChainTransition {
    fn between(before: Option<&ActiveChainInstance>, after: &ActiveChainInstance) -> Option<Self> {
        let chain_id = after.chain_id.clone();
        match before {
            None => Some(ChainTransition::Started {
                chain_id,
                stage: after.current_stage.clone(),
            }),
            Some(b) if b.current_stage != after.current_stage => Some(ChainTransition::Advanced {
                chain_id,
                from: b.current_stage.clone(),
                to: after.current_stage.clone(),
            }),
            Some(b) if !b.completed && after.completed => Some(ChainTransition::Completed {
                chain_id,
                stage: after.current_stage.clone(),
            }),
            Some(_) => None,
        }
    }

    /// Chain and stage entered by this transition, if any.
    fn entered(&self) -> Option<(&str, &str)> {
        match self {
            ChainTransition::Started { chain_id, stage } => Some((chain_id.as_str(), stage.as_str())),
            ChainTransition::Advanced { chain_id, to, .. } => Some((chain_id.as_str(), to.as_str())),
            ChainTransition::Completed { .. } => None,
        }
    }
}

/// Everything the host needs after one tick.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TickReport {
    pub week: u32,
    pub transitions: Vec<ChainTransition>,
    /// Summed effects of every stage entered this tick.
    pub effects: BTreeMap<String, i64>,
    pub continuation_events: Vec<String>,
    pub featured_event: Option<String>,
    pub progress: GoalProgressReport,
    pub verdict: Option<VictoryVerdict>,
}

/// One playthrough of one scenario.
pub struct ScenarioSession {
    scenario: ScenarioDefinition,
    catalog: ChainCatalog,
    config: RuntimeConfig,
    consequences: ConsequenceState,
    progress: GoalProgressReport,
    verdict: Option<VictoryVerdict>,
    rng: ChaCha8Rng,
}

impl ScenarioSession {
    pub fn new(scenario: ScenarioDefinition, catalog: ChainCatalog, config: RuntimeConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.rng_seed);
        Self {
            scenario,
            catalog,
            config,
            consequences: ConsequenceState::default(),
            progress: GoalProgressReport::default(),
            verdict: None,
            rng,
        }
    }

    pub fn scenario(&self) -> &ScenarioDefinition {
        &self.scenario
    }

    pub fn catalog(&self) -> &ChainCatalog {
        &self.catalog
    }

    pub fn consequences(&self) -> &ConsequenceState {
        &self.consequences
    }

    pub fn progress(&self) -> &GoalProgressReport {
        &self.progress
    }

    /// The latched verdict; stays set until [`reset`](Self::reset).
    pub fn verdict(&self) -> Option<&VictoryVerdict> {
        self.verdict.as_ref()
    }

    /// Clear all tracked state and reseed the RNG.
    pub fn reset(&mut self) {
        self.consequences = ConsequenceState::default();
        self.progress = GoalProgressReport::default();
        self.verdict = None;
        self.rng = ChaCha8Rng::seed_from_u64(self.config.rng_seed);
    }

    /// Switch to another scenario, starting over.
    pub fn swap_scenario(&mut self, scenario: ScenarioDefinition) {
        info!(from = self.scenario.display_name(), to = scenario.display_name(), "scenario swapped");
        self.scenario = scenario;
        self.reset();
    }

    /// Advance chains, recompute goals and evaluate the verdict.
    pub fn tick(&mut self, snapshot: &GameState, triggers: &[String]) -> TickReport {
        let mut state = ConsequenceState {
            current_week: snapshot.week,
            ..self.consequences.clone()
        };
        let mut transitions = Vec::new();

        for trigger in triggers {
            for chain in self.catalog.iter() {
                if !accepts_trigger(chain, &state, trigger) {
                    continue;
                }
                let next = progress_chain(&self.catalog, &chain.id, trigger, &state);
                if let Some(after) = next.instance(&chain.id) {
                    transitions.extend(ChainTransition::between(state.instance(&chain.id), after));
                }
                state = next;
            }
        }
        if self.config.auto_advance {
            let next = auto_progress_chains(&self.catalog, &state);
            for after in &next.active_chains {
                transitions.extend(ChainTransition::between(state.instance(&after.chain_id), after));
            }
            state = next;
        }

        let effects = self.entered_effects(&transitions);
        self.consequences = state;
        self.progress = update_goal_progress(&self.scenario.goals, snapshot);

        if self.verdict.is_none() {
            self.verdict = evaluate_with(
                &self.config.victory,
                snapshot,
                &self.progress.completed,
                &self.scenario,
            );
            if let Some(verdict) = &self.verdict {
                info!(
                    scenario = self.scenario.display_name(),
                    week = snapshot.week,
                    reason = %verdict.reason(),
                    victory = verdict.is_victory(),
                    "verdict reached"
                );
            }
        }

        let continuation_events = get_chain_continuation_events(&self.catalog, &self.consequences);
        let featured_event = pick_featured_event(
            &mut self.rng,
            &continuation_events,
            self.config.featured_event_chance,
        );
        debug!(
            week = snapshot.week,
            transitions = transitions.len(),
            events = continuation_events.len(),
            ?featured_event,
            "tick complete"
        );

        TickReport {
            week: snapshot.week,
            transitions,
            effects,
            continuation_events,
            featured_event,
            progress: self.progress.clone(),
            verdict: self.verdict.clone(),
        }
    }

    fn entered_effects(&self, transitions: &[ChainTransition]) -> BTreeMap<String, i64> {
        let mut effects = BTreeMap::new();
        for (chain_id, stage_id) in transitions.iter().filter_map(ChainTransition::entered) {
            let Some(stage) = self.catalog.get(chain_id).and_then(|c| c.stage(stage_id)) else {
                continue;
            };
            for (stat, delta) in &stage.effects {
                let total: &mut i64 = effects.entry(stat.clone()).or_insert(0);
                *total = total.saturating_add(*delta);
            }
        }
        effects
    }
}

/// Whether `trigger` should be offered to `chain` this tick.
///
/// The reducer completes an instance on its last stage with any trigger, so
/// the final stage only ends on [`AUTO_ADVANCE_TRIGGER`] or on one of its own
/// triggers fired in a later week than the one it was entered.
fn accepts_trigger(chain: &ChainDefinition, state: &ConsequenceState, trigger: &str) -> bool {
    let Some(instance) = state.instance(&chain.id) else {
        return true;
    };
    let last = chain.stages.len().checked_sub(1);
    if instance.completed || chain.stage_index(&instance.current_stage) != last {
        return true;
    }
    if trigger == AUTO_ADVANCE_TRIGGER {
        return true;
    }
    instance.stage_start_week < state.current_week
        && chain
            .stages
            .last()
            .is_some_and(|stage| stage.triggers.contains(trigger))
}

/// With probability `chance`, pick one of `events` uniformly.
pub fn pick_featured_event<R: Rng>(rng: &mut R, events: &[String], chance: f64) -> Option<String> {
    if events.is_empty() || chance.is_nan() || chance <= 0.0 {
        return None;
    }
    if !rng.gen_bool(chance.min(1.0)) {
        return None;
    }
    events.get(rng.gen_range(0..events.len())).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use band_core::{BandMember, GoalDefinition, GoalTarget, GoalType, SpecialRules};
    use band_goals::VerdictReason;
    use rust_decimal::Decimal;

    fn session(goals: Vec<GoalDefinition>, time_limit: Option<u32>) -> ScenarioSession {
        let scenario = ScenarioDefinition {
            name: Some("test".into()),
            goals,
            special_rules: SpecialRules { time_limit },
        };
        ScenarioSession::new(scenario, ChainCatalog::builtin().unwrap(), RuntimeConfig::default())
    }

    fn snapshot(week: u32, money: i64) -> GameState {
        GameState {
            week,
            money: Decimal::from(money),
            band_members: vec![BandMember::default(); 3],
            ..Default::default()
        }
    }

    fn triggers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn two_triggers_in_one_tick_enter_two_stages() {
        let mut s = session(vec![], None);
        let report = s.tick(&snapshot(1, 0), &triggers(&["substance_use", "tolerance_building"]));
        assert_eq!(
            report.transitions,
            vec![
                ChainTransition::Started {
                    chain_id: "addiction_spiral".into(),
                    stage: "experimentation".into()
                },
                ChainTransition::Advanced {
                    chain_id: "addiction_spiral".into(),
                    from: "experimentation".into(),
                    to: "regular_use".into()
                },
            ]
        );
        // experimentation {creativity 5, health -2} + regular_use {health -5, stress -3, money -200}
        assert_eq!(report.effects.get("health"), Some(&-7));
        assert_eq!(report.effects.get("creativity"), Some(&5));
        assert_eq!(report.effects.get("money"), Some(&-200));
        assert_eq!(report.continuation_events, ["dealer_contact", "missed_soundcheck"]);
        assert_eq!(s.consequences().current_week, 1);
    }

    #[test]
    fn stages_expire_without_triggers() {
        let mut s = session(vec![], None);
        s.tick(&snapshot(1, 0), &triggers(&["fan_letter"]));
        let quiet = s.tick(&snapshot(4, 0), &[]);
        assert!(quiet.transitions.is_empty());
        let expired = s.tick(&snapshot(5, 0), &[]);
        assert_eq!(
            expired.transitions,
            vec![ChainTransition::Advanced {
                chain_id: "stalker_escalation".into(),
                from: "devoted_fan".into(),
                to: "fixation".into()
            }]
        );
        assert_eq!(expired.effects.get("stress"), Some(&5));
    }

    #[test]
    fn auto_advance_can_be_disabled() {
        let scenario = ScenarioDefinition::default();
        let config = RuntimeConfig { auto_advance: false, ..Default::default() };
        let mut s = ScenarioSession::new(scenario, ChainCatalog::builtin().unwrap(), config);
        s.tick(&snapshot(1, 0), &triggers(&["fan_letter"]));
        let report = s.tick(&snapshot(50, 0), &[]);
        assert!(report.transitions.is_empty());
        assert_eq!(
            s.consequences().instance("stalker_escalation").unwrap().current_stage,
            "devoted_fan"
        );
    }

    #[test]
    fn verdict_latches_until_reset() {
        let goal = GoalDefinition::new("cash", GoalType::EarnMoney, Some(GoalTarget::Number(500.0)));
        let mut s = session(vec![goal], Some(10));
        assert!(s.tick(&snapshot(2, -20), &[]).verdict.is_some());
        let later = s.tick(&snapshot(3, 900), &[]);
        assert_eq!(later.verdict.unwrap().reason(), VerdictReason::Bankruptcy);
        assert_eq!(later.progress.completed, ["cash"]);

        s.reset();
        assert!(s.verdict().is_none());
        let report = s.tick(&snapshot(3, 900), &[]);
        assert_eq!(report.verdict.unwrap().reason(), VerdictReason::AllGoalsAchieved);
    }

    #[test]
    fn swapping_scenario_clears_chains() {
        let mut s = session(vec![], None);
        s.tick(&snapshot(1, 0), &triggers(&["accept_bribe"]));
        assert_eq!(s.consequences().active_chains.len(), 1);
        s.swap_scenario(ScenarioDefinition {
            name: Some("sandbox".into()),
            ..Default::default()
        });
        assert!(s.consequences().active_chains.is_empty());
        assert!(s.progress().progress.is_empty());
        assert_eq!(s.scenario().display_name(), "sandbox");
    }

    #[test]
    fn replay_is_deterministic() {
        let run = || {
            let mut s = session(vec![], None);
            let mut featured = Vec::new();
            for week in 1..30 {
                let fired = if week == 1 { triggers(&["substance_use", "fan_letter"]) } else { vec![] };
                featured.push(s.tick(&snapshot(week, 100), &fired).featured_event);
            }
            (featured, s.consequences().clone())
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn final_stage_outlives_unrelated_triggers() {
        let mut s = session(vec![], None);
        for (week, trigger) in [
            (1, "fan_letter"),
            (2, "repeated_letters"),
            (3, "backstage_breach"),
            (4, "threat_received"),
        ] {
            s.tick(&snapshot(week, 0), &triggers(&[trigger]));
        }
        let entered = s.tick(&snapshot(5, 0), &triggers(&["restraining_order", "accept_bribe"]));
        assert_eq!(
            entered.transitions,
            vec![
                ChainTransition::Advanced {
                    chain_id: "stalker_escalation".into(),
                    from: "confrontation".into(),
                    to: "resolution".into()
                },
                ChainTransition::Started {
                    chain_id: "corruption_path".into(),
                    stage: "first_compromise".into()
                },
            ]
        );
        assert!(entered.continuation_events.contains(&"court_hearing".to_string()));

        let unrelated = s.tick(&snapshot(6, 0), &triggers(&["fan_letter", "cover_up"]));
        let stalker = s.consequences().instance("stalker_escalation").unwrap();
        assert!(!stalker.completed);
        assert_eq!(stalker.current_stage, "resolution");
        assert!(!unrelated
            .transitions
            .iter()
            .any(|t| matches!(t, ChainTransition::Completed { .. })));

        let closing = s.tick(&snapshot(7, 0), &triggers(&["police_report"]));
        assert_eq!(
            closing.transitions,
            vec![ChainTransition::Completed {
                chain_id: "stalker_escalation".into(),
                stage: "resolution".into()
            }]
        );
    }

    #[test]
    fn auto_advance_trigger_closes_final_stage() {
        let config = RuntimeConfig { auto_advance: false, ..Default::default() };
        let mut s =
            ScenarioSession::new(ScenarioDefinition::default(), ChainCatalog::builtin().unwrap(), config);
        for (week, trigger) in [
            (1, "chart_success"),
            (2, "diva_demand"),
            (3, "fire_manager"),
            (4, "public_tantrum"),
        ] {
            s.tick(&snapshot(week, 0), &triggers(&[trigger]));
        }
        s.tick(&snapshot(4, 0), &triggers(&[AUTO_ADVANCE_TRIGGER]));
        assert!(s.consequences().instance("fame_corruption").unwrap().completed);
    }

    #[test]
    fn featured_event_respects_chance() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let events = triggers(&["a", "b"]);
        assert_eq!(pick_featured_event(&mut rng, &events, 0.0), None);
        assert_eq!(pick_featured_event(&mut rng, &events, f64::NAN), None);
        assert_eq!(pick_featured_event(&mut rng, &[], 1.0), None);
        let picked = pick_featured_event(&mut rng, &events, 1.0).unwrap();
        assert!(events.contains(&picked));
        assert!(pick_featured_event(&mut rng, &events, 7.5).is_some());
    }
}
