//! Scripted headless runs: a scenario, a starting snapshot, steady weekly
//! income and triggers keyed by week.

use crate::session::{RuntimeConfig, ScenarioSession};
use band_chains::{ChainCatalog, ConsequenceState};
use band_core::{ContentError, GameState, ScenarioDefinition};
use band_goals::{GoalProgressReport, VictoryVerdict};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Flat gains applied to the snapshot at the start of every week.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeeklyDelta {
    pub money: i64,
    pub fame: i64,
    pub streams: u64,
    pub followers: u64,
}

/// A scripted playthrough loaded from YAML.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunScript {
    pub scenario: ScenarioDefinition,
    #[serde(default)]
    pub initial_state: GameState,
    #[serde(default)]
    pub weekly: WeeklyDelta,
    /// Trigger ids fired in a given week.
    #[serde(default)]
    pub triggers: BTreeMap<u32, Vec<String>>,
    #[serde(default)]
    pub config: RuntimeConfig,
}

impl RunScript {
    pub fn from_yaml_str(text: &str) -> Result<Self, ContentError> {
        Ok(serde_yaml::from_str(text)?)
    }
}

/// Outcome of [`run_weeks`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunSummary {
    pub weeks_run: u32,
    pub final_state: GameState,
    pub progress: GoalProgressReport,
    pub consequences: ConsequenceState,
    pub featured_events: Vec<String>,
    pub verdict: Option<VictoryVerdict>,
}

/// Play the script for up to `max_weeks`, stopping at the first verdict.
///
/// Stage effects reported by a tick are folded into the snapshot used for
/// the following week.
pub fn run_weeks(script: &RunScript, catalog: ChainCatalog, max_weeks: u32) -> RunSummary {
    let mut session = ScenarioSession::new(script.scenario.clone(), catalog, script.config.clone());
    let mut state = script.initial_state.clone();
    let mut featured_events = Vec::new();
    let mut weeks_run = 0;

    while weeks_run < max_weeks {
        weeks_run += 1;
        state.week += 1;
        state.apply_effects(&BTreeMap::from([
            ("money".to_string(), script.weekly.money),
            ("fame".to_string(), script.weekly.fame),
        ]));
        state.total_streams = state.total_streams.saturating_add(script.weekly.streams);
        state.social_media_followers = state
            .social_media_followers
            .saturating_add(script.weekly.followers);

        let fired = script.triggers.get(&state.week).cloned().unwrap_or_default();
        let report = session.tick(&state, &fired);
        state.apply_effects(&report.effects);
        featured_events.extend(report.featured_event);
        debug!(week = state.week, money = %state.money, fame = state.fame, "week played");
        if report.verdict.is_some() {
            break;
        }
    }

    RunSummary {
        weeks_run,
        final_state: state,
        progress: session.progress().clone(),
        consequences: session.consequences().clone(),
        featured_events,
        verdict: session.verdict().cloned(),
    }
}
