//! Terminal verdicts for a play session.

use band_core::{GameState, ScenarioDefinition};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Why a session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerdictReason {
    #[serde(rename = "Time limit expired")]
    TimeLimitExpired,
    #[serde(rename = "Bankruptcy")]
    Bankruptcy,
    #[serde(rename = "Band Dissolved")]
    BandDissolved,
    #[serde(rename = "All goals achieved!")]
    AllGoalsAchieved,
    #[serde(rename = "Milestone reached!")]
    MilestoneReached,
}

impl VerdictReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictReason::TimeLimitExpired => "Time limit expired",
            VerdictReason::Bankruptcy => "Bankruptcy",
            VerdictReason::BandDissolved => "Band Dissolved",
            VerdictReason::AllGoalsAchieved => "All goals achieved!",
            VerdictReason::MilestoneReached => "Milestone reached!",
        }
    }

    /// Player-facing text for the end-of-run screen.
    pub fn message(&self) -> &'static str {
        match self {
            VerdictReason::TimeLimitExpired => {
                "The clock ran out before the band reached every goal."
            }
            VerdictReason::Bankruptcy => "The band went broke and the label called in the debts.",
            VerdictReason::BandDissolved => "Nobody is left in the band. The dream is over.",
            VerdictReason::AllGoalsAchieved => "Every goal is done. The band made it!",
            VerdictReason::MilestoneReached => "One hundred weeks in the business and still going.",
        }
    }
}

impl fmt::Display for VerdictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the band's standing when a victory is declared.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FinalStats {
    pub week: u32,
    pub fame: u32,
    pub money: Decimal,
    pub albums: usize,
    pub band_size: usize,
}

impl FinalStats {
    fn capture(state: &GameState) -> Self {
        Self {
            week: state.week,
            fame: state.fame,
            money: state.money,
            albums: state.albums.len(),
            band_size: state.band_members.len(),
        }
    }
}

/// Terminal outcome. Ongoing sessions have no verdict.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum VictoryVerdict {
    Victory {
        reason: VerdictReason,
        message: String,
        goals_completed: usize,
        total_goals: usize,
        final_stats: FinalStats,
    },
    Defeat {
        reason: VerdictReason,
        message: String,
        goals_completed: usize,
        total_goals: usize,
    },
}

impl VictoryVerdict {
    pub fn is_victory(&self) -> bool {
        matches!(self, VictoryVerdict::Victory { .. })
    }

    pub fn reason(&self) -> VerdictReason {
        match self {
            VictoryVerdict::Victory { reason, .. } | VictoryVerdict::Defeat { reason, .. } => {
                *reason
            }
        }
    }

    pub fn goals_completed(&self) -> usize {
        match self {
            VictoryVerdict::Victory { goals_completed, .. }
            | VictoryVerdict::Defeat { goals_completed, .. } => *goals_completed,
        }
    }

    pub fn total_goals(&self) -> usize {
        match self {
            VictoryVerdict::Victory { total_goals, .. }
            | VictoryVerdict::Defeat { total_goals, .. } => *total_goals,
        }
    }
}

/// Thresholds used by the evaluator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VictoryRules {
    /// An empty roster only ends the run after this many weeks.
    pub band_grace_weeks: u32,
    /// Week at which a goal-less sandbox run counts as won.
    pub sandbox_milestone_week: u32,
}

impl Default for VictoryRules {
    fn default() -> Self {
        Self {
            band_grace_weeks: 5,
            sandbox_milestone_week: 100,
        }
    }
}

/// Evaluate with the default thresholds.
pub fn evaluate(
    state: &GameState,
    completed_goal_ids: &[String],
    scenario: &ScenarioDefinition,
) -> Option<VictoryVerdict> {
    evaluate_with(&VictoryRules::default(), state, completed_goal_ids, scenario)
}

/// Decide whether the session is over. The first matching rule wins:
/// time limit, bankruptcy, dissolved band, all goals, sandbox milestone.
pub fn evaluate_with(
    rules: &VictoryRules,
    state: &GameState,
    completed_goal_ids: &[String],
    scenario: &ScenarioDefinition,
) -> Option<VictoryVerdict> {
    let done: BTreeSet<&str> = completed_goal_ids.iter().map(String::as_str).collect();
    let total_goals = scenario.goals.len();
    let goals_completed = scenario
        .goals
        .iter()
        .filter(|g| done.contains(g.id.as_str()))
        .count();
    let all_done = goals_completed == total_goals;

    let defeat = |reason: VerdictReason| VictoryVerdict::Defeat {
        reason,
        message: reason.message().to_string(),
        goals_completed,
        total_goals,
    };
    let victory = |reason: VerdictReason| VictoryVerdict::Victory {
        reason,
        message: reason.message().to_string(),
        goals_completed,
        total_goals,
        final_stats: FinalStats::capture(state),
    };

    if let Some(limit) = scenario.special_rules.time_limit {
        if state.week > limit && !all_done {
            return Some(defeat(VerdictReason::TimeLimitExpired));
        }
    }
    if state.money < Decimal::ZERO {
        return Some(defeat(VerdictReason::Bankruptcy));
    }
    if state.band_members.is_empty() && state.week > rules.band_grace_weeks {
        return Some(defeat(VerdictReason::BandDissolved));
    }
    if total_goals > 0 && all_done {
        return Some(victory(VerdictReason::AllGoalsAchieved));
    }
    if total_goals == 0 && state.week >= rules.sandbox_milestone_week {
        return Some(victory(VerdictReason::MilestoneReached));
    }
    None
}
