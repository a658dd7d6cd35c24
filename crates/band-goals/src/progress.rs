//! Goal completion and progress, recomputed from the snapshot on every call.

use band_core::{GameState, GoalDefinition, GoalTarget, GoalType, LabelTier};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::trace;

/// How a goal type compares the snapshot against its target.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Rule {
    /// Satisfied when the value reaches the numeric target.
    AtLeast(f64),
    /// Like `AtLeast`, but the value is not reported as progress.
    Reaches(f64),
    /// Satisfied while the value stays within the numeric target.
    AtMost(f64),
    /// Satisfied when the condition holds; the target is not consulted.
    Holds(bool),
    Never,
}

/// One row per goal type.
fn rule(kind: GoalType, state: &GameState) -> Rule {
    use GoalType::*;
    match kind {
        TotalStreams => Rule::AtLeast(state.total_streams as f64),
        StayIndependent => Rule::Holds(!state.has_signed_label),
        SignMajorLabel => Rule::Holds(
            state.has_signed_label && state.label_tier == Some(LabelTier::Major),
        ),
        NumberOneAlbum => Rule::Holds(state.albums.iter().any(|a| a.chart_position == Some(1))),
        TourRegions => Rule::AtLeast(state.tour_regions.len() as f64),
        GoViral => Rule::Holds(state.is_viral),
        SurviveWeeks => Rule::AtLeast(f64::from(state.week)),
        MaintainFame => Rule::AtLeast(f64::from(state.fame)),
        TotalHits => Rule::Reaches(state.hit_count() as f64),
        SocialFollowers => Rule::AtLeast(state.social_media_followers as f64),
        PlaylistPlacements => Rule::AtLeast(state.playlist_placements.len() as f64),
        TopTenHits => Rule::Reaches(state.top_ten_count() as f64),
        WithinWeeks => Rule::AtMost(f64::from(state.week)),
        EarnMoney => Rule::AtLeast(state.money.to_f64().unwrap_or(0.0)),
        MaxBandSize => Rule::AtLeast(state.band_members.len() as f64),
        GrammyWins => Rule::Reaches(f64::from(state.grammy_wins)),
        Unknown => Rule::Never,
    }
}

/// Whether the snapshot satisfies the goal. Unknown goal types and numeric
/// goals without a numeric target are never satisfied.
pub fn check_goal(goal: &GoalDefinition, state: &GameState) -> bool {
    let target = goal.numeric_target();
    match rule(goal.kind, state) {
        Rule::AtLeast(value) | Rule::Reaches(value) => target.is_some_and(|t| value >= t),
        Rule::AtMost(value) => target.is_some_and(|t| value <= t),
        Rule::Holds(holds) => holds,
        Rule::Never => false,
    }
}

/// Current scalar progress toward the goal.
///
/// Stream counts are clamped to the target. Goals without a numeric target,
/// deadline, count-of-hits, award and yes/no goals report 0.
pub fn goal_progress(goal: &GoalDefinition, state: &GameState) -> f64 {
    let Some(target) = goal.numeric_target() else {
        return 0.0;
    };
    match rule(goal.kind, state) {
        Rule::AtLeast(value) if goal.kind == GoalType::TotalStreams => value.min(target),
        Rule::AtLeast(value) => value,
        Rule::Reaches(_) | Rule::AtMost(_) | Rule::Holds(_) | Rule::Never => 0.0,
    }
}

/// Progress of a single goal as of the last recomputation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GoalProgressEntry {
    pub goal: GoalDefinition,
    pub progress: f64,
    pub completed: bool,
    pub target: Option<GoalTarget>,
}

/// Full tracker output for one tick.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalProgressReport {
    /// Keyed by goal id.
    pub progress: BTreeMap<String, GoalProgressEntry>,
    /// Completed goal ids in scenario order.
    pub completed: Vec<String>,
}

/// Recompute every goal from scratch.
pub fn update_goal_progress(goals: &[GoalDefinition], state: &GameState) -> GoalProgressReport {
    let mut report = GoalProgressReport::default();
    for goal in goals {
        let completed = check_goal(goal, state);
        let progress = goal_progress(goal, state);
        trace!(goal = %goal.id, kind = ?goal.kind, progress, completed, "goal evaluated");
        if completed {
            report.completed.push(goal.id.clone());
        }
        report.progress.insert(
            goal.id.clone(),
            GoalProgressEntry {
                goal: goal.clone(),
                progress,
                completed,
                target: goal.target,
            },
        );
    }
    report
}

/// Percentage for progress bars, in [0, 100].
///
/// Only a completed entry reports 100; incomplete entries cap at 99.
pub fn goal_percentage(entry: &GoalProgressEntry) -> u8 {
    if entry.completed {
        return 100;
    }
    let Some(target) = entry.target.and_then(|t| t.as_number()) else {
        return 0;
    };
    if target <= 0.0 || !target.is_finite() {
        return 0;
    }
    let pct = (entry.progress / target * 100.0).round();
    if !pct.is_finite() {
        return 0;
    }
    pct.clamp(0.0, 99.0) as u8
}
