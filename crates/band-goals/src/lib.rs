#![deny(warnings)]

//! Scenario goals: progress tracking and victory/defeat evaluation.
//!
//! Both halves are pure functions of the snapshot and the scenario, so the
//! host can recompute them every tick and replay them deterministically.

pub mod progress;
pub mod victory;

pub use progress::{
    check_goal, goal_percentage, goal_progress, update_goal_progress, GoalProgressEntry,
    GoalProgressReport,
};
pub use victory::{
    evaluate, evaluate_with, FinalStats, VerdictReason, VictoryRules, VictoryVerdict,
};
