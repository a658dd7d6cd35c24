#![deny(warnings)]

//! Host-side runtime for Band Tycoon scenarios.
//!
//! Threads consequence state between ticks, latches verdicts and replays
//! scripted runs for the headless CLI.

pub mod script;
pub mod session;

pub use script::{run_weeks, RunScript, RunSummary, WeeklyDelta};
pub use session::{pick_featured_event, ChainTransition, RuntimeConfig, ScenarioSession, TickReport};
