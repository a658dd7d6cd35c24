#![deny(warnings)]

//! Consequence chains: slow-burn narrative arcs (addiction, corruption,
//! fame-driven narcissism, stalker escalation) that advance through ordered
//! stages in response to triggers or elapsed weeks.

pub mod catalog;
pub mod engine;

pub use catalog::{
    CatalogError, ChainCatalog, ChainDefinition, ChainStageDefinition, StageDuration,
};
pub use engine::{
    auto_progress_chains, get_chain_continuation_events, get_chain_stage, progress_chain,
    should_auto_progress_chain, ActiveChainInstance, ConsequenceState, AUTO_ADVANCE_TRIGGER,
};
