//! Registry of consequence-chain definitions.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

const DEFAULT_CHAINS: &str = include_str!("../assets/default_chains.yaml");

/// Residency window of a stage, in weeks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDuration {
    pub min: u32,
    pub max: u32,
}

/// One step of a chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainStageDefinition {
    /// Unique within its chain.
    pub id: String,
    pub duration: StageDuration,
    /// Signed stat deltas applied when the stage is entered.
    #[serde(default)]
    pub effects: BTreeMap<String, i64>,
    /// Triggers that move a chain into this stage.
    #[serde(default)]
    pub triggers: BTreeSet<String>,
    /// Event ids surfaced while this stage is current.
    #[serde(default)]
    pub continuation_events: Vec<String>,
}

/// A multi-stage narrative arc. Stage 0 is the entry stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainDefinition {
    pub id: String,
    pub name: String,
    pub stages: Vec<ChainStageDefinition>,
}

impl ChainDefinition {
    pub fn entry_stage(&self) -> Option<&ChainStageDefinition> {
        self.stages.first()
    }

    pub fn stage_index(&self, stage_id: &str) -> Option<usize> {
        self.stages.iter().position(|s| s.id == stage_id)
    }

    pub fn stage(&self, stage_id: &str) -> Option<&ChainStageDefinition> {
        self.stages.iter().find(|s| s.id == stage_id)
    }
}

/// Errors raised while building a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid chain yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("chain already registered: {0}")]
    DuplicateChain(String),
    #[error("chain has no stages: {0}")]
    EmptyChain(String),
}

/// Immutable, ordered set of chain definitions keyed by chain id.
///
/// Registration order is significant: continuation events are reported in
/// the order chains were registered.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChainCatalog {
    chains: Vec<ChainDefinition>,
}

impl ChainCatalog {
    /// The four chains shipped with the base game.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_yaml_str(DEFAULT_CHAINS)
    }

    /// Build a catalog from a YAML list of chain definitions.
    pub fn from_yaml_str(text: &str) -> Result<Self, CatalogError> {
        let chains: Vec<ChainDefinition> = serde_yaml::from_str(text)?;
        let mut catalog = Self::default();
        for chain in chains {
            catalog.register(chain)?;
        }
        Ok(catalog)
    }

    pub fn register(&mut self, chain: ChainDefinition) -> Result<(), CatalogError> {
        if chain.stages.is_empty() {
            return Err(CatalogError::EmptyChain(chain.id));
        }
        if self.get(&chain.id).is_some() {
            return Err(CatalogError::DuplicateChain(chain.id));
        }
        self.chains.push(chain);
        Ok(())
    }

    /// Append every chain of `other`, keeping its order.
    pub fn extend(&mut self, other: ChainCatalog) -> Result<(), CatalogError> {
        for chain in other.chains {
            self.register(chain)?;
        }
        Ok(())
    }

    pub fn get(&self, chain_id: &str) -> Option<&ChainDefinition> {
        self.chains.iter().find(|c| c.id == chain_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChainDefinition> {
        self.chains.iter()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}
