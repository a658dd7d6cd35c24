#![deny(warnings)]

//! Core domain models for Band Tycoon.
//!
//! This crate defines the serializable game-state snapshot and the scenario
//! content (goals and special rules) shared by the goal tracker, the victory
//! evaluator and the consequence-chain engine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Record label tier a band can be signed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelTier {
    /// Independent label.
    Indie,
    /// Mid-size label.
    Mid,
    /// One of the majors.
    Major,
    /// Any tier newer content may introduce.
    #[serde(other)]
    Other,
}

/// A released album and its best chart position, if it charted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Album {
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "chartPosition")]
    pub chart_position: Option<u32>,
}

/// A recorded song.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Song {
    #[serde(default)]
    pub title: String,
    /// Popularity score in [0, 100].
    #[serde(default)]
    pub popularity: u32,
    #[serde(default, alias = "chartPosition")]
    pub chart_position: Option<u32>,
}

/// A member of the band roster.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BandMember {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
}

/// Read-only snapshot of the game supplied by the host every tick.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameState {
    /// Current game week (1-based).
    pub week: u32,
    /// Cash on hand; negative means the band is in debt.
    pub money: Decimal,
    pub fame: u32,
    #[serde(alias = "totalStreams")]
    pub total_streams: u64,
    #[serde(alias = "hasSignedLabel")]
    pub has_signed_label: bool,
    #[serde(alias = "labelTier")]
    pub label_tier: Option<LabelTier>,
    pub albums: Vec<Album>,
    pub songs: Vec<Song>,
    #[serde(alias = "bandMembers")]
    pub band_members: Vec<BandMember>,
    #[serde(alias = "tourRegions")]
    pub tour_regions: Vec<String>,
    #[serde(alias = "isViral")]
    pub is_viral: bool,
    #[serde(alias = "socialMediaFollowers")]
    pub social_media_followers: u64,
    #[serde(alias = "playlistPlacements")]
    pub playlist_placements: Vec<String>,
    #[serde(alias = "grammyWins")]
    pub grammy_wins: u32,
    /// Secondary stats touched by consequence effects (health, stress, ...).
    pub stats: BTreeMap<String, i64>,
}

impl GameState {
    /// Apply signed stat deltas produced by consequence stages.
    ///
    /// `money` and `fame` map onto their dedicated fields (fame saturates at
    /// zero); every other name accumulates into `stats`.
    pub fn apply_effects(&mut self, effects: &BTreeMap<String, i64>) {
        for (stat, &delta) in effects {
            match stat.as_str() {
                "money" => self.money += Decimal::from(delta),
                "fame" => {
                    let fame = i64::from(self.fame).saturating_add(delta).max(0);
                    self.fame = u32::try_from(fame).unwrap_or(u32::MAX);
                }
                other => {
                    let entry = self.stats.entry(other.to_string()).or_insert(0);
                    *entry = entry.saturating_add(delta);
                    debug!(stat = other, delta, value = *entry, "stat effect applied");
                }
            }
        }
    }

    /// Songs whose popularity counts them as hits.
    pub fn hit_count(&self) -> usize {
        self.songs.iter().filter(|s| s.popularity > 50).count()
    }

    /// Songs that reached the top ten.
    pub fn top_ten_count(&self) -> usize {
        self.songs
            .iter()
            .filter(|s| s.chart_position.is_some_and(|p| p <= 10))
            .count()
    }
}

/// Closed set of goal kinds a scenario can author.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GoalType {
    TotalStreams,
    StayIndependent,
    SignMajorLabel,
    NumberOneAlbum,
    TourRegions,
    GoViral,
    SurviveWeeks,
    MaintainFame,
    TotalHits,
    SocialFollowers,
    PlaylistPlacements,
    TopTenHits,
    WithinWeeks,
    EarnMoney,
    MaxBandSize,
    #[serde(rename = "grammarWins", alias = "grammyWins")]
    GrammyWins,
    /// Tags this build does not know; such goals are never satisfied.
    #[serde(other)]
    Unknown,
}

/// Goal target: numeric threshold or boolean flag.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GoalTarget {
    Flag(bool),
    Number(f64),
}

impl GoalTarget {
    /// Numeric threshold, if this target is one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            GoalTarget::Number(n) => Some(*n),
            GoalTarget::Flag(_) => None,
        }
    }
}

/// A scenario-defined success condition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GoalDefinition {
    /// Unique within its scenario.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: GoalType,
    #[serde(default)]
    pub target: Option<GoalTarget>,
}

impl GoalDefinition {
    pub fn new(id: impl Into<String>, kind: GoalType, target: Option<GoalTarget>) -> Self {
        Self {
            id: id.into(),
            kind,
            target,
        }
    }

    /// Numeric target, or `None` when absent or boolean.
    pub fn numeric_target(&self) -> Option<f64> {
        self.target.and_then(|t| t.as_number())
    }
}

/// Rules that modify how a scenario ends.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecialRules {
    /// Last week in which the goals may still be completed.
    #[serde(default, alias = "timeLimit")]
    pub time_limit: Option<u32>,
}

/// A play mode: goal set plus special rules.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDefinition {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub goals: Vec<GoalDefinition>,
    #[serde(default, alias = "specialRules")]
    pub special_rules: SpecialRules,
}

impl ScenarioDefinition {
    /// Parse a scenario authored as YAML.
    pub fn from_yaml_str(text: &str) -> Result<Self, ContentError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Name used in logs; sandbox scenarios may be unnamed.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("sandbox")
    }
}

/// Errors raised while reading authored content.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("invalid yaml content: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
