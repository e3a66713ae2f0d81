use chrono::{DateTime, Utc};
use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use super::obstacle::ObstacleScore;

/// Highest consistency a (trick, obstacle) pair can reach
pub const MAX_SCORE: u8 = 10;

/// Landed-rate consistency on a 0..=10 scale.
///
/// The range is enforced at construction and on deserialization, so a `Score`
/// held anywhere in the engine is always valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Score(u8);

impl Score {
    pub const ZERO: Score = Score(0);
    pub const MAX: Score = Score(MAX_SCORE);

    pub fn new(value: u8) -> Option<Self> {
        (value <= MAX_SCORE).then_some(Self(value))
    }

    /// Clamp any non-negative integer into range.
    pub fn saturating(value: u32) -> Self {
        Self(value.min(MAX_SCORE as u32) as u8)
    }

    /// `floor(landed / attempts * 10)`, clamped. `attempts == 0` yields zero.
    pub fn from_rate(landed: u32, attempts: u32) -> Self {
        if attempts == 0 {
            return Self::ZERO;
        }
        Self::saturating(landed.saturating_mul(10) / attempts)
    }

    /// `round(landed / attempts * 10)`, halves up. Used for manually logged sessions.
    pub fn from_rate_rounded(landed: u32, attempts: u32) -> Self {
        if attempts == 0 {
            return Self::ZERO;
        }
        let (landed, attempts) = (u64::from(landed), u64::from(attempts));
        Self::saturating(((landed * 20 + attempts) / (attempts * 2)).min(u64::from(MAX_SCORE)) as u32)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_max(self) -> bool {
        self.0 == MAX_SCORE
    }
}

impl TryFrom<u8> for Score {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Score::new(value).ok_or_else(|| format!("score {} out of range 0..={}", value, MAX_SCORE))
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> u8 {
        score.0
    }
}

impl JsonSchema for Score {
    fn schema_name() -> String {
        "Score".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        <u8>::json_schema(gen)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.0, MAX_SCORE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    #[default]
    Regular,
    Switch,
    Nollie,
    Fakie,
}

impl Stance {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "regular" => Some(Stance::Regular),
            "switch" => Some(Stance::Switch),
            "nollie" => Some(Stance::Nollie),
            "fakie" => Some(Stance::Fakie),
            _ => None,
        }
    }
}

/// Derived mastery classification. Lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Tier {
    Mastered = 1,
    Moderate = 2,
    #[default]
    Beginner = 3,
}

impl Tier {
    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            1 => Some(Tier::Mastered),
            2 => Some(Tier::Moderate),
            3 => Some(Tier::Beginner),
            _ => None,
        }
    }

    /// Reward multiplier: harder-earned progress on weaker tricks pays more.
    pub fn xp_multiplier(self) -> f64 {
        match self {
            Tier::Mastered => 1.0,
            Tier::Moderate => 1.5,
            Tier::Beginner => 2.0,
        }
    }
}

impl TryFrom<u8> for Tier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Tier::from_value(value).ok_or_else(|| format!("tier {} out of range 1..=3", value))
    }
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> u8 {
        tier.value()
    }
}

impl JsonSchema for Tier {
    fn schema_name() -> String {
        "Tier".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        <u8>::json_schema(gen)
    }
}

/// A named maneuver tracked per user. `tier` is a cache of the consistency-derived value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Trick {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub stance: Stance,
    #[serde(default)]
    pub tier: Tier,
    #[serde(default)]
    pub obstacle_ids: Vec<String>,
    /// Non-empty for composite tricks created from a combo challenge
    #[serde(default)]
    pub component_trick_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Trick {
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        name: impl Into<String>,
        stance: Stance,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            name: name.into(),
            stance,
            tier: Tier::Beginner,
            obstacle_ids: Vec::new(),
            component_trick_ids: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_obstacles(mut self, obstacle_ids: &[&str]) -> Self {
        self.obstacle_ids = obstacle_ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    pub fn display_name(&self) -> String {
        match self.stance {
            Stance::Regular => self.name.clone(),
            other => format!("{:?} {}", other, self.name),
        }
    }
}

/// Repository view of a trick: the trick with its obstacles and per-obstacle scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrickSnapshot {
    pub trick: Trick,
    pub obstacles: Vec<ObstacleScore>,
}

impl TrickSnapshot {
    pub fn id(&self) -> &str {
        &self.trick.id
    }

    pub fn tier(&self) -> Tier {
        self.trick.tier
    }

    /// Every obstacle scored 10/10. A trick without obstacles is never mastered.
    pub fn is_fully_mastered(&self) -> bool {
        !self.obstacles.is_empty()
            && self.obstacles.iter().all(|o| o.score.map_or(false, Score::is_max))
    }

    pub fn best_score(&self) -> Option<u8> {
        self.obstacles.iter().filter_map(|o| o.score_value()).max()
    }

    pub fn score_on(&self, obstacle_id: &str) -> Option<&ObstacleScore> {
        self.obstacles.iter().find(|o| o.obstacle.id == obstacle_id)
    }

    pub fn has_landed_on(&self, obstacle_id: &str) -> bool {
        self.score_on(obstacle_id).map_or(false, |o| o.landed)
    }

    /// Obstacles scored at or above `min_score`.
    pub fn obstacles_at_least(&self, min_score: u8) -> impl Iterator<Item = &ObstacleScore> {
        self.obstacles.iter().filter(move |o| o.score_value().map_or(false, |s| s >= min_score))
    }

    /// Strongest obstacle for this trick: highest score, ties to the easier obstacle.
    pub fn primary_obstacle(&self) -> Option<&ObstacleScore> {
        self.obstacles.iter().min_by(|a, b| {
            let by_score = b.score_value().cmp(&a.score_value());
            if by_score != Ordering::Equal {
                return by_score;
            }
            a.obstacle
                .difficulty
                .cmp(&b.obstacle.difficulty)
                .then_with(|| a.obstacle.id.cmp(&b.obstacle.id))
        })
    }
}
