use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::trick::Score;

/// Physical feature a trick is performed on. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Obstacle {
    pub id: String,
    pub name: String,
    /// Category tag ("rail", "ledge", "flat", ...)
    pub obstacle_type: String,
    /// Higher = harder, always > 0
    pub difficulty: u32,
}

impl Obstacle {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        obstacle_type: impl Into<String>,
        difficulty: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            obstacle_type: obstacle_type.into(),
            difficulty: difficulty.max(1),
        }
    }

    pub fn is_flat(&self) -> bool {
        self.obstacle_type.eq_ignore_ascii_case("flat")
            || self.name.eq_ignore_ascii_case("flatground")
    }

    /// Lowest-difficulty obstacle of the same type that is strictly harder than `self`.
    pub fn next_harder<'a>(&self, all: &'a [Obstacle]) -> Option<&'a Obstacle> {
        all.iter()
            .filter(|o| o.obstacle_type == self.obstacle_type && o.difficulty > self.difficulty)
            .min_by(|a, b| a.difficulty.cmp(&b.difficulty).then_with(|| a.id.cmp(&b.id)))
    }
}

/// An obstacle as seen through one trick: the obstacle plus that trick's consistency on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ObstacleScore {
    pub obstacle: Obstacle,
    /// `None` = never attempted
    pub score: Option<Score>,
    pub landed: bool,
}

impl ObstacleScore {
    pub fn unattempted(obstacle: Obstacle) -> Self {
        Self { obstacle, score: None, landed: false }
    }

    pub fn scored(obstacle: Obstacle, score: Score, landed: bool) -> Self {
        Self { obstacle, score: Some(score), landed }
    }

    pub fn score_value(&self) -> Option<u8> {
        self.score.map(Score::value)
    }
}
