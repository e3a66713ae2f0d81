//! Attempt payloads and their scoring.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::{Score, Stance};

/// Composite trick submitted when a combo challenge is landed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NewComboTrick {
    pub name: String,
    #[serde(default)]
    pub stance: Stance,
    pub component_trick_ids: Vec<String>,
}

/// What the skater reports when submitting a challenge
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttemptData {
    Lands { lands_completed: u32, attempts: u32 },
    ComboTrick(NewComboTrick),
    #[default]
    None,
}

/// A scored lands/attempts submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptScore {
    pub lands: u32,
    pub attempts: u32,
    pub score: Score,
    pub target: u32,
    pub failed: bool,
}

impl AttemptScore {
    pub fn exceeded_target(&self) -> bool {
        self.lands > self.target
    }
}

/// Score a submission against `target`. `can_fail = false` never marks failure.
pub fn score_attempt(lands: u32, attempts: u32, target: u32, can_fail: bool) -> EngineResult<AttemptScore> {
    if attempts == 0 {
        return Err(EngineError::InvalidAttempt("attempts must be greater than zero".to_string()));
    }
    if lands > attempts {
        return Err(EngineError::InvalidAttempt(format!(
            "lands ({}) exceed attempts ({})",
            lands, attempts
        )));
    }

    Ok(AttemptScore {
        lands,
        attempts,
        score: Score::from_rate(lands, attempts),
        target,
        failed: can_fail && lands < target,
    })
}
