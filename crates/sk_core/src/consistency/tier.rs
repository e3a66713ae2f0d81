//! Tier Calculator
//!
//! Average landed consistency → mastery tier:
//! - avg >= 7 → Mastered (1)
//! - avg >= 4 → Moderate (2)
//! - otherwise, including no evidence at all → Beginner (3)

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::store::{ConsistencyRecord, ConsistencyStore};
use crate::error::EngineResult;
use crate::models::{Score, Tier};
use crate::repository::TrickRepository;

const MASTERED_AVG: u32 = 7;
const MODERATE_AVG: u32 = 4;

/// Pure tier from a set of scores. Compares `sum >= k * n`, so no float rounding.
pub fn calculate_tier(scores: &[Score]) -> Tier {
    if scores.is_empty() {
        return Tier::Beginner;
    }
    let n = scores.len() as u32;
    let sum: u32 = scores.iter().map(|s| u32::from(s.value())).sum();

    if sum >= MASTERED_AVG * n {
        Tier::Mastered
    } else if sum >= MODERATE_AVG * n {
        Tier::Moderate
    } else {
        Tier::Beginner
    }
}

/// Scores that count as evidence: landed and above zero.
pub fn eligible_scores(records: &[ConsistencyRecord]) -> Vec<Score> {
    records.iter().filter(|r| r.is_tier_evidence()).map(|r| r.score).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TierChange {
    pub previous: Tier,
    pub current: Tier,
}

impl TierChange {
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

/// Recompute a trick's tier from its records and write it back only when it differs.
pub fn refresh_trick_tier<R>(repo: &mut R, user_id: &str, trick_id: &str) -> EngineResult<TierChange>
where
    R: TrickRepository + ConsistencyStore + ?Sized,
{
    let trick = repo.trick(trick_id)?;
    let records = repo.records_for_trick(user_id, trick_id)?;
    let current = calculate_tier(&eligible_scores(&records));

    let change = TierChange { previous: trick.tier, current };
    if change.changed() {
        repo.set_trick_tier(trick_id, current)?;
        tracing::info!(
            user_id,
            trick_id,
            from = trick.tier.value(),
            to = current.value(),
            "trick tier updated"
        );
    }
    Ok(change)
}
