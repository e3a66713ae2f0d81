use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::models::Score;

/// Per (user, trick, obstacle) consistency. Upserted on every attempt, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConsistencyRecord {
    pub user_id: String,
    pub trick_id: String,
    pub obstacle_id: String,
    pub score: Score,
    /// Sticky: true once any attempt on this pair has landed
    pub landed: bool,
    pub updated_at: DateTime<Utc>,
}

impl ConsistencyRecord {
    pub fn new(
        user_id: impl Into<String>,
        trick_id: impl Into<String>,
        obstacle_id: impl Into<String>,
        score: Score,
        landed: bool,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            trick_id: trick_id.into(),
            obstacle_id: obstacle_id.into(),
            score,
            landed,
            updated_at: Utc::now(),
        }
    }

    /// Record after a new measurement: the score is replaced, `landed` never reverts.
    pub fn measured(previous: Option<&ConsistencyRecord>, fresh: ConsistencyRecord) -> Self {
        let landed = fresh.landed || previous.map_or(false, |p| p.landed);
        Self { landed, ..fresh }
    }

    /// Record after a seed: never lowers an existing score, always marks landed.
    pub fn seeded(previous: Option<&ConsistencyRecord>, fresh: ConsistencyRecord) -> Self {
        match previous {
            Some(prev) => Self { score: prev.score.max(fresh.score), landed: true, ..fresh },
            None => Self { landed: true, ..fresh },
        }
    }

    /// Counts toward the trick tier
    pub fn is_tier_evidence(&self) -> bool {
        self.landed && self.score.value() > 0
    }
}

/// One logged session on a (trick, obstacle) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AttemptLog {
    pub user_id: String,
    pub trick_id: String,
    pub obstacle_id: String,
    pub attempts: u32,
    pub landed: u32,
    pub score: Score,
    pub logged_at: DateTime<Utc>,
}

impl AttemptLog {
    pub fn new(record: &ConsistencyRecord, attempts: u32, landed: u32) -> Self {
        Self {
            user_id: record.user_id.clone(),
            trick_id: record.trick_id.clone(),
            obstacle_id: record.obstacle_id.clone(),
            attempts,
            landed,
            score: record.score,
            logged_at: record.updated_at,
        }
    }
}

/// Leaf accessor for consistency records and the attempt log.
pub trait ConsistencyStore {
    fn consistency(
        &self,
        user_id: &str,
        trick_id: &str,
        obstacle_id: &str,
    ) -> EngineResult<Option<ConsistencyRecord>>;

    fn records_for_trick(&self, user_id: &str, trick_id: &str) -> EngineResult<Vec<ConsistencyRecord>>;

    /// Insert or replace the record for its (user, trick, obstacle) key.
    fn upsert_consistency(&mut self, record: ConsistencyRecord) -> EngineResult<()>;

    fn log_attempt(&mut self, log: AttemptLog) -> EngineResult<()>;
}

/// Upsert a fresh measurement, keeping `landed` sticky. Returns the stored record.
pub fn record_measurement<S: ConsistencyStore + ?Sized>(
    store: &mut S,
    fresh: ConsistencyRecord,
) -> EngineResult<ConsistencyRecord> {
    let previous = store.consistency(&fresh.user_id, &fresh.trick_id, &fresh.obstacle_id)?;
    let record = ConsistencyRecord::measured(previous.as_ref(), fresh);
    store.upsert_consistency(record.clone())?;
    Ok(record)
}

/// Upsert a seed that never lowers an existing score. Returns the stored record.
pub fn record_seed<S: ConsistencyStore + ?Sized>(
    store: &mut S,
    fresh: ConsistencyRecord,
) -> EngineResult<ConsistencyRecord> {
    let previous = store.consistency(&fresh.user_id, &fresh.trick_id, &fresh.obstacle_id)?;
    let record = ConsistencyRecord::seeded(previous.as_ref(), fresh);
    store.upsert_consistency(record.clone())?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(score: u8, landed: bool) -> ConsistencyRecord {
        ConsistencyRecord::new("u1", "t1", "o1", Score::new(score).unwrap(), landed)
    }

    #[test]
    fn test_measurement_replaces_score_but_keeps_landed() {
        let prev = record(8, true);
        let next = ConsistencyRecord::measured(Some(&prev), record(0, false));
        assert_eq!(next.score.value(), 0);
        assert!(next.landed);
    }

    #[test]
    fn test_first_measurement_uses_fresh_landed() {
        let next = ConsistencyRecord::measured(None, record(3, true));
        assert!(next.landed);
        let next = ConsistencyRecord::measured(None, record(0, false));
        assert!(!next.landed);
    }

    #[test]
    fn test_seed_never_lowers() {
        let prev = record(8, true);
        let next = ConsistencyRecord::seeded(Some(&prev), record(1, true));
        assert_eq!(next.score.value(), 8);

        let prev = record(0, false);
        let next = ConsistencyRecord::seeded(Some(&prev), record(5, false));
        assert_eq!(next.score.value(), 5);
        assert!(next.landed);
    }

    #[test]
    fn test_tier_evidence_requires_landed_and_positive() {
        assert!(record(4, true).is_tier_evidence());
        assert!(!record(0, true).is_tier_evidence());
        assert!(!record(4, false).is_tier_evidence());
    }
}
