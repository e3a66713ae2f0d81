use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{ChallengeRepository, TrickRepository, UserRepository};
use crate::consistency::{AttemptLog, ConsistencyRecord, ConsistencyStore};
use crate::error::{EngineError, EngineResult};
use crate::models::{Challenge, Obstacle, Tier, Trick, UserProgression};

type ConsistencyKey = (String, String, String);

/// Serializable form of a `MemoryStore`, used for save files and the JSON API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct StoreSnapshot {
    pub obstacles: Vec<Obstacle>,
    pub tricks: Vec<Trick>,
    pub consistency: Vec<ConsistencyRecord>,
    pub challenges: Vec<Challenge>,
    pub users: Vec<UserProgression>,
    pub attempt_logs: Vec<AttemptLog>,
}

/// In-process repository. Ordered maps keep iteration deterministic, so a
/// seeded generation pass over the same store always yields the same result.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    obstacles: BTreeMap<String, Obstacle>,
    tricks: BTreeMap<String, Trick>,
    consistency: BTreeMap<ConsistencyKey, ConsistencyRecord>,
    /// Insertion order is kept for listing
    challenges: Vec<Challenge>,
    users: BTreeMap<String, UserProgression>,
    attempt_logs: Vec<AttemptLog>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let mut store = Self::new();
        for obstacle in snapshot.obstacles {
            store.add_obstacle(obstacle);
        }
        for trick in snapshot.tricks {
            store.tricks.insert(trick.id.clone(), trick);
        }
        for record in snapshot.consistency {
            store.consistency.insert(key_of(&record), record);
        }
        store.challenges = snapshot.challenges;
        for user in snapshot.users {
            store.add_user(user);
        }
        store.attempt_logs = snapshot.attempt_logs;
        store
    }

    pub fn to_snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            obstacles: self.obstacles.values().cloned().collect(),
            tricks: self.tricks.values().cloned().collect(),
            consistency: self.consistency.values().cloned().collect(),
            challenges: self.challenges.clone(),
            users: self.users.values().cloned().collect(),
            attempt_logs: self.attempt_logs.clone(),
        }
    }

    pub fn add_obstacle(&mut self, obstacle: Obstacle) {
        self.obstacles.insert(obstacle.id.clone(), obstacle);
    }

    pub fn add_user(&mut self, progression: UserProgression) {
        self.users.insert(progression.user_id.clone(), progression);
    }

    pub fn attempt_logs(&self) -> &[AttemptLog] {
        &self.attempt_logs
    }

    fn challenge_index(&self, challenge_id: &str) -> EngineResult<usize> {
        self.challenges
            .iter()
            .position(|c| c.id == challenge_id)
            .ok_or_else(|| EngineError::ChallengeNotFound(challenge_id.to_string()))
    }
}

fn key_of(record: &ConsistencyRecord) -> ConsistencyKey {
    (record.user_id.clone(), record.trick_id.clone(), record.obstacle_id.clone())
}

impl TrickRepository for MemoryStore {
    fn trick(&self, trick_id: &str) -> EngineResult<Trick> {
        self.tricks
            .get(trick_id)
            .cloned()
            .ok_or_else(|| EngineError::TrickNotFound(trick_id.to_string()))
    }

    fn tricks_for_user(&self, user_id: &str) -> EngineResult<Vec<Trick>> {
        Ok(self.tricks.values().filter(|t| t.user_id == user_id).cloned().collect())
    }

    fn insert_trick(&mut self, trick: Trick) -> EngineResult<()> {
        if self.tricks.contains_key(&trick.id) {
            return Err(EngineError::Storage(format!("duplicate trick id {}", trick.id)));
        }
        self.tricks.insert(trick.id.clone(), trick);
        Ok(())
    }

    fn set_trick_tier(&mut self, trick_id: &str, tier: Tier) -> EngineResult<()> {
        let trick = self
            .tricks
            .get_mut(trick_id)
            .ok_or_else(|| EngineError::TrickNotFound(trick_id.to_string()))?;
        trick.tier = tier;
        Ok(())
    }

    fn link_obstacle(&mut self, trick_id: &str, obstacle_id: &str) -> EngineResult<bool> {
        if !self.obstacles.contains_key(obstacle_id) {
            return Err(EngineError::ObstacleNotFound(obstacle_id.to_string()));
        }
        let trick = self
            .tricks
            .get_mut(trick_id)
            .ok_or_else(|| EngineError::TrickNotFound(trick_id.to_string()))?;

        if trick.obstacle_ids.iter().any(|id| id == obstacle_id) {
            return Ok(false);
        }
        trick.obstacle_ids.push(obstacle_id.to_string());
        Ok(true)
    }

    fn obstacle(&self, obstacle_id: &str) -> EngineResult<Obstacle> {
        self.obstacles
            .get(obstacle_id)
            .cloned()
            .ok_or_else(|| EngineError::ObstacleNotFound(obstacle_id.to_string()))
    }

    fn obstacles(&self) -> EngineResult<Vec<Obstacle>> {
        Ok(self.obstacles.values().cloned().collect())
    }
}

impl ConsistencyStore for MemoryStore {
    fn consistency(
        &self,
        user_id: &str,
        trick_id: &str,
        obstacle_id: &str,
    ) -> EngineResult<Option<ConsistencyRecord>> {
        let key = (user_id.to_string(), trick_id.to_string(), obstacle_id.to_string());
        Ok(self.consistency.get(&key).cloned())
    }

    fn records_for_trick(&self, user_id: &str, trick_id: &str) -> EngineResult<Vec<ConsistencyRecord>> {
        Ok(self
            .consistency
            .values()
            .filter(|r| r.user_id == user_id && r.trick_id == trick_id)
            .cloned()
            .collect())
    }

    fn upsert_consistency(&mut self, record: ConsistencyRecord) -> EngineResult<()> {
        self.consistency.insert(key_of(&record), record);
        Ok(())
    }

    fn log_attempt(&mut self, log: AttemptLog) -> EngineResult<()> {
        self.attempt_logs.push(log);
        Ok(())
    }
}

impl ChallengeRepository for MemoryStore {
    fn challenge(&self, challenge_id: &str) -> EngineResult<Challenge> {
        let idx = self.challenge_index(challenge_id)?;
        Ok(self.challenges[idx].clone())
    }

    fn challenges_for_user(&self, user_id: &str) -> EngineResult<Vec<Challenge>> {
        Ok(self.challenges.iter().filter(|c| c.user_id == user_id).cloned().collect())
    }

    fn insert_challenge(&mut self, challenge: Challenge) -> EngineResult<()> {
        if self.challenges.iter().any(|c| c.id == challenge.id) {
            return Err(EngineError::Storage(format!("duplicate challenge id {}", challenge.id)));
        }
        self.challenges.push(challenge);
        Ok(())
    }

    fn mark_completed(
        &mut self,
        challenge_id: &str,
        failed: bool,
        at: DateTime<Utc>,
    ) -> EngineResult<Challenge> {
        let idx = self.challenge_index(challenge_id)?;
        let challenge = &mut self.challenges[idx];
        if !challenge.is_pending() {
            return Err(EngineError::AlreadyCompleted(challenge_id.to_string()));
        }
        challenge.mark_completed(failed, at);
        Ok(challenge.clone())
    }
}

impl UserRepository for MemoryStore {
    fn progression(&self, user_id: &str) -> EngineResult<UserProgression> {
        self.users
            .get(user_id)
            .cloned()
            .ok_or_else(|| EngineError::UserNotFound(user_id.to_string()))
    }

    fn save_progression(&mut self, progression: &UserProgression) -> EngineResult<()> {
        if !self.users.contains_key(&progression.user_id) {
            return Err(EngineError::UserNotFound(progression.user_id.clone()));
        }
        self.users.insert(progression.user_id.clone(), progression.clone());
        Ok(())
    }
}
