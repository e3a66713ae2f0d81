//! Progression service
//!
//! Owns a repository and a config and runs each engine operation end to end:
//! load what it needs, call the pure components, persist the result.

use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::challenge::{
    calculate_xp, select_initial_obstacle, ArchetypeSkip, ChallengeBoard, ChallengeGenerator,
    GenerationInput, SeededSampler,
};
use crate::completion::{AttemptData, CompletionEngine, CompletionResult};
use crate::config::EngineConfig;
use crate::consistency::{record_measurement, record_seed, refresh_trick_tier, AttemptLog, ConsistencyRecord, TierChange};
use crate::error::{EngineError, EngineResult};
use crate::models::{Challenge, Score, Stance, Trick};
use crate::progression::{commit_xp, project_xp, unlock_decision, LedgerUpdate, UnlockDecision, XpProjection};
use crate::repository::{load_snapshots, Repository};

/// Stored challenges from one generation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GenerationReport {
    pub challenges: Vec<Challenge>,
    pub skipped: Vec<ArchetypeSkip>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NewTrick {
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub stance: Stance,
    /// Obstacle types the trick is meant for; picks the assessment obstacle
    #[serde(default)]
    pub obstacle_types: Vec<String>,
    /// Obstacle the trick was already landed on, if any
    #[serde(default)]
    pub landed_obstacle_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrickCreated {
    pub trick: Trick,
    pub assessment: Challenge,
    pub used_wild_slot: bool,
}

/// A manually logged practice session for one trick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SessionLog {
    pub user_id: String,
    pub trick_id: String,
    pub entries: Vec<ObstacleAttempts>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ObstacleAttempts {
    pub obstacle_id: String,
    pub attempts: u32,
    pub landed: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SessionResult {
    pub tier_change: TierChange,
    /// Session-wide landed rate on the 0..=10 scale
    pub consistency: f64,
    pub earned_xp: u32,
    pub ledger: LedgerUpdate,
}

pub struct ProgressionService<R: Repository> {
    repo: R,
    config: EngineConfig,
}

impl<R: Repository> ProgressionService<R> {
    pub fn new(repo: R, config: EngineConfig) -> Self {
        Self { repo, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn repo_mut(&mut self) -> &mut R {
        &mut self.repo
    }

    pub fn into_repo(self) -> R {
        self.repo
    }

    /// Generate, store and return new challenges for `user_id`.
    pub fn generate_for_user(&mut self, user_id: &str, today: NaiveDate, seed: u64) -> EngineResult<GenerationReport> {
        let user = self.repo.progression(user_id)?;
        let existing = self.repo.challenges_for_user(user_id)?;
        let tricks = load_snapshots(&self.repo, user_id)?;
        let obstacles = self.repo.obstacles()?;

        let input = GenerationInput { user: &user, today, existing: &existing, tricks: &tricks, obstacles: &obstacles };
        let outcome = ChallengeGenerator::new(&self.config).generate(&input, &mut SeededSampler::from_seed(seed));

        let mut challenges = Vec::with_capacity(outcome.candidates.len());
        for candidate in outcome.candidates {
            let challenge = candidate.into_challenge_with_new_id();
            self.repo.insert_challenge(challenge.clone())?;
            challenges.push(challenge);
        }

        tracing::info!(user_id, seed, stored = challenges.len(), "challenges generated");
        Ok(GenerationReport { challenges, skipped: outcome.skipped })
    }

    pub fn complete(&mut self, user_id: &str, challenge_id: &str, attempt: AttemptData) -> EngineResult<CompletionResult> {
        CompletionEngine::new(&self.config).complete(&mut self.repo, user_id, challenge_id, attempt)
    }

    /// Create a trick behind the unlock gate and queue its initial assessment.
    pub fn create_trick(&mut self, request: NewTrick, now: DateTime<Utc>) -> EngineResult<TrickCreated> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(EngineError::InvalidTrick("trick name is empty".to_string()));
        }

        let mut user = self.repo.progression(&request.user_id)?;
        let existing = self.repo.tricks_for_user(&request.user_id)?;
        let decision = unlock_decision(&user, &existing, &self.config.unlock);
        if decision == UnlockDecision::Locked {
            return Err(EngineError::TrickCreationLocked { user_id: request.user_id });
        }

        let obstacle = match &request.landed_obstacle_id {
            Some(id) => self.repo.obstacle(id)?,
            None => {
                let obstacles = self.repo.obstacles()?;
                select_initial_obstacle(&obstacles, &request.obstacle_types)
                    .cloned()
                    .ok_or_else(|| EngineError::ObstacleNotFound(request.obstacle_types.join(",")))?
            }
        };

        let used_wild_slot = decision == UnlockDecision::WildSlot;
        if used_wild_slot {
            user.wild_slots -= 1;
            self.repo.save_progression(&user)?;
        }

        let mut trick = Trick::new(Uuid::new_v4().to_string(), &request.user_id, name, request.stance)
            .with_obstacles(&[obstacle.id.as_str()]);
        trick.created_at = now;
        self.repo.insert_trick(trick.clone())?;

        if request.landed_obstacle_id.is_some() {
            let fresh = ConsistencyRecord::new(&request.user_id, &trick.id, &obstacle.id, Score::ZERO, true);
            record_seed(&mut self.repo, ConsistencyRecord { updated_at: now, ..fresh })?;
        }

        let assessment = ChallengeGenerator::new(&self.config)
            .initial_assessment(&user, &trick, &obstacle, now.date_naive())
            .into_challenge_with_new_id();
        self.repo.insert_challenge(assessment.clone())?;

        tracing::info!(
            user_id = %request.user_id,
            trick_id = %trick.id,
            obstacle_id = %obstacle.id,
            used_wild_slot,
            "trick created"
        );
        Ok(TrickCreated { trick, assessment, used_wild_slot })
    }

    /// Record a free practice session and credit XP for it.
    pub fn log_session(&mut self, session: SessionLog, now: DateTime<Utc>) -> EngineResult<SessionResult> {
        let trick = self.repo.trick(&session.trick_id)?;
        if trick.user_id != session.user_id {
            return Err(EngineError::TrickNotFound(session.trick_id));
        }
        if session.entries.is_empty() {
            return Err(EngineError::InvalidAttempt("session has no entries".to_string()));
        }
        for entry in &session.entries {
            if entry.attempts == 0 || entry.landed > entry.attempts {
                return Err(EngineError::InvalidAttempt(format!(
                    "{} landed out of {} attempts on {}",
                    entry.landed, entry.attempts, entry.obstacle_id
                )));
            }
            self.repo.obstacle(&entry.obstacle_id)?;
        }
        self.repo.progression(&session.user_id)?;

        let (mut total_attempts, mut total_landed) = (0u64, 0u64);
        for entry in &session.entries {
            let score = Score::from_rate_rounded(entry.landed, entry.attempts);
            let fresh =
                ConsistencyRecord::new(&session.user_id, &trick.id, &entry.obstacle_id, score, entry.landed > 0);
            let record = record_measurement(&mut self.repo, ConsistencyRecord { updated_at: now, ..fresh })?;
            self.repo.log_attempt(AttemptLog::new(&record, entry.attempts, entry.landed))?;
            self.repo.link_obstacle(&trick.id, &entry.obstacle_id)?;

            total_attempts += u64::from(entry.attempts);
            total_landed += u64::from(entry.landed);
        }

        let tier_change = refresh_trick_tier(&mut self.repo, &session.user_id, &trick.id)?;
        let consistency = total_landed as f64 * 10.0 / total_attempts as f64;
        let earned_xp = calculate_xp(self.config.rewards.fallback_base_xp, tier_change.current, consistency);
        let ledger = commit_xp(&mut self.repo, &session.user_id, earned_xp, &self.config.xp_curve)?;

        tracing::info!(
            user_id = %session.user_id,
            trick_id = %trick.id,
            entries = session.entries.len(),
            earned_xp,
            "session logged"
        );
        Ok(SessionResult { tier_change, consistency, earned_xp, ledger })
    }

    pub fn grant_xp(&mut self, user_id: &str, earned: u32) -> EngineResult<LedgerUpdate> {
        commit_xp(&mut self.repo, user_id, earned, &self.config.xp_curve)
    }

    pub fn project_xp(&self, user_id: &str, earned: u32) -> EngineResult<XpProjection> {
        let user = self.repo.progression(user_id)?;
        Ok(project_xp(&user, earned, &self.config.xp_curve))
    }

    pub fn board(&self, user_id: &str) -> EngineResult<ChallengeBoard> {
        let challenges = self.repo.challenges_for_user(user_id)?;
        Ok(ChallengeBoard::summarize(&self.config, &challenges))
    }
}
