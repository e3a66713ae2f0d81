//! Completion Engine
//!
//! `Pending → Completed { failed }`, exactly once. Everything that can be
//! rejected is validated first; the repository's compare-and-set then claims
//! the challenge before any consistency, tier or XP side effect runs.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::attempt::{score_attempt, AttemptData, AttemptScore, NewComboTrick};
use crate::challenge::{over_target_bonus, ChallengeGenerator, RewardCalculator};
use crate::config::EngineConfig;
use crate::consistency::{record_measurement, record_seed, refresh_trick_tier, AttemptLog, ConsistencyRecord, TierChange};
use crate::error::{EngineError, EngineResult};
use crate::models::{Challenge, ChallengeType, Obstacle, Score, Trick, UserProgression};
use crate::progression::commit_xp;
use crate::repository::Repository;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CompletionResult {
    pub challenge_id: String,
    pub challenge_type: ChallengeType,
    /// Total XP credited, bonus included
    pub earned_xp: u32,
    pub bonus_xp: u32,
    pub failed: bool,
    /// Measured consistency, for lands-scored challenges
    pub score: Option<Score>,
    pub new_level: u32,
    pub new_xp_in_level: u32,
    pub levels_gained: u32,
    pub wild_slot_awarded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier_change: Option<TierChange>,
    /// Composite trick created by a combo completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_trick: Option<Trick>,
    pub spawned_challenges: Vec<Challenge>,
}

/// Validated plan for one completion. Built before the state transition.
enum Plan {
    Attempt { trick: Trick, obstacle: Obstacle, scored: AttemptScore },
    Boss { trick: Trick, obstacle: Obstacle },
    Combo { combo: NewComboTrick, components: Vec<Trick>, target: Option<Obstacle> },
    Line,
}

impl Plan {
    fn failed(&self) -> bool {
        matches!(self, Plan::Attempt { scored, .. } if scored.failed)
    }
}

/// Side effects of an applied plan, before XP
#[derive(Default)]
struct Applied {
    score: Option<Score>,
    tier_change: Option<TierChange>,
    created_trick: Option<Trick>,
    spawned: Vec<Challenge>,
}

pub struct CompletionEngine<'c> {
    config: &'c EngineConfig,
}

impl<'c> CompletionEngine<'c> {
    pub fn new(config: &'c EngineConfig) -> Self {
        Self { config }
    }

    pub fn complete<R: Repository + ?Sized>(
        &self,
        repo: &mut R,
        user_id: &str,
        challenge_id: &str,
        attempt: AttemptData,
    ) -> EngineResult<CompletionResult> {
        self.complete_at(repo, user_id, challenge_id, attempt, Utc::now())
    }

    /// `complete` with an explicit clock.
    pub fn complete_at<R: Repository + ?Sized>(
        &self,
        repo: &mut R,
        user_id: &str,
        challenge_id: &str,
        attempt: AttemptData,
        now: DateTime<Utc>,
    ) -> EngineResult<CompletionResult> {
        let challenge = repo.challenge(challenge_id)?;
        if challenge.user_id != user_id {
            return Err(EngineError::ChallengeNotFound(challenge_id.to_string()));
        }
        if !challenge.is_pending() {
            return Err(EngineError::AlreadyCompleted(challenge_id.to_string()));
        }
        let user = repo.progression(user_id)?;

        let plan = self.plan(repo, &challenge, attempt)?;
        let failed = plan.failed();

        // Claim the challenge. A concurrent completion loses here with no side effects.
        repo.mark_completed(challenge_id, failed, now)?;

        let rewards = RewardCalculator::new(&self.config.rewards, &self.config.xp_curve, user.level);
        let (base_xp, bonus_xp) = match &plan {
            Plan::Attempt { scored, .. } if scored.failed => (0, 0),
            Plan::Attempt { scored, .. } => {
                let reward = stored_or_fallback(&challenge, &rewards);
                let bonus = if scored.exceeded_target() {
                    over_target_bonus(
                        scored.lands,
                        scored.target,
                        scored.attempts,
                        reward,
                        self.config.rewards.bonus_percent,
                    )
                } else {
                    0
                };
                (reward, bonus)
            }
            Plan::Line => (challenge.xp_reward, 0),
            Plan::Boss { obstacle, .. } if challenge.xp_reward == 0 => {
                (rewards.boss(challenge.tier, obstacle.difficulty), 0)
            }
            Plan::Boss { .. } | Plan::Combo { .. } => (stored_or_fallback(&challenge, &rewards), 0),
        };

        let applied = self.apply(repo, &challenge, &user, plan, now)?;
        let earned_xp = base_xp.saturating_add(bonus_xp);
        let ledger = commit_xp(repo, user_id, earned_xp, &self.config.xp_curve)?;

        tracing::info!(
            user_id,
            challenge_id,
            challenge_type = %challenge.challenge_type,
            failed,
            earned_xp,
            bonus_xp,
            "challenge completed"
        );

        Ok(CompletionResult {
            challenge_id: challenge_id.to_string(),
            challenge_type: challenge.challenge_type,
            earned_xp,
            bonus_xp,
            failed,
            score: applied.score,
            new_level: ledger.progression.level,
            new_xp_in_level: ledger.progression.xp_current,
            levels_gained: ledger.levels_gained,
            wild_slot_awarded: ledger.wild_slot_awarded,
            tier_change: applied.tier_change,
            created_trick: applied.created_trick,
            spawned_challenges: applied.spawned,
        })
    }

    fn plan<R: Repository + ?Sized>(
        &self,
        repo: &R,
        challenge: &Challenge,
        attempt: AttemptData,
    ) -> EngineResult<Plan> {
        match challenge.challenge_type {
            ChallengeType::Daily | ChallengeType::Initial => {
                let AttemptData::Lands { lands_completed, attempts } = attempt else {
                    return Err(missing_attempt_data(challenge));
                };
                let target = challenge.unlock_condition.target_lands(self.config.default_target);
                let scored =
                    score_attempt(lands_completed, attempts, target, challenge.challenge_type.can_fail())?;
                let (trick, obstacle) = resolve_pair(repo, challenge)?;
                Ok(Plan::Attempt { trick, obstacle, scored })
            }
            ChallengeType::Boss => {
                let (trick, obstacle) = resolve_pair(repo, challenge)?;
                Ok(Plan::Boss { trick, obstacle })
            }
            ChallengeType::Combo => {
                let AttemptData::ComboTrick(combo) = attempt else {
                    return Err(missing_attempt_data(challenge));
                };
                let components = combo_components(repo, &challenge.user_id, &combo)?;
                let target = match &challenge.obstacle_id {
                    Some(id) => Some(repo.obstacle(id)?),
                    None => None,
                };
                Ok(Plan::Combo { combo, components, target })
            }
            ChallengeType::Line => Ok(Plan::Line),
        }
    }

    fn apply<R: Repository + ?Sized>(
        &self,
        repo: &mut R,
        challenge: &Challenge,
        user: &UserProgression,
        plan: Plan,
        now: DateTime<Utc>,
    ) -> EngineResult<Applied> {
        let user_id = user.user_id.as_str();
        let mut applied = Applied::default();

        match plan {
            Plan::Attempt { trick, obstacle, scored } => {
                let fresh = ConsistencyRecord::new(user_id, &trick.id, &obstacle.id, scored.score, scored.lands > 0);
                let record = record_measurement(repo, ConsistencyRecord { updated_at: now, ..fresh })?;
                repo.log_attempt(AttemptLog::new(&record, scored.attempts, scored.lands))?;
                repo.link_obstacle(&trick.id, &obstacle.id)?;

                applied.score = Some(scored.score);
                applied.tier_change = Some(refresh_trick_tier(repo, user_id, &trick.id)?);
            }

            Plan::Boss { trick, obstacle } => {
                let existing = repo.consistency(user_id, &trick.id, &obstacle.id)?;
                let seed_score = existing.map_or(Score::saturating(1), |r| r.score);
                let fresh = ConsistencyRecord::new(user_id, &trick.id, &obstacle.id, seed_score, true);
                record_seed(repo, ConsistencyRecord { updated_at: now, ..fresh })?;
                repo.link_obstacle(&trick.id, &obstacle.id)?;
                applied.tier_change = Some(refresh_trick_tier(repo, user_id, &trick.id)?);

                applied.spawned.push(self.spawn_assessment(repo, user, &trick, &obstacle, now)?);
            }

            Plan::Combo { combo, components, target } => {
                let mut trick = Trick::new(Uuid::new_v4().to_string(), user_id, combo.name.trim(), combo.stance);
                trick.component_trick_ids = components.iter().map(|t| t.id.clone()).collect();
                trick.created_at = now;
                if let Some(obstacle) = &target {
                    trick.obstacle_ids.push(obstacle.id.clone());
                }
                repo.insert_trick(trick.clone())?;

                if let Some(obstacle) = &target {
                    let own = ConsistencyRecord::new(user_id, &trick.id, &obstacle.id, Score::ZERO, true);
                    record_seed(repo, ConsistencyRecord { updated_at: now, ..own })?;

                    let seed_score = Score::saturating(u32::from(self.config.combo_seed_score));
                    for component in &components {
                        let fresh = ConsistencyRecord::new(user_id, &component.id, &obstacle.id, seed_score, true);
                        let record = record_seed(repo, ConsistencyRecord { updated_at: now, ..fresh })?;
                        repo.log_attempt(AttemptLog::new(&record, 1, 1))?;
                        repo.link_obstacle(&component.id, &obstacle.id)?;
                        refresh_trick_tier(repo, user_id, &component.id)?;
                    }

                    applied.spawned.push(self.spawn_assessment(repo, user, &trick, obstacle, now)?);
                }

                tracing::debug!(
                    user_id,
                    challenge_id = %challenge.id,
                    trick_id = %trick.id,
                    components = trick.component_trick_ids.len(),
                    "combo trick created"
                );
                applied.created_trick = Some(trick);
            }

            Plan::Line => {}
        }

        Ok(applied)
    }

    fn spawn_assessment<R: Repository + ?Sized>(
        &self,
        repo: &mut R,
        user: &UserProgression,
        trick: &Trick,
        obstacle: &Obstacle,
        now: DateTime<Utc>,
    ) -> EngineResult<Challenge> {
        let candidate =
            ChallengeGenerator::new(self.config).initial_assessment(user, trick, obstacle, now.date_naive());
        let challenge = candidate.into_challenge_with_new_id();
        repo.insert_challenge(challenge.clone())?;
        tracing::debug!(
            user_id = %user.user_id,
            trick_id = %trick.id,
            obstacle_id = %obstacle.id,
            "initial assessment spawned"
        );
        Ok(challenge)
    }
}

fn stored_or_fallback(challenge: &Challenge, rewards: &RewardCalculator<'_>) -> u32 {
    if challenge.xp_reward > 0 {
        challenge.xp_reward
    } else {
        rewards.fallback(challenge.tier)
    }
}

fn missing_attempt_data(challenge: &Challenge) -> EngineError {
    EngineError::MissingAttemptData {
        challenge_id: challenge.id.clone(),
        challenge_type: challenge.challenge_type,
    }
}

/// The challenge's trick and obstacle, both existing, the trick owned by the challenge's user.
fn resolve_pair<R: Repository + ?Sized>(repo: &R, challenge: &Challenge) -> EngineResult<(Trick, Obstacle)> {
    let (Some(trick_id), Some(obstacle_id)) = (&challenge.trick_id, &challenge.obstacle_id) else {
        return Err(EngineError::IncompleteChallenge {
            challenge_id: challenge.id.clone(),
            challenge_type: challenge.challenge_type,
        });
    };
    let trick = repo.trick(trick_id)?;
    if trick.user_id != challenge.user_id {
        return Err(EngineError::TrickNotFound(trick_id.clone()));
    }
    Ok((trick, repo.obstacle(obstacle_id)?))
}

/// Components must be at least two distinct existing tricks of the same user.
fn combo_components<R: Repository + ?Sized>(
    repo: &R,
    user_id: &str,
    combo: &NewComboTrick,
) -> EngineResult<Vec<Trick>> {
    if combo.name.trim().is_empty() {
        return Err(EngineError::InvalidComboTrick("combo trick needs a name".to_string()));
    }

    let mut components: Vec<Trick> = Vec::new();
    for id in &combo.component_trick_ids {
        if components.iter().any(|t| &t.id == id) {
            continue;
        }
        let trick = match repo.trick(id) {
            Ok(trick) if trick.user_id == user_id => trick,
            Ok(_) | Err(EngineError::TrickNotFound(_)) => {
                return Err(EngineError::InvalidComboTrick(format!("unknown component trick {}", id)));
            }
            Err(other) => return Err(other),
        };
        components.push(trick);
    }

    if components.len() < 2 {
        return Err(EngineError::InvalidComboTrick(format!(
            "a combo needs at least 2 component tricks, got {}",
            components.len()
        )));
    }
    Ok(components)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::{ChallengeCandidate, GroupKey, Stance, Tier, UnlockCondition};
    use crate::repository::{ChallengeRepository, ConsistencyStore, MemoryStore, TrickRepository, UserRepository};
    use chrono::NaiveDate;

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.add_obstacle(Obstacle::new("flat", "Flatground", "flat", 1));
        store.add_obstacle(Obstacle::new("rail1", "Low Rail", "rail", 2));
        store.add_obstacle(Obstacle::new("rail2", "Handrail", "rail", 4));
        store.add_user(UserProgression::new("u1"));
        store
            .insert_trick(Trick::new("t1", "u1", "Kickflip", Stance::Regular).with_obstacles(&["rail1"]))
            .unwrap();
        store
            .insert_trick(Trick::new("t2", "u1", "Boardslide", Stance::Regular).with_obstacles(&["rail1"]))
            .unwrap();
        store
    }

    fn candidate(challenge_type: ChallengeType, xp_reward: u32, unlock_condition: UnlockCondition) -> ChallengeCandidate {
        ChallengeCandidate {
            user_id: "u1".into(),
            challenge_type,
            name: "test".into(),
            description: String::new(),
            trick_id: Some("t1".into()),
            obstacle_id: Some("rail1".into()),
            tier: Tier::Beginner,
            difficulty: 2,
            xp_reward,
            unlock_condition,
            assigned_on: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        }
    }

    fn insert(store: &mut MemoryStore, id: &str, candidate: ChallengeCandidate) {
        store.insert_challenge(candidate.into_challenge(id)).unwrap();
    }

    fn lands(lands_completed: u32, attempts: u32) -> AttemptData {
        AttemptData::Lands { lands_completed, attempts }
    }

    #[test]
    fn test_daily_success_with_bonus() {
        let config = EngineConfig::default();
        let mut store = store();
        insert(&mut store, "c1", candidate(ChallengeType::Daily, 70, UnlockCondition::Consistency { target: 5 }));

        let result = CompletionEngine::new(&config).complete(&mut store, "u1", "c1", lands(7, 10)).unwrap();

        assert!(!result.failed);
        assert_eq!(result.score.map(Score::value), Some(7));
        // floor(2/10 * 70 * 0.2) = floor(2.8)
        assert_eq!(result.bonus_xp, 2);
        assert_eq!(result.earned_xp, 72);
        assert_eq!(store.progression("u1").unwrap().xp_current, 72);

        let record = store.consistency("u1", "t1", "rail1").unwrap().unwrap();
        assert_eq!(record.score.value(), 7);
        assert!(record.landed);
        assert_eq!(store.attempt_logs().len(), 1);
        assert_eq!(store.trick("t1").unwrap().tier, Tier::Mastered);
        assert_eq!(result.tier_change.map(|c| c.current), Some(Tier::Mastered));
    }

    #[test]
    fn test_daily_failure_earns_nothing_but_records_score() {
        let config = EngineConfig::default();
        let mut store = store();
        insert(&mut store, "c1", candidate(ChallengeType::Daily, 70, UnlockCondition::Consistency { target: 5 }));

        let result = CompletionEngine::new(&config).complete(&mut store, "u1", "c1", lands(2, 10)).unwrap();

        assert!(result.failed);
        assert_eq!(result.earned_xp, 0);
        assert_eq!(store.progression("u1").unwrap().xp_total, 0);

        let stored = store.challenge("c1").unwrap();
        assert!(!stored.is_pending());
        assert!(stored.failed);
        assert_eq!(store.consistency("u1", "t1", "rail1").unwrap().unwrap().score.value(), 2);
    }

    #[test]
    fn test_second_completion_is_rejected_without_double_xp() {
        let config = EngineConfig::default();
        let mut store = store();
        insert(&mut store, "c1", candidate(ChallengeType::Daily, 70, UnlockCondition::Consistency { target: 5 }));
        let engine = CompletionEngine::new(&config);

        let first = engine.complete(&mut store, "u1", "c1", lands(5, 10)).unwrap();
        let err = engine.complete(&mut store, "u1", "c1", lands(10, 10)).unwrap_err();

        assert_eq!(err, EngineError::AlreadyCompleted("c1".into()));
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(store.progression("u1").unwrap().xp_total, u64::from(first.earned_xp));
        assert_eq!(store.attempt_logs().len(), 1);
    }

    #[test]
    fn test_invalid_attempt_leaves_challenge_pending() {
        let config = EngineConfig::default();
        let mut store = store();
        insert(&mut store, "c1", candidate(ChallengeType::Daily, 70, UnlockCondition::Consistency { target: 5 }));
        let engine = CompletionEngine::new(&config);

        let err = engine.complete(&mut store, "u1", "c1", lands(3, 0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        let err = engine.complete(&mut store, "u1", "c1", lands(12, 10)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        let err = engine.complete(&mut store, "u1", "c1", AttemptData::None).unwrap_err();
        assert!(matches!(err, EngineError::MissingAttemptData { .. }));

        assert!(store.challenge("c1").unwrap().is_pending());
        assert!(engine.complete(&mut store, "u1", "c1", lands(5, 10)).is_ok());
    }

    #[test]
    fn test_unknown_or_foreign_challenge() {
        let config = EngineConfig::default();
        let mut store = store();
        store.add_user(UserProgression::new("u2"));
        insert(&mut store, "c1", candidate(ChallengeType::Line, 120, UnlockCondition::Consistency { target: 5 }));
        let engine = CompletionEngine::new(&config);

        let err = engine.complete(&mut store, "u1", "nope", AttemptData::None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = engine.complete(&mut store, "u2", "c1", AttemptData::None).unwrap_err();
        assert_eq!(err, EngineError::ChallengeNotFound("c1".into()));
    }

    fn assert_rejected_untouched(store: &mut MemoryStore, challenge_id: &str, attempt: AttemptData) -> EngineError {
        let config = EngineConfig::default();
        let before = store.to_snapshot();
        let err = CompletionEngine::new(&config).complete(store, "u1", challenge_id, attempt).unwrap_err();
        assert_eq!(store.to_snapshot(), before);
        assert!(store.challenge(challenge_id).unwrap().is_pending());
        err
    }

    #[test]
    fn test_daily_with_missing_trick_or_obstacle_is_rejected_before_claim() {
        let mut store = store();
        let mut ghost = candidate(ChallengeType::Daily, 70, UnlockCondition::Consistency { target: 5 });
        ghost.trick_id = Some("ghost".into());
        insert(&mut store, "c1", ghost);
        let mut nowhere = candidate(ChallengeType::Daily, 70, UnlockCondition::Consistency { target: 5 });
        nowhere.obstacle_id = Some("nowhere".into());
        insert(&mut store, "c2", nowhere);

        let err = assert_rejected_untouched(&mut store, "c1", lands(7, 10));
        assert_eq!(err, EngineError::TrickNotFound("ghost".into()));
        let err = assert_rejected_untouched(&mut store, "c2", lands(7, 10));
        assert_eq!(err, EngineError::ObstacleNotFound("nowhere".into()));

        assert!(store.consistency("u1", "ghost", "rail1").unwrap().is_none());
        assert!(store.attempt_logs().is_empty());
        assert_eq!(store.progression("u1").unwrap().xp_total, 0);
    }

    #[test]
    fn test_challenge_on_another_users_trick_is_rejected() {
        let mut store = store();
        store.add_user(UserProgression::new("u2"));
        store
            .insert_trick(Trick::new("t9", "u2", "Heelflip", Stance::Regular).with_obstacles(&["rail1"]))
            .unwrap();

        let mut daily = candidate(ChallengeType::Daily, 70, UnlockCondition::Consistency { target: 5 });
        daily.trick_id = Some("t9".into());
        insert(&mut store, "c1", daily);
        let mut boss = candidate(
            ChallengeType::Boss,
            108,
            UnlockCondition::Boss { trick_id: "t9".into(), obstacle_id: "rail2".into() },
        );
        boss.trick_id = Some("t9".into());
        boss.obstacle_id = Some("rail2".into());
        insert(&mut store, "b1", boss);

        let err = assert_rejected_untouched(&mut store, "c1", lands(7, 10));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = assert_rejected_untouched(&mut store, "b1", AttemptData::None);
        assert_eq!(err, EngineError::TrickNotFound("t9".into()));
        assert!(store.consistency("u1", "t9", "rail2").unwrap().is_none());
    }

    #[test]
    fn test_challenge_without_pair_is_a_validation_error() {
        let mut store = store();
        let mut daily = candidate(ChallengeType::Daily, 70, UnlockCondition::Consistency { target: 5 });
        daily.trick_id = None;
        insert(&mut store, "c1", daily);

        let err = assert_rejected_untouched(&mut store, "c1", lands(7, 10));
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(matches!(err, EngineError::IncompleteChallenge { challenge_type: ChallengeType::Daily, .. }));
    }

    #[test]
    fn test_already_completed_leaves_store_untouched() {
        let config = EngineConfig::default();
        let mut store = store();
        insert(&mut store, "c1", candidate(ChallengeType::Daily, 70, UnlockCondition::Consistency { target: 5 }));
        CompletionEngine::new(&config).complete(&mut store, "u1", "c1", lands(6, 10)).unwrap();

        let before = store.to_snapshot();
        let err = CompletionEngine::new(&config).complete(&mut store, "u1", "c1", lands(9, 10)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(store.to_snapshot(), before);

        let err = CompletionEngine::new(&config).complete(&mut store, "u1", "missing", lands(9, 10)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(store.to_snapshot(), before);
    }

    #[test]
    fn test_initial_assessment_never_fails() {
        let config = EngineConfig::default();
        let mut store = store();
        insert(
            &mut store,
            "c1",
            candidate(ChallengeType::Initial, 50, UnlockCondition::Attempts { attempts: 10, lands: None }),
        );

        let result = CompletionEngine::new(&config).complete(&mut store, "u1", "c1", lands(0, 10)).unwrap();
        assert!(!result.failed);
        assert_eq!(result.earned_xp, 50);
        let record = store.consistency("u1", "t1", "rail1").unwrap().unwrap();
        assert_eq!(record.score, Score::ZERO);
        assert!(!record.landed);
    }

    #[test]
    fn test_baseline_uses_lands_as_target() {
        let config = EngineConfig::default();
        let mut store = store();
        insert(
            &mut store,
            "c1",
            candidate(ChallengeType::Daily, 50, UnlockCondition::Attempts { attempts: 10, lands: Some(3) }),
        );
        let result = CompletionEngine::new(&config).complete(&mut store, "u1", "c1", lands(3, 10)).unwrap();
        assert!(!result.failed);
        assert_eq!(result.bonus_xp, 0);
        assert_eq!(result.earned_xp, 50);
    }

    #[test]
    fn test_boss_seeds_record_and_spawns_assessment() {
        let config = EngineConfig::default();
        let mut store = store();
        let mut boss = candidate(
            ChallengeType::Boss,
            108,
            UnlockCondition::Boss { trick_id: "t1".into(), obstacle_id: "rail2".into() },
        );
        boss.obstacle_id = Some("rail2".into());
        insert(&mut store, "b1", boss);

        let result = CompletionEngine::new(&config).complete(&mut store, "u1", "b1", AttemptData::None).unwrap();

        assert!(!result.failed);
        assert_eq!(result.earned_xp, 108);
        assert_eq!(result.new_level, 2);
        assert_eq!(result.new_xp_in_level, 8);

        let record = store.consistency("u1", "t1", "rail2").unwrap().unwrap();
        assert_eq!(record.score.value(), 1);
        assert!(record.landed);
        assert!(store.trick("t1").unwrap().obstacle_ids.contains(&"rail2".to_string()));

        assert_eq!(result.spawned_challenges.len(), 1);
        let spawned = &result.spawned_challenges[0];
        assert_eq!(spawned.challenge_type, ChallengeType::Initial);
        assert_eq!(spawned.obstacle_id.as_deref(), Some("rail2"));
        assert_eq!(spawned.unlock_condition, UnlockCondition::Attempts { attempts: 10, lands: None });
        assert!(store.challenge(&spawned.id).unwrap().is_pending());
    }

    #[test]
    fn test_boss_without_reward_uses_fallback() {
        let config = EngineConfig::default();
        let mut store = store();
        let mut boss = candidate(
            ChallengeType::Boss,
            0,
            UnlockCondition::Boss { trick_id: "t1".into(), obstacle_id: "rail2".into() },
        );
        boss.obstacle_id = Some("rail2".into());
        boss.tier = Tier::Moderate;
        insert(&mut store, "b1", boss);

        let result = CompletionEngine::new(&config).complete(&mut store, "u1", "b1", AttemptData::None).unwrap();
        // 100 + tier 2 * difficulty 4 of the harder obstacle
        assert_eq!(result.earned_xp, 108);
    }

    #[test]
    fn test_combo_creates_trick_and_seeds_components() {
        let config = EngineConfig::default();
        let mut store = store();
        store
            .upsert_consistency(ConsistencyRecord::new("u1", "t2", "rail1", Score::new(8).unwrap(), true))
            .unwrap();
        let mut combo = candidate(
            ChallengeType::Combo,
            140,
            UnlockCondition::Combo {
                combo_key: GroupKey::from_ids(["t1", "t2"]),
                trick_ids: vec!["t1".into(), "t2".into()],
            },
        );
        combo.trick_id = None;
        insert(&mut store, "k1", combo);

        let attempt = AttemptData::ComboTrick(NewComboTrick {
            name: "Kickflip Boardslide".into(),
            stance: Stance::Regular,
            component_trick_ids: vec!["t1".into(), "t2".into()],
        });
        let result = CompletionEngine::new(&config).complete(&mut store, "u1", "k1", attempt).unwrap();

        assert_eq!(result.earned_xp, 140);
        let created = result.created_trick.clone().unwrap();
        assert_eq!(created.component_trick_ids, vec!["t1".to_string(), "t2".to_string()]);
        assert_eq!(created.obstacle_ids, vec!["rail1".to_string()]);
        let own = store.consistency("u1", &created.id, "rail1").unwrap().unwrap();
        assert!(own.landed);
        assert_eq!(own.score, Score::ZERO);

        // seeded at 5, existing 8 is never lowered
        assert_eq!(store.consistency("u1", "t1", "rail1").unwrap().unwrap().score.value(), 5);
        assert_eq!(store.consistency("u1", "t2", "rail1").unwrap().unwrap().score.value(), 8);
        assert_eq!(store.attempt_logs().len(), 2);

        assert_eq!(result.spawned_challenges.len(), 1);
        assert_eq!(result.spawned_challenges[0].trick_id.as_deref(), Some(created.id.as_str()));
    }

    #[test]
    fn test_combo_requires_two_known_components() {
        let config = EngineConfig::default();
        let mut store = store();
        insert(&mut store, "k1", candidate(ChallengeType::Combo, 140, UnlockCondition::Consistency { target: 5 }));
        let engine = CompletionEngine::new(&config);

        let one = AttemptData::ComboTrick(NewComboTrick {
            name: "Solo".into(),
            stance: Stance::Regular,
            component_trick_ids: vec!["t1".into(), "t1".into()],
        });
        let err = engine.complete(&mut store, "u1", "k1", one).unwrap_err();
        assert!(matches!(err, EngineError::InvalidComboTrick(_)));

        let unknown = AttemptData::ComboTrick(NewComboTrick {
            name: "Ghost".into(),
            stance: Stance::Regular,
            component_trick_ids: vec!["t1".into(), "missing".into()],
        });
        let err = engine.complete(&mut store, "u1", "k1", unknown).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = engine.complete(&mut store, "u1", "k1", lands(1, 1)).unwrap_err();
        assert!(matches!(err, EngineError::MissingAttemptData { challenge_type: ChallengeType::Combo, .. }));
        assert!(store.challenge("k1").unwrap().is_pending());
    }

    #[test]
    fn test_line_awards_stored_reward_only() {
        let config = EngineConfig::default();
        let mut store = store();
        let mut line = candidate(
            ChallengeType::Line,
            120,
            UnlockCondition::Line {
                line_key: GroupKey::from_ids(["t1", "t2"]),
                trick_ids: vec!["t1".into(), "t2".into()],
            },
        );
        line.trick_id = None;
        line.obstacle_id = None;
        insert(&mut store, "l1", line);

        let result = CompletionEngine::new(&config).complete(&mut store, "u1", "l1", AttemptData::None).unwrap();
        assert_eq!(result.earned_xp, 120);
        assert_eq!(result.new_level, 2);
        assert!(result.spawned_challenges.is_empty());
        assert!(store.consistency("u1", "t1", "rail1").unwrap().is_none());
    }

    #[test]
    fn test_reaching_level_ten_awards_wild_slot() {
        let config = EngineConfig::default();
        let mut store = store();
        store.add_user(UserProgression::new("u1").at_level(9, 450));
        insert(&mut store, "l1", candidate(ChallengeType::Line, 120, UnlockCondition::Consistency { target: 5 }));

        let result = CompletionEngine::new(&config).complete(&mut store, "u1", "l1", AttemptData::None).unwrap();
        assert_eq!(result.new_level, 10);
        assert!(result.wild_slot_awarded);
        assert_eq!(store.progression("u1").unwrap().wild_slots, 1);
    }
}
