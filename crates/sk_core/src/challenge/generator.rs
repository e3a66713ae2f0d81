//! Challenge Generator
//!
//! Produces new challenge candidates for one user across four archetypes:
//! - Daily: one (trick, obstacle) pair per trick, slots weighted by consistency band
//! - Boss: a mastered obstacle unlocks the next harder obstacle of the same type
//! - Combo: two tier <= 2 tricks chained, deduplicated by `GroupKey`
//! - Line: up to three consistent tricks in one run, deduplicated by `GroupKey`
//!
//! Capacity per archetype is its quota minus the user's pending challenges of
//! that archetype. Each archetype is independent: one yielding nothing never
//! aborts the others.

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::rewards::RewardCalculator;
use super::sampler::Sampler;
use crate::config::EngineConfig;
use crate::models::{
    Challenge, ChallengeCandidate, ChallengeType, GroupKey, Obstacle, ObstacleScore, Score, Tier,
    Trick, TrickSnapshot, UnlockCondition, UserProgression,
};

/// Guards against a tiny float error turning `5 * 0.2` into 2 slots
const SHARE_EPSILON: f64 = 1e-9;

/// Draws per requested line before giving up on finding an unused grouping
const LINE_DRAWS_PER_SLOT: u32 = 4;

/// Everything a generation pass reads. Nothing is fetched from ambient state.
#[derive(Debug, Clone, Copy)]
pub struct GenerationInput<'a> {
    pub user: &'a UserProgression,
    pub today: NaiveDate,
    /// The user's existing challenges; only pending ones count against quotas
    pub existing: &'a [Challenge],
    pub tricks: &'a [TrickSnapshot],
    /// Full obstacle catalog, used to find harder boss obstacles
    pub obstacles: &'a [Obstacle],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Pending challenges already fill the quota
    AtCapacity,
    /// The probability roll for this pass missed
    ChanceMissed,
    NoEligibleCandidates,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ArchetypeSkip {
    pub challenge_type: ChallengeType,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GenerationOutcome {
    pub candidates: Vec<ChallengeCandidate>,
    pub skipped: Vec<ArchetypeSkip>,
}

impl GenerationOutcome {
    pub fn count_of(&self, challenge_type: ChallengeType) -> usize {
        self.candidates.iter().filter(|c| c.challenge_type == challenge_type).count()
    }

    pub fn skip_reason(&self, challenge_type: ChallengeType) -> Option<SkipReason> {
        self.skipped.iter().find(|s| s.challenge_type == challenge_type).map(|s| s.reason)
    }
}

pub struct ChallengeGenerator<'c> {
    config: &'c EngineConfig,
}

impl<'c> ChallengeGenerator<'c> {
    pub fn new(config: &'c EngineConfig) -> Self {
        Self { config }
    }

    /// Quota left for an archetype after subtracting pending challenges.
    pub fn capacity(&self, challenge_type: ChallengeType, existing: &[Challenge]) -> usize {
        let Some(cap) = self.config.quotas.cap(challenge_type) else {
            return usize::MAX;
        };
        let pending = existing.iter().filter(|c| c.is_pending_of(challenge_type)).count();
        (cap as usize).saturating_sub(pending)
    }

    pub fn generate<S: Sampler>(&self, input: &GenerationInput<'_>, sampler: &mut S) -> GenerationOutcome {
        let mut outcome = GenerationOutcome::default();
        let rewards = RewardCalculator::new(&self.config.rewards, &self.config.xp_curve, input.user.level);

        for challenge_type in ChallengeType::GENERATED {
            let capacity = self.capacity(challenge_type, input.existing);
            if capacity == 0 {
                outcome.skipped.push(ArchetypeSkip { challenge_type, reason: SkipReason::AtCapacity });
                continue;
            }

            if challenge_type != ChallengeType::Daily
                && !sampler.roll(self.config.chances.for_type(challenge_type))
            {
                outcome.skipped.push(ArchetypeSkip { challenge_type, reason: SkipReason::ChanceMissed });
                continue;
            }

            let produced = match challenge_type {
                ChallengeType::Daily => self.daily(input, &rewards, capacity, sampler),
                ChallengeType::Boss => self.boss(input, &rewards, capacity, sampler),
                ChallengeType::Combo => self.combo(input, &rewards, capacity, sampler),
                ChallengeType::Line => self.line(input, &rewards, capacity, sampler),
                ChallengeType::Initial => Vec::new(),
            };

            if produced.is_empty() {
                outcome
                    .skipped
                    .push(ArchetypeSkip { challenge_type, reason: SkipReason::NoEligibleCandidates });
            }
            outcome.candidates.extend(produced);
        }

        tracing::debug!(
            user_id = %input.user.user_id,
            generated = outcome.candidates.len(),
            skipped = outcome.skipped.len(),
            "challenge generation pass"
        );
        outcome
    }

    // ========== Daily ==========

    fn daily<S: Sampler>(
        &self,
        input: &GenerationInput<'_>,
        rewards: &RewardCalculator<'_>,
        capacity: usize,
        sampler: &mut S,
    ) -> Vec<ChallengeCandidate> {
        let busy: HashSet<&str> = input
            .existing
            .iter()
            .filter(|c| c.is_pending_of(ChallengeType::Daily))
            .filter_map(|c| c.trick_id.as_deref())
            .collect();

        // Dedup by trick: one open pair each
        let mut picks: Vec<(&TrickSnapshot, &ObstacleScore)> = Vec::new();
        for snap in input.tricks {
            if busy.contains(snap.id()) || snap.is_fully_mastered() {
                continue;
            }
            let open: Vec<&ObstacleScore> =
                snap.obstacles.iter().filter(|o| !o.score.map_or(false, Score::is_max)).collect();
            if open.is_empty() {
                continue;
            }
            let pair = open[sampler.pick_index(open.len())];
            picks.push((snap, pair));
        }

        let bands = &self.config.daily_bands;
        let (mut high, mut mid, mut low) = (Vec::new(), Vec::new(), Vec::new());
        for pick in picks {
            match pick.1.score_value() {
                Some(s) if s >= bands.high_min => high.push(pick),
                Some(s) if s >= bands.mid_min => mid.push(pick),
                _ => low.push(pick),
            }
        }
        sampler.shuffle(&mut high);
        sampler.shuffle(&mut mid);
        sampler.shuffle(&mut low);

        let n = capacity;
        let high_n = ceil_share(n, bands.high_share).min(high.len());
        let mid_n = ceil_share(n, bands.mid_share).min(mid.len()).min(n - high_n);
        let low_n = (n - high_n - mid_n).min(low.len());

        let mut chosen: Vec<(&TrickSnapshot, &ObstacleScore)> = high
            .drain(..high_n)
            .chain(mid.drain(..mid_n))
            .chain(low.drain(..low_n))
            .collect();

        // Back-fill empty slots from the leftovers of the stronger bands
        if chosen.len() < n {
            let missing = n - chosen.len();
            chosen.extend(high.into_iter().chain(mid).take(missing));
        }

        chosen
            .into_iter()
            .map(|(snap, pair)| self.daily_candidate(input, rewards, snap, pair))
            .collect()
    }

    fn daily_candidate(
        &self,
        input: &GenerationInput<'_>,
        rewards: &RewardCalculator<'_>,
        snap: &TrickSnapshot,
        pair: &ObstacleScore,
    ) -> ChallengeCandidate {
        let trick = &snap.trick;
        let obstacle = &pair.obstacle;
        let thresholds = &self.config.thresholds;

        let (description, unlock_condition, xp_reward, difficulty) = match pair.score {
            None => (
                format!(
                    "Attempt {} on {} {} times and land at least {}",
                    trick.display_name(),
                    obstacle.name,
                    thresholds.baseline_attempts,
                    thresholds.baseline_lands
                ),
                UnlockCondition::Attempts {
                    attempts: thresholds.baseline_attempts,
                    lands: Some(thresholds.baseline_lands),
                },
                rewards.daily_baseline(),
                1,
            ),
            Some(score) => {
                let target = next_target(score);
                (
                    format!("Land {} on {} {}/10 times", trick.display_name(), obstacle.name, target),
                    UnlockCondition::Consistency { target },
                    rewards.daily_target(target, trick.tier),
                    u32::from(trick.tier.value()) + if target > 7 { 2 } else { 1 },
                )
            }
        };

        ChallengeCandidate {
            user_id: input.user.user_id.clone(),
            challenge_type: ChallengeType::Daily,
            name: format!("{}: {}", ChallengeType::Daily.label(), trick.display_name()),
            description,
            trick_id: Some(trick.id.clone()),
            obstacle_id: Some(obstacle.id.clone()),
            tier: trick.tier,
            difficulty,
            xp_reward,
            unlock_condition,
            assigned_on: input.today,
        }
    }

    // ========== Boss ==========

    fn boss<S: Sampler>(
        &self,
        input: &GenerationInput<'_>,
        rewards: &RewardCalculator<'_>,
        capacity: usize,
        sampler: &mut S,
    ) -> Vec<ChallengeCandidate> {
        let busy: HashSet<&str> = input
            .existing
            .iter()
            .filter(|c| c.is_pending_of(ChallengeType::Boss))
            .filter_map(|c| c.trick_id.as_deref())
            .collect();

        let mut options: Vec<(&TrickSnapshot, &Obstacle)> = Vec::new();
        for snap in input.tricks {
            if busy.contains(snap.id()) {
                continue;
            }
            let mut seen: HashSet<&str> = HashSet::new();
            for mastered in snap.obstacles_at_least(self.config.thresholds.boss_min_score) {
                let Some(harder) = mastered.obstacle.next_harder(input.obstacles) else {
                    continue;
                };
                if !snap.has_landed_on(&harder.id) && seen.insert(harder.id.as_str()) {
                    options.push((snap, harder));
                }
            }
        }

        sampler.shuffle(&mut options);

        let mut used: HashSet<&str> = HashSet::new();
        let mut out = Vec::new();
        for (snap, harder) in options {
            if out.len() >= capacity {
                break;
            }
            if !used.insert(snap.id()) {
                continue;
            }
            let trick = &snap.trick;
            out.push(ChallengeCandidate {
                user_id: input.user.user_id.clone(),
                challenge_type: ChallengeType::Boss,
                name: format!("{}: {}", ChallengeType::Boss.label(), trick.display_name()),
                description: format!(
                    "Defeat the Boss by landing {} on a tougher obstacle ({}).",
                    trick.display_name(),
                    harder.name
                ),
                trick_id: Some(trick.id.clone()),
                obstacle_id: Some(harder.id.clone()),
                tier: trick.tier,
                difficulty: harder.difficulty,
                xp_reward: rewards.boss(trick.tier, harder.difficulty),
                unlock_condition: UnlockCondition::Boss {
                    trick_id: trick.id.clone(),
                    obstacle_id: harder.id.clone(),
                },
                assigned_on: input.today,
            });
        }
        out
    }

    // ========== Combo ==========

    fn combo<S: Sampler>(
        &self,
        input: &GenerationInput<'_>,
        rewards: &RewardCalculator<'_>,
        capacity: usize,
        sampler: &mut S,
    ) -> Vec<ChallengeCandidate> {
        let max_tier = self.config.thresholds.combo_max_tier;
        let pool: Vec<(&TrickSnapshot, &ObstacleScore)> = input
            .tricks
            .iter()
            .filter(|s| s.tier() <= max_tier)
            .filter_map(|s| s.primary_obstacle().map(|p| (s, p)))
            .collect();
        if pool.len() < 2 {
            return Vec::new();
        }

        let mut taken = pending_group_keys(input.existing, ChallengeType::Combo);

        let mut pairs: Vec<(usize, usize)> = Vec::new();
        for i in 0..pool.len() {
            for j in (i + 1)..pool.len() {
                pairs.push((i, j));
            }
        }
        sampler.shuffle(&mut pairs);

        let mut out = Vec::new();
        for (i, j) in pairs {
            if out.len() >= capacity {
                break;
            }
            let (first, second) = if sampler.roll(0.5) { (pool[i], pool[j]) } else { (pool[j], pool[i]) };
            let key = GroupKey::from_ids([first.0.id(), second.0.id()]);
            if !taken.insert(key.clone()) {
                continue;
            }
            out.push(self.combo_candidate(input, rewards, first, second, key));
        }
        out
    }

    fn combo_candidate(
        &self,
        input: &GenerationInput<'_>,
        rewards: &RewardCalculator<'_>,
        (a, a_obstacle): (&TrickSnapshot, &ObstacleScore),
        (b, b_obstacle): (&TrickSnapshot, &ObstacleScore),
        combo_key: GroupKey,
    ) -> ChallengeCandidate {
        let avg = f64::from(a_obstacle.obstacle.difficulty + b_obstacle.obstacle.difficulty) / 2.0;
        let difficulty = (avg * self.config.rewards.combo_difficulty_factor).round().max(1.0) as u32;
        let target = if b_obstacle.obstacle.difficulty > a_obstacle.obstacle.difficulty {
            &b_obstacle.obstacle
        } else {
            &a_obstacle.obstacle
        };

        ChallengeCandidate {
            user_id: input.user.user_id.clone(),
            challenge_type: ChallengeType::Combo,
            name: format!(
                "{}: {} + {}",
                ChallengeType::Combo.label(),
                a.trick.display_name(),
                b.trick.display_name()
            ),
            description: format!(
                "Land {} into {} on {}.",
                a.trick.display_name(),
                b.trick.display_name(),
                target.name
            ),
            trick_id: None,
            obstacle_id: Some(target.id.clone()),
            tier: a.tier().max(b.tier()),
            difficulty,
            xp_reward: rewards.combo(difficulty),
            unlock_condition: UnlockCondition::Combo {
                combo_key,
                trick_ids: vec![a.id().to_string(), b.id().to_string()],
            },
            assigned_on: input.today,
        }
    }

    // ========== Line ==========

    fn line<S: Sampler>(
        &self,
        input: &GenerationInput<'_>,
        rewards: &RewardCalculator<'_>,
        capacity: usize,
        sampler: &mut S,
    ) -> Vec<ChallengeCandidate> {
        let min_score = self.config.thresholds.line_min_score;
        let pool: Vec<&TrickSnapshot> =
            input.tricks.iter().filter(|s| s.best_score().map_or(false, |b| b >= min_score)).collect();
        if pool.len() < 2 {
            return Vec::new();
        }

        let mut taken = pending_group_keys(input.existing, ChallengeType::Line);
        let length = self.config.thresholds.line_max_tricks.min(pool.len());
        let draws = (capacity as u32).saturating_mul(LINE_DRAWS_PER_SLOT);

        let mut out = Vec::new();
        for _ in 0..draws {
            if out.len() >= capacity {
                break;
            }
            let mut order = pool.clone();
            sampler.shuffle(&mut order);
            let sequence = &order[..length];

            let key = GroupKey::from_ids(sequence.iter().map(|s| s.id()));
            if !taken.insert(key.clone()) {
                continue;
            }
            out.push(self.line_candidate(input, rewards, sequence, key));
        }
        out
    }

    fn line_candidate(
        &self,
        input: &GenerationInput<'_>,
        rewards: &RewardCalculator<'_>,
        sequence: &[&TrickSnapshot],
        line_key: GroupKey,
    ) -> ChallengeCandidate {
        let names: Vec<String> = sequence.iter().map(|s| s.trick.display_name()).collect();
        let tier = sequence.iter().map(|s| s.tier()).max().unwrap_or_default();

        ChallengeCandidate {
            user_id: input.user.user_id.clone(),
            challenge_type: ChallengeType::Line,
            name: format!("{}: {}", ChallengeType::Line.label(), names.join(" → ")),
            description: format!("Land {} in one run.", names.join(" into ")),
            trick_id: None,
            obstacle_id: None,
            tier,
            difficulty: self.config.rewards.line_difficulty,
            xp_reward: rewards.line(),
            unlock_condition: UnlockCondition::Line {
                line_key,
                trick_ids: sequence.iter().map(|s| s.id().to_string()).collect(),
            },
            assigned_on: input.today,
        }
    }

    // ========== Initial ==========

    /// Assessment measuring a trick on an obstacle it has no consistency for yet.
    pub fn initial_assessment(
        &self,
        user: &UserProgression,
        trick: &Trick,
        obstacle: &Obstacle,
        today: NaiveDate,
    ) -> ChallengeCandidate {
        let rewards = RewardCalculator::new(&self.config.rewards, &self.config.xp_curve, user.level);
        let attempts = self.config.thresholds.assessment_attempts;

        ChallengeCandidate {
            user_id: user.user_id.clone(),
            challenge_type: ChallengeType::Initial,
            name: format!("{}: {}", ChallengeType::Initial.label(), trick.display_name()),
            description: format!(
                "Land {} on {} as many times as you can out of {} attempts",
                trick.display_name(),
                obstacle.name,
                attempts
            ),
            trick_id: Some(trick.id.clone()),
            obstacle_id: Some(obstacle.id.clone()),
            tier: trick.tier,
            difficulty: obstacle.difficulty,
            xp_reward: rewards.initial(),
            unlock_condition: UnlockCondition::Attempts { attempts, lands: None },
            assigned_on: today,
        }
    }
}

/// Strict ratchet: one more land than the current score, capped at 10.
pub fn next_target(score: Score) -> u8 {
    (score.value() + 1).min(crate::models::trick::MAX_SCORE)
}

/// Starting obstacle for a new trick: flat first, then the easiest, restricted to `types`.
pub fn select_initial_obstacle<'a>(obstacles: &'a [Obstacle], types: &[String]) -> Option<&'a Obstacle> {
    obstacles
        .iter()
        .filter(|o| types.iter().any(|t| t.eq_ignore_ascii_case(&o.obstacle_type)))
        .min_by(|a, b| {
            b.is_flat()
                .cmp(&a.is_flat())
                .then_with(|| a.difficulty.cmp(&b.difficulty))
                .then_with(|| a.id.cmp(&b.id))
        })
}

fn ceil_share(n: usize, share: f64) -> usize {
    ((n as f64 * share) - SHARE_EPSILON).ceil().max(0.0) as usize
}

fn pending_group_keys(existing: &[Challenge], challenge_type: ChallengeType) -> HashSet<GroupKey> {
    existing
        .iter()
        .filter(|c| c.is_pending_of(challenge_type))
        .filter_map(|c| c.unlock_condition.group_key().cloned())
        .collect()
}
