//! XP reward sizing
//!
//! Every generated reward is scaled by the user's position on the level
//! curve, the same `XpCurve` the ledger levels against.

use crate::config::{RewardConfig, XpCurve};
use crate::models::Tier;

/// `round(base_xp * tier multiplier * consistency / 10)`
pub fn calculate_xp(base_xp: u32, tier: Tier, consistency: f64) -> u32 {
    let consistency = consistency.clamp(0.0, 10.0);
    (f64::from(base_xp) * tier.xp_multiplier() * consistency / 10.0).round() as u32
}

/// Reward sizing for one user at one level
#[derive(Debug, Clone, Copy)]
pub struct RewardCalculator<'a> {
    rewards: &'a RewardConfig,
    scale: f64,
}

impl<'a> RewardCalculator<'a> {
    pub fn new(rewards: &'a RewardConfig, curve: &XpCurve, level: u32) -> Self {
        let scale = if rewards.scale_with_level { curve.reward_scale(level) } else { 1.0 };
        Self { rewards, scale }
    }

    fn scaled(&self, base: f64) -> u32 {
        (base * self.scale).round().max(0.0) as u32
    }

    pub fn daily_baseline(&self) -> u32 {
        self.scaled(f64::from(self.rewards.daily_baseline))
    }

    pub fn daily_target(&self, target: u8, tier: Tier) -> u32 {
        let base = self.rewards.daily_base + self.rewards.daily_per_target * u32::from(target);
        self.scaled(f64::from(base) * tier.xp_multiplier())
    }

    pub fn boss(&self, tier: Tier, difficulty: u32) -> u32 {
        let base = self.rewards.boss_base + u32::from(tier.value()) * difficulty;
        self.scaled(f64::from(base))
    }

    pub fn combo(&self, difficulty: u32) -> u32 {
        let base = self.rewards.combo_base + self.rewards.combo_per_difficulty * difficulty;
        self.scaled(f64::from(base))
    }

    pub fn line(&self) -> u32 {
        self.scaled(f64::from(self.rewards.line_reward))
    }

    pub fn initial(&self) -> u32 {
        self.scaled(f64::from(self.rewards.initial_reward))
    }

    /// XP for a challenge stored without a reward: full consistency at the trick's tier.
    pub fn fallback(&self, tier: Tier) -> u32 {
        calculate_xp(self.rewards.fallback_base_xp, tier, 10.0)
    }
}

/// `floor((lands - target) / attempts * reward * bonus_percent / 100)`, exact in integers.
pub fn over_target_bonus(lands: u32, target: u32, attempts: u32, reward: u32, bonus_percent: u32) -> u32 {
    if attempts == 0 || lands <= target {
        return 0;
    }
    let numerator = u64::from(lands - target) * u64::from(reward) * u64::from(bonus_percent);
    let denominator = u64::from(attempts) * 100;
    (numerator / denominator) as u32
}
