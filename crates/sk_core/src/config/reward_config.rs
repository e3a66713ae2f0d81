//! XP rewards and the level curve

use serde::{Deserialize, Serialize};

/// XP needed to clear each level: `base + (level - 1) * step`.
///
/// Shared by reward sizing and the ledger's level-up test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XpCurve {
    pub base: u32,
    pub step: u32,
}

impl Default for XpCurve {
    fn default() -> Self {
        Self { base: 100, step: 50 }
    }
}

impl XpCurve {
    pub fn xp_for_level(&self, level: u32) -> u32 {
        let level = level.max(1);
        self.base.saturating_add((level - 1).saturating_mul(self.step))
    }

    /// Reward multiplier for a user at `level`, 1.0 at level 1.
    pub fn reward_scale(&self, level: u32) -> f64 {
        f64::from(self.xp_for_level(level)) / f64::from(self.xp_for_level(1).max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Never-attempted daily (attempt 10, land 3)
    pub daily_baseline: u32,
    /// Ratchet daily: `(daily_base + daily_per_target * target) * tier multiplier`
    pub daily_base: u32,
    pub daily_per_target: u32,
    /// Boss: `boss_base + tier * obstacle difficulty`
    pub boss_base: u32,
    /// Combo: `combo_base + combo_per_difficulty * difficulty`
    pub combo_base: u32,
    pub combo_per_difficulty: u32,
    pub combo_difficulty_factor: f64,
    pub line_reward: u32,
    pub line_difficulty: u32,
    pub initial_reward: u32,
    /// Over-target bonus as a percentage of the stored reward
    pub bonus_percent: u32,
    /// Base of the tier/consistency XP formula used for fallbacks and session logs
    pub fallback_base_xp: u32,
    /// Scale generated rewards by `XpCurve::reward_scale(user level)`
    pub scale_with_level: bool,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            daily_baseline: 50,
            daily_base: 40,
            daily_per_target: 5,
            boss_base: 100,
            combo_base: 100,
            combo_per_difficulty: 10,
            combo_difficulty_factor: 1.2,
            line_reward: 120,
            line_difficulty: 3,
            initial_reward: 50,
            bonus_percent: 20,
            fallback_base_xp: 10,
            scale_with_level: true,
        }
    }
}

/// Rules for creating tricks without spending a wild slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnlockRules {
    /// Tricks a user may create freely
    pub free_trick_allowance: usize,
    /// Share of tier-1 tricks that unlocks another free creation
    pub mastered_ratio: f64,
}

impl Default for UnlockRules {
    fn default() -> Self {
        Self { free_trick_allowance: 10, mastered_ratio: 0.7 }
    }
}
