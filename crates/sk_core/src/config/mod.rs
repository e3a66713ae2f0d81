//! # Engine Configuration
//!
//! Every tuning constant of the progression engine in one place: quotas,
//! probabilities, eligibility thresholds, rewards and the level curve.
//!
//! ## Usage
//! ```rust
//! use sk_core::config::EngineConfig;
//!
//! let config = EngineConfig::default();
//! let preview = EngineConfig::deterministic();
//! assert!(config.validate().is_ok());
//! assert_eq!(preview.chances.boss, 1.0);
//! ```

mod env;
mod generation_config;
mod reward_config;

pub use env::{load_from_env, load_from_path, ENGINE_CONFIG_PATH_ENV};
pub use generation_config::{ArchetypeChances, ChallengeQuotas, DailyBands, EligibilityThresholds};
pub use reward_config::{RewardConfig, UnlockRules, XpCurve};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::trick::MAX_SCORE;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub quotas: ChallengeQuotas,
    pub chances: ArchetypeChances,
    pub thresholds: EligibilityThresholds,
    pub daily_bands: DailyBands,
    pub rewards: RewardConfig,
    pub xp_curve: XpCurve,
    pub unlock: UnlockRules,
    /// Lands required when a challenge names no target
    pub default_target: u32,
    /// Score given to each component trick when a combo is landed
    pub combo_seed_score: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            quotas: ChallengeQuotas::default(),
            chances: ArchetypeChances::default(),
            thresholds: EligibilityThresholds::default(),
            daily_bands: DailyBands::default(),
            rewards: RewardConfig::default(),
            xp_curve: XpCurve::default(),
            unlock: UnlockRules::default(),
            default_target: 5,
            combo_seed_score: 5,
        }
    }
}

impl EngineConfig {
    pub fn standard() -> Self {
        Self::default()
    }

    /// Every optional archetype fires on every pass
    pub fn deterministic() -> Self {
        Self { chances: ArchetypeChances::always(), ..Self::default() }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let chances = [
            ("chances.boss", self.chances.boss),
            ("chances.combo", self.chances.combo),
            ("chances.line", self.chances.line),
            ("daily_bands.high_share", self.daily_bands.high_share),
            ("daily_bands.mid_share", self.daily_bands.mid_share),
        ];
        for (name, value) in chances {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!("{} must be in [0, 1], got {}", name, value)));
            }
        }

        if self.daily_bands.high_share + self.daily_bands.mid_share > 1.0 {
            return Err(ConfigError::Invalid("daily band shares exceed 1.0".to_string()));
        }
        if self.daily_bands.mid_min > self.daily_bands.high_min {
            return Err(ConfigError::Invalid("daily_bands.mid_min above high_min".to_string()));
        }

        if self.xp_curve.base == 0 || self.xp_curve.step == 0 {
            return Err(ConfigError::Invalid(
                "xp_curve.base and xp_curve.step must be positive".to_string(),
            ));
        }

        let scores = [
            ("thresholds.boss_min_score", self.thresholds.boss_min_score),
            ("thresholds.line_min_score", self.thresholds.line_min_score),
            ("daily_bands.high_min", self.daily_bands.high_min),
            ("combo_seed_score", self.combo_seed_score),
        ];
        for (name, value) in scores {
            if value > MAX_SCORE {
                return Err(ConfigError::Invalid(format!(
                    "{} must be at most {}, got {}",
                    name, MAX_SCORE, value
                )));
            }
        }

        if self.thresholds.line_max_tricks < 2 {
            return Err(ConfigError::Invalid("thresholds.line_max_tricks must be >= 2".to_string()));
        }
        if self.thresholds.baseline_attempts == 0 || self.thresholds.assessment_attempts == 0 {
            return Err(ConfigError::Invalid("attempt counts must be positive".to_string()));
        }
        if self.rewards.combo_difficulty_factor <= 0.0 {
            return Err(ConfigError::Invalid(
                "rewards.combo_difficulty_factor must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.quotas.daily, 5);
        assert_eq!(cfg.quotas.line, 2);
        assert_eq!(cfg.quotas.combo, 2);
        assert_eq!(cfg.quotas.boss, 1);
        assert!((cfg.chances.boss - 0.5).abs() < f64::EPSILON);
        assert_eq!(cfg.default_target, 5);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_deterministic_preset_always_fires() {
        let cfg = EngineConfig::deterministic();
        assert_eq!(cfg.chances, ArchetypeChances::always());
        assert_eq!(cfg.quotas, ChallengeQuotas::default());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let cfg = EngineConfig::from_json(r#"{"quotas":{"daily":3},"xp_curve":{"step":25}}"#).unwrap();
        assert_eq!(cfg.quotas.daily, 3);
        assert_eq!(cfg.quotas.boss, 1);
        assert_eq!(cfg.xp_curve.base, 100);
        assert_eq!(cfg.xp_curve.step, 25);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut cfg = EngineConfig::default();
        cfg.chances.combo = 1.5;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));

        let mut cfg = EngineConfig::default();
        cfg.xp_curve.step = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = EngineConfig::default();
        cfg.thresholds.boss_min_score = 11;
        assert!(cfg.validate().is_err());

        let mut cfg = EngineConfig::default();
        cfg.daily_bands.high_share = 0.9;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let cfg = EngineConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let parsed = EngineConfig::from_json(&json).unwrap();
        assert_eq!(parsed, cfg);
    }
}
