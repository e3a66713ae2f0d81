//! Generation quotas, probabilities and eligibility thresholds

use serde::{Deserialize, Serialize};

use crate::models::{ChallengeType, Tier};

/// Per-archetype caps on pending challenges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeQuotas {
    pub daily: u32,
    pub line: u32,
    pub combo: u32,
    pub boss: u32,
}

impl Default for ChallengeQuotas {
    fn default() -> Self {
        Self { daily: 5, line: 2, combo: 2, boss: 1 }
    }
}

impl ChallengeQuotas {
    /// Initial assessments are spawned on demand and have no cap.
    pub fn cap(&self, challenge_type: ChallengeType) -> Option<u32> {
        match challenge_type {
            ChallengeType::Daily => Some(self.daily),
            ChallengeType::Line => Some(self.line),
            ChallengeType::Combo => Some(self.combo),
            ChallengeType::Boss => Some(self.boss),
            ChallengeType::Initial => None,
        }
    }
}

/// Probability that an archetype is attempted on a generation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchetypeChances {
    pub boss: f64,
    pub combo: f64,
    pub line: f64,
}

impl Default for ArchetypeChances {
    fn default() -> Self {
        Self { boss: 0.5, combo: 0.5, line: 0.5 }
    }
}

impl ArchetypeChances {
    /// Daily challenges are always attempted.
    pub fn for_type(&self, challenge_type: ChallengeType) -> f64 {
        match challenge_type {
            ChallengeType::Boss => self.boss,
            ChallengeType::Combo => self.combo,
            ChallengeType::Line => self.line,
            ChallengeType::Daily | ChallengeType::Initial => 1.0,
        }
    }

    pub fn always() -> Self {
        Self { boss: 1.0, combo: 1.0, line: 1.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EligibilityThresholds {
    /// Obstacle score that makes a trick boss-ready (default: 6)
    pub boss_min_score: u8,
    /// Obstacle score that makes a trick usable in a line (default: 6)
    pub line_min_score: u8,
    /// Weakest tier allowed into a combo (default: Moderate)
    pub combo_max_tier: Tier,
    pub line_max_tricks: usize,
    /// Baseline daily for a never-attempted pair: attempt N, land M
    pub baseline_attempts: u32,
    pub baseline_lands: u32,
    /// Attempts asked of an initial assessment
    pub assessment_attempts: u32,
}

impl Default for EligibilityThresholds {
    fn default() -> Self {
        Self {
            boss_min_score: 6,
            line_min_score: 6,
            combo_max_tier: Tier::Moderate,
            line_max_tricks: 3,
            baseline_attempts: 10,
            baseline_lands: 3,
            assessment_attempts: 10,
        }
    }
}

/// Consistency bands used to weight daily slots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DailyBands {
    /// Scores at or above this are "high"
    pub high_min: u8,
    /// Scores at or above this (and below `high_min`) are "mid"
    pub mid_min: u8,
    /// Share of slots for the high band, rounded up
    pub high_share: f64,
    /// Share of slots for the mid band, rounded up; the low band takes the rest
    pub mid_share: f64,
}

impl Default for DailyBands {
    fn default() -> Self {
        Self { high_min: 7, mid_min: 4, high_share: 0.7, mid_share: 0.2 }
    }
}
