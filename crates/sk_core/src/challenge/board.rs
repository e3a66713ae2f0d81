use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::generator::ChallengeGenerator;
use crate::config::EngineConfig;
use crate::models::{Challenge, ChallengeType};

/// Counts for one archetype on a user's board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ArchetypeStatistics {
    pub challenge_type: ChallengeType,
    pub pending: usize,
    /// Completed successfully (failed ones are counted separately)
    pub completed: usize,
    pub failed: usize,
    /// Slots the generator may still fill. `None` for uncapped archetypes.
    pub remaining_capacity: Option<usize>,
}

/// Board statistics for UI display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ChallengeBoard {
    pub total: usize,
    pub archetypes: Vec<ArchetypeStatistics>,
}

impl ChallengeBoard {
    pub fn summarize(config: &EngineConfig, challenges: &[Challenge]) -> Self {
        let generator = ChallengeGenerator::new(config);
        let all = [
            ChallengeType::Daily,
            ChallengeType::Initial,
            ChallengeType::Boss,
            ChallengeType::Combo,
            ChallengeType::Line,
        ];

        let archetypes = all
            .into_iter()
            .map(|challenge_type| {
                let of_type = challenges.iter().filter(|c| c.challenge_type == challenge_type);
                let (mut pending, mut completed, mut failed) = (0, 0, 0);
                for c in of_type {
                    match (c.is_pending(), c.failed) {
                        (true, _) => pending += 1,
                        (false, true) => failed += 1,
                        (false, false) => completed += 1,
                    }
                }
                let remaining_capacity = config
                    .quotas
                    .cap(challenge_type)
                    .map(|_| generator.capacity(challenge_type, challenges));

                ArchetypeStatistics { challenge_type, pending, completed, failed, remaining_capacity }
            })
            .collect();

        Self { total: challenges.len(), archetypes }
    }

    pub fn get(&self, challenge_type: ChallengeType) -> Option<&ArchetypeStatistics> {
        self.archetypes.iter().find(|a| a.challenge_type == challenge_type)
    }

    pub fn pending(&self) -> usize {
        self.archetypes.iter().map(|a| a.pending).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChallengeCandidate, Tier, UnlockCondition};
    use chrono::{NaiveDate, Utc};

    fn challenge(id: &str, challenge_type: ChallengeType) -> Challenge {
        ChallengeCandidate {
            user_id: "u1".into(),
            challenge_type,
            name: id.into(),
            description: String::new(),
            trick_id: None,
            obstacle_id: None,
            tier: Tier::Beginner,
            difficulty: 1,
            xp_reward: 10,
            unlock_condition: UnlockCondition::Consistency { target: 5 },
            assigned_on: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        }
        .into_challenge(id)
    }

    #[test]
    fn test_summarize_counts_and_capacity() {
        let mut done = challenge("d3", ChallengeType::Daily);
        done.mark_completed(false, Utc::now());
        let mut lost = challenge("d4", ChallengeType::Daily);
        lost.mark_completed(true, Utc::now());

        let challenges = vec![
            challenge("d1", ChallengeType::Daily),
            challenge("d2", ChallengeType::Daily),
            done,
            lost,
            challenge("b1", ChallengeType::Boss),
            challenge("i1", ChallengeType::Initial),
        ];
        let board = ChallengeBoard::summarize(&EngineConfig::default(), &challenges);

        assert_eq!(board.total, 6);
        assert_eq!(board.pending(), 4);

        let daily = board.get(ChallengeType::Daily).unwrap();
        assert_eq!((daily.pending, daily.completed, daily.failed), (2, 1, 1));
        assert_eq!(daily.remaining_capacity, Some(3));

        assert_eq!(board.get(ChallengeType::Boss).unwrap().remaining_capacity, Some(0));
        assert_eq!(board.get(ChallengeType::Initial).unwrap().remaining_capacity, None);
        assert_eq!(board.get(ChallengeType::Line).unwrap().remaining_capacity, Some(2));
    }
}
