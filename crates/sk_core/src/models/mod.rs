pub mod challenge;
pub mod obstacle;
pub mod progression;
pub mod trick;

pub use challenge::{
    Challenge, ChallengeCandidate, ChallengeState, ChallengeType, GroupKey, UnlockCondition,
};
pub use obstacle::{Obstacle, ObstacleScore};
pub use progression::UserProgression;
pub use trick::{Score, Stance, Tier, Trick, TrickSnapshot};
