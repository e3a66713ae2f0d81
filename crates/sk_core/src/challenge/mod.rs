//! Challenge generation: archetype builders, reward sizing, injectable randomness.

pub mod board;
pub mod generator;
pub mod rewards;
pub mod sampler;

pub use board::{ArchetypeStatistics, ChallengeBoard};
pub use generator::{
    next_target, select_initial_obstacle, ArchetypeSkip, ChallengeGenerator, GenerationInput,
    GenerationOutcome, SkipReason,
};
pub use rewards::{calculate_xp, over_target_bonus, RewardCalculator};
pub use sampler::{FixedSampler, Sampler, SeededSampler};
