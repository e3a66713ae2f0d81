//! # sk_core - Skate Trick Progression & Challenge Engine
//!
//! Tracks how consistently a skater lands each trick on each obstacle,
//! derives a mastery tier from that, and rotates a board of XP-paying
//! challenges built from the skater's own repertoire.
//!
//! ## Features
//! - Consistency scores per (trick, obstacle) and tiers derived from them
//! - Daily, boss, combo and line challenge generation under per-type quotas
//! - Seeded generation (same seed and store = same challenges)
//! - Exactly-once challenge completion with XP, bonus XP and follow-ups
//! - XP → level curve with wild-slot milestones gating trick creation
//! - JSON API over a serializable store snapshot

// Game-engine style APIs pass a handful of ids around
#![allow(clippy::too_many_arguments)]

pub mod api;
pub mod challenge;
pub mod completion;
pub mod config;
pub mod consistency;
pub mod error;
pub mod models;
pub mod progression;
pub mod repository;
pub mod service;

// Re-export main API functions
pub use api::{apply_xp_json, complete_challenge_json, generate_challenges_json, ApiError, ApiResponse, SCHEMA_VERSION};

pub use challenge::{
    calculate_xp, ChallengeBoard, ChallengeGenerator, FixedSampler, GenerationInput,
    GenerationOutcome, Sampler, SeededSampler, SkipReason,
};
pub use completion::{AttemptData, CompletionEngine, CompletionResult, NewComboTrick};
pub use config::{ConfigError, EngineConfig};
pub use consistency::{calculate_tier, ConsistencyRecord, TierChange};
pub use error::{EngineError, EngineResult, ErrorKind};
pub use models::{
    Challenge, ChallengeCandidate, ChallengeState, ChallengeType, GroupKey, Obstacle, Score,
    Stance, Tier, Trick, TrickSnapshot, UnlockCondition, UserProgression,
};
pub use progression::{apply_xp, can_unlock_new_trick, project_xp, LedgerUpdate, XpProjection};
pub use repository::{MemoryStore, Repository, StoreSnapshot};
pub use service::{NewTrick, ObstacleAttempts, ProgressionService, SessionLog};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
