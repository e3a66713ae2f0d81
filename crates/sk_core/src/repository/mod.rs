//! Collaborator interfaces the engine reads and writes through.
//!
//! Persistence is the host's concern. The engine only needs these traits;
//! `MemoryStore` is the reference implementation used by the CLI, the JSON
//! API and the tests.

mod memory;

pub use memory::{MemoryStore, StoreSnapshot};

pub use crate::consistency::ConsistencyStore;

use chrono::{DateTime, Utc};

use crate::error::EngineResult;
use crate::models::{Challenge, Obstacle, ObstacleScore, Tier, Trick, TrickSnapshot, UserProgression};

/// Tricks and the obstacle catalog
pub trait TrickRepository {
    fn trick(&self, trick_id: &str) -> EngineResult<Trick>;

    fn tricks_for_user(&self, user_id: &str) -> EngineResult<Vec<Trick>>;

    fn insert_trick(&mut self, trick: Trick) -> EngineResult<()>;

    fn set_trick_tier(&mut self, trick_id: &str, tier: Tier) -> EngineResult<()>;

    /// Associate an obstacle with a trick. Returns false if it was already linked.
    fn link_obstacle(&mut self, trick_id: &str, obstacle_id: &str) -> EngineResult<bool>;

    fn obstacle(&self, obstacle_id: &str) -> EngineResult<Obstacle>;

    fn obstacles(&self) -> EngineResult<Vec<Obstacle>>;
}

pub trait ChallengeRepository {
    fn challenge(&self, challenge_id: &str) -> EngineResult<Challenge>;

    fn challenges_for_user(&self, user_id: &str) -> EngineResult<Vec<Challenge>>;

    fn insert_challenge(&mut self, challenge: Challenge) -> EngineResult<()>;

    /// Compare-and-set `Pending → Completed`.
    ///
    /// Must fail with `AlreadyCompleted` when the stored challenge is no longer
    /// pending; this is the one atomicity guarantee the engine relies on.
    fn mark_completed(
        &mut self,
        challenge_id: &str,
        failed: bool,
        at: DateTime<Utc>,
    ) -> EngineResult<Challenge>;
}

pub trait UserRepository {
    fn progression(&self, user_id: &str) -> EngineResult<UserProgression>;

    fn save_progression(&mut self, progression: &UserProgression) -> EngineResult<()>;
}

/// Everything the engine needs from the host
pub trait Repository: TrickRepository + ConsistencyStore + ChallengeRepository + UserRepository {}

impl<T> Repository for T where T: TrickRepository + ConsistencyStore + ChallengeRepository + UserRepository {}

/// Tricks of a user with their obstacles and per-obstacle consistency.
pub fn load_snapshots<R>(repo: &R, user_id: &str) -> EngineResult<Vec<TrickSnapshot>>
where
    R: TrickRepository + ConsistencyStore + ?Sized,
{
    let tricks = repo.tricks_for_user(user_id)?;
    let mut snapshots = Vec::with_capacity(tricks.len());

    for trick in tricks {
        let mut obstacles = Vec::with_capacity(trick.obstacle_ids.len());
        for obstacle_id in &trick.obstacle_ids {
            let obstacle = repo.obstacle(obstacle_id)?;
            let entry = match repo.consistency(user_id, &trick.id, obstacle_id)? {
                Some(record) => ObstacleScore::scored(obstacle, record.score, record.landed),
                None => ObstacleScore::unattempted(obstacle),
            };
            obstacles.push(entry);
        }
        snapshots.push(TrickSnapshot { trick, obstacles });
    }

    Ok(snapshots)
}
