use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::ChallengeType;

/// Coarse classification callers map to their own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    InvalidInput,
    Storage,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Trick not found: {0}")]
    TrickNotFound(String),

    #[error("Obstacle not found: {0}")]
    ObstacleNotFound(String),

    #[error("Challenge not found: {0}")]
    ChallengeNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Challenge {0} already completed")]
    AlreadyCompleted(String),

    #[error("Trick creation locked for user {user_id}: no wild slot available")]
    TrickCreationLocked { user_id: String },

    #[error("Invalid attempt: {0}")]
    InvalidAttempt(String),

    #[error("Missing attempt data for {challenge_type} challenge {challenge_id}")]
    MissingAttemptData { challenge_id: String, challenge_type: ChallengeType },

    #[error("Invalid combo trick: {0}")]
    InvalidComboTrick(String),

    #[error("Invalid trick: {0}")]
    InvalidTrick(String),

    #[error("{challenge_type} challenge {challenge_id} has no trick/obstacle pair")]
    IncompleteChallenge { challenge_id: String, challenge_type: ChallengeType },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::TrickNotFound(_)
            | EngineError::ObstacleNotFound(_)
            | EngineError::ChallengeNotFound(_)
            | EngineError::UserNotFound(_) => ErrorKind::NotFound,
            EngineError::AlreadyCompleted(_) | EngineError::TrickCreationLocked { .. } => {
                ErrorKind::InvalidState
            }
            EngineError::InvalidAttempt(_)
            | EngineError::MissingAttemptData { .. }
            | EngineError::InvalidComboTrick(_)
            | EngineError::InvalidTrick(_)
            | EngineError::IncompleteChallenge { .. } => ErrorKind::InvalidInput,
            EngineError::Storage(_) => ErrorKind::Storage,
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
