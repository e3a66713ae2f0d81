//! Challenge completion: attempt scoring, side effects, XP.

pub mod attempt;
pub mod engine;

pub use attempt::{score_attempt, AttemptData, AttemptScore, NewComboTrick};
pub use engine::{CompletionEngine, CompletionResult};
