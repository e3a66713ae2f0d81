pub mod store;
pub mod tier;

pub use store::{record_measurement, record_seed, AttemptLog, ConsistencyRecord, ConsistencyStore};
pub use tier::{calculate_tier, eligible_scores, refresh_trick_tier, TierChange};
