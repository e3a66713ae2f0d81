//! XP, levels and trick-creation gating.

pub mod ledger;
pub mod unlock;

pub use ledger::{apply_xp, commit_xp, project_xp, LedgerUpdate, XpProjection, WILD_SLOT_LEVEL_INTERVAL};
pub use unlock::{can_unlock_new_trick, unlock_decision, UnlockDecision};
