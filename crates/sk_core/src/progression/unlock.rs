use crate::config::UnlockRules;
use crate::models::{Tier, Trick, UserProgression};

/// How a new trick may be created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockDecision {
    Free,
    /// Gating applies; one wild slot is consumed
    WildSlot,
    Locked,
}

/// Free creation while the user is still growing a repertoire, or once most of it is mastered.
pub fn can_unlock_new_trick(tricks: &[Trick], rules: &UnlockRules) -> bool {
    if tricks.len() < rules.free_trick_allowance {
        return true;
    }
    let mastered = tricks.iter().filter(|t| t.tier == Tier::Mastered).count();
    mastered as f64 / tricks.len() as f64 >= rules.mastered_ratio
}

pub fn unlock_decision(user: &UserProgression, tricks: &[Trick], rules: &UnlockRules) -> UnlockDecision {
    if can_unlock_new_trick(tricks, rules) {
        UnlockDecision::Free
    } else if user.wild_slots > 0 {
        UnlockDecision::WildSlot
    } else {
        UnlockDecision::Locked
    }
}
