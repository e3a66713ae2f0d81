//! XP / Level Ledger
//!
//! The only writer of `UserProgression`. Levels are cleared one at a time
//! against `XpCurve::xp_for_level`, so a large grant can jump several levels.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::config::XpCurve;
use crate::error::EngineResult;
use crate::models::UserProgression;
use crate::repository::UserRepository;

/// Levels that award a wild slot when reached
pub const WILD_SLOT_LEVEL_INTERVAL: u32 = 10;

/// Result of one XP event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LedgerUpdate {
    pub progression: UserProgression,
    pub earned_xp: u32,
    pub previous_level: u32,
    pub levels_gained: u32,
    pub wild_slot_awarded: bool,
}

impl LedgerUpdate {
    pub fn leveled_up(&self) -> bool {
        self.levels_gained > 0
    }
}

/// Preview of an XP grant, for "what would this do" displays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct XpProjection {
    pub level: u32,
    pub xp_current: u32,
    /// XP still missing to clear `level`
    pub xp_to_next_level: u32,
    pub levels_gained: u32,
    pub wild_slot_awarded: bool,
}

/// Apply `earned` XP to a copy of `progression`.
pub fn apply_xp(progression: &UserProgression, earned: u32, curve: &XpCurve) -> LedgerUpdate {
    let previous_level = progression.level.max(1);
    let mut next = progression.clone();
    next.level = previous_level;
    next.xp_total = next.xp_total.saturating_add(u64::from(earned));
    next.xp_current = next.xp_current.saturating_add(earned);

    loop {
        let needed = curve.xp_for_level(next.level).max(1);
        if next.xp_current < needed {
            break;
        }
        next.xp_current -= needed;
        next.level += 1;
    }

    let wild_slot_awarded = lands_on_wild_slot_level(previous_level, next.level);
    if wild_slot_awarded {
        next.wild_slots += 1;
    }

    LedgerUpdate {
        levels_gained: next.level - previous_level,
        progression: next,
        earned_xp: earned,
        previous_level,
        wild_slot_awarded,
    }
}

/// Same computation as `apply_xp`, reduced to what a preview shows.
pub fn project_xp(progression: &UserProgression, earned: u32, curve: &XpCurve) -> XpProjection {
    let update = apply_xp(progression, earned, curve);
    let p = &update.progression;
    XpProjection {
        level: p.level,
        xp_current: p.xp_current,
        xp_to_next_level: curve.xp_for_level(p.level).saturating_sub(p.xp_current),
        levels_gained: update.levels_gained,
        wild_slot_awarded: update.wild_slot_awarded,
    }
}

/// The event must end exactly on a milestone level. Passing over one does not count.
fn lands_on_wild_slot_level(old: u32, new: u32) -> bool {
    new > old && new % WILD_SLOT_LEVEL_INTERVAL == 0
}

/// Load, apply and persist an XP event for `user_id`.
pub fn commit_xp<R: UserRepository + ?Sized>(
    repo: &mut R,
    user_id: &str,
    earned: u32,
    curve: &XpCurve,
) -> EngineResult<LedgerUpdate> {
    let current = repo.progression(user_id)?;
    let update = apply_xp(&current, earned, curve);
    repo.save_progression(&update.progression)?;

    if update.leveled_up() {
        tracing::info!(
            user_id,
            from = update.previous_level,
            to = update.progression.level,
            "level up"
        );
    }
    if update.wild_slot_awarded {
        tracing::info!(user_id, wild_slots = update.progression.wild_slots, "wild slot awarded");
    }
    Ok(update)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_small_grant_stays_in_level() {
        let update = apply_xp(&UserProgression::new("u1"), 40, &XpCurve::default());
        assert_eq!(update.progression.level, 1);
        assert_eq!(update.progression.xp_current, 40);
        assert_eq!(update.progression.xp_total, 40);
        assert!(!update.leveled_up());
    }

    #[test]
    fn test_multi_level_jump() {
        // 100 (L1) + 150 (L2) = 250, 10 left over in L3
        let update = apply_xp(&UserProgression::new("u1"), 260, &XpCurve::default());
        assert_eq!(update.progression.level, 3);
        assert_eq!(update.progression.xp_current, 10);
        assert_eq!(update.levels_gained, 2);
    }

    #[test]
    fn test_exact_threshold_levels_up() {
        let update = apply_xp(&UserProgression::new("u1"), 100, &XpCurve::default());
        assert_eq!(update.progression.level, 2);
        assert_eq!(update.progression.xp_current, 0);
    }

    #[test]
    fn test_wild_slot_on_reaching_level_ten_only() {
        let curve = XpCurve::default();
        // level 9 needs 500
        let at_nine = UserProgression::new("u1").at_level(9, 480);
        let update = apply_xp(&at_nine, 30, &curve);
        assert_eq!(update.progression.level, 10);
        assert!(update.wild_slot_awarded);
        assert_eq!(update.progression.wild_slots, 1);

        // level 10 needs 550; 10 → 11 later awards nothing
        let update = apply_xp(&update.progression, 560, &curve);
        assert_eq!(update.progression.level, 11);
        assert!(!update.wild_slot_awarded);
        assert_eq!(update.progression.wild_slots, 1);
    }

    #[test]
    fn test_wild_slot_only_when_jump_ends_on_milestone() {
        let curve = XpCurve::default();
        // 9 → 11 in one grant: 500 + 550
        let update = apply_xp(&UserProgression::new("u1").at_level(9, 0), 1050, &curve);
        assert_eq!(update.progression.level, 11);
        assert!(!update.wild_slot_awarded);
        assert_eq!(update.progression.wild_slots, 0);

        // 18 → 20 in one grant: 950 + 1000
        let update = apply_xp(&UserProgression::new("u1").at_level(18, 0), 1950, &curve);
        assert_eq!(update.progression.level, 20);
        assert!(update.wild_slot_awarded);
        assert_eq!(update.progression.wild_slots, 1);
    }

    #[test]
    fn test_project_matches_apply() {
        let user = UserProgression::new("u1").at_level(2, 20);
        let curve = XpCurve::default();
        let projection = project_xp(&user, 50, &curve);
        assert_eq!(projection.level, 2);
        assert_eq!(projection.xp_current, 70);
        assert_eq!(projection.xp_to_next_level, 80);
    }

    #[test]
    fn test_commit_persists() {
        use crate::repository::MemoryStore;

        let mut store = MemoryStore::new();
        store.add_user(UserProgression::new("u1"));
        let update = commit_xp(&mut store, "u1", 120, &XpCurve::default()).unwrap();
        assert_eq!(update.progression.level, 2);
        assert_eq!(store.progression("u1").unwrap(), update.progression);

        let err = commit_xp(&mut store, "ghost", 10, &XpCurve::default()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }

    proptest! {
        #[test]
        fn prop_xp_current_below_threshold(
            level in 1u32..60,
            start in 0u32..100,
            grants in proptest::collection::vec(0u32..5_000, 1..8),
        ) {
            let curve = XpCurve::default();
            let mut user = UserProgression::new("u1").at_level(level, start);
            let mut total = 0u64;
            for earned in grants {
                let update = apply_xp(&user, earned, &curve);
                total += u64::from(earned);
                prop_assert!(update.progression.xp_current < curve.xp_for_level(update.progression.level));
                prop_assert!(update.progression.level >= user.level);
                user = update.progression;
            }
            prop_assert_eq!(user.xp_total, total);
        }
    }
}
