use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Lifetime XP, in-level XP, level and milestone rewards for one user.
///
/// Only the ledger writes this; every other component takes it by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UserProgression {
    pub user_id: String,
    /// Monotonic lifetime total
    #[serde(default)]
    pub xp_total: u64,
    /// XP inside the current level, reset on level-up
    #[serde(default)]
    pub xp_current: u32,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub wild_slots: u32,
}

fn default_level() -> u32 {
    1
}

impl UserProgression {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), xp_total: 0, xp_current: 0, level: 1, wild_slots: 0 }
    }

    pub fn at_level(mut self, level: u32, xp_current: u32) -> Self {
        self.level = level.max(1);
        self.xp_current = xp_current;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_default_to_fresh_user() {
        let p: UserProgression = serde_json::from_str(r#"{"user_id":"u1"}"#).unwrap();
        assert_eq!(p, UserProgression::new("u1"));
        assert_eq!(p.level, 1);
    }
}
