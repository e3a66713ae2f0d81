use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

use super::trick::Tier;

/// Challenge archetype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeType {
    Daily,
    Initial,
    Boss,
    Combo,
    Line,
}

impl ChallengeType {
    /// Archetypes the generator produces under a quota, in generation order.
    pub const GENERATED: [ChallengeType; 4] =
        [ChallengeType::Daily, ChallengeType::Boss, ChallengeType::Combo, ChallengeType::Line];

    /// Only daily challenges can end in failure; initial assessments just measure.
    pub fn can_fail(self) -> bool {
        matches!(self, ChallengeType::Daily)
    }

    pub fn label(self) -> &'static str {
        match self {
            ChallengeType::Daily => "Daily Challenge",
            ChallengeType::Initial => "Initial Assessment",
            ChallengeType::Boss => "Boss Challenge",
            ChallengeType::Combo => "Combo Challenge",
            ChallengeType::Line => "Line Challenge",
        }
    }
}

impl fmt::Display for ChallengeType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ChallengeType::Daily => "daily",
            ChallengeType::Initial => "initial",
            ChallengeType::Boss => "boss",
            ChallengeType::Combo => "combo",
            ChallengeType::Line => "line",
        };
        f.write_str(s)
    }
}

/// Lifecycle state. `Completed` is terminal; a failed daily is `Completed` with `failed = true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeState {
    #[default]
    Pending,
    Completed,
}

/// Stable identity of a multi-trick grouping (combo or line).
///
/// Built from the sorted, de-duplicated trick ids, each length-prefixed before
/// hashing, so `["ab", "c"]` and `["a", "bc"]` never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct GroupKey(String);

impl GroupKey {
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ids: Vec<String> = ids.into_iter().map(|s| s.as_ref().to_string()).collect();
        ids.sort();
        ids.dedup();

        let mut hasher = Sha256::new();
        hasher.update((ids.len() as u64).to_le_bytes());
        for id in &ids {
            hasher.update((id.len() as u64).to_le_bytes());
            hasher.update(id.as_bytes());
        }
        GroupKey(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Archetype-specific completion payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnlockCondition {
    /// Land `target` out of 10
    Consistency { target: u8 },
    /// Try `attempts` times; `lands` is the pass mark when set
    Attempts {
        attempts: u32,
        #[serde(default)]
        lands: Option<u32>,
    },
    Boss { trick_id: String, obstacle_id: String },
    Combo { combo_key: GroupKey, trick_ids: Vec<String> },
    Line { line_key: GroupKey, trick_ids: Vec<String> },
}

impl UnlockCondition {
    /// Lands required to pass, or `default_target` when the condition names none.
    pub fn target_lands(&self, default_target: u32) -> u32 {
        match self {
            UnlockCondition::Consistency { target } => u32::from(*target),
            UnlockCondition::Attempts { lands: Some(lands), .. } => *lands,
            _ => default_target,
        }
    }

    pub fn group_key(&self) -> Option<&GroupKey> {
        match self {
            UnlockCondition::Combo { combo_key, .. } => Some(combo_key),
            UnlockCondition::Line { line_key, .. } => Some(line_key),
            _ => None,
        }
    }

    pub fn trick_ids(&self) -> &[String] {
        match self {
            UnlockCondition::Combo { trick_ids, .. } | UnlockCondition::Line { trick_ids, .. } => {
                trick_ids
            }
            _ => &[],
        }
    }
}

/// A generated challenge before the caller has assigned it an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChallengeCandidate {
    pub user_id: String,
    pub challenge_type: ChallengeType,
    pub name: String,
    pub description: String,
    pub trick_id: Option<String>,
    pub obstacle_id: Option<String>,
    pub tier: Tier,
    pub difficulty: u32,
    pub xp_reward: u32,
    pub unlock_condition: UnlockCondition,
    pub assigned_on: NaiveDate,
}

impl ChallengeCandidate {
    pub fn into_challenge(self, id: impl Into<String>) -> Challenge {
        Challenge {
            id: id.into(),
            user_id: self.user_id,
            challenge_type: self.challenge_type,
            name: self.name,
            description: self.description,
            trick_id: self.trick_id,
            obstacle_id: self.obstacle_id,
            tier: self.tier,
            difficulty: self.difficulty,
            xp_reward: self.xp_reward,
            unlock_condition: self.unlock_condition,
            state: ChallengeState::Pending,
            failed: false,
            assigned_on: self.assigned_on,
            completed_at: None,
        }
    }

    pub fn into_challenge_with_new_id(self) -> Challenge {
        self.into_challenge(Uuid::new_v4().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Challenge {
    pub id: String,
    pub user_id: String,
    pub challenge_type: ChallengeType,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub trick_id: Option<String>,
    #[serde(default)]
    pub obstacle_id: Option<String>,
    pub tier: Tier,
    pub difficulty: u32,
    pub xp_reward: u32,
    pub unlock_condition: UnlockCondition,
    #[serde(default)]
    pub state: ChallengeState,
    /// Outcome flag, only meaningful once completed
    #[serde(default)]
    pub failed: bool,
    pub assigned_on: NaiveDate,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Challenge {
    pub fn is_pending(&self) -> bool {
        self.state == ChallengeState::Pending
    }

    pub fn is_pending_of(&self, challenge_type: ChallengeType) -> bool {
        self.is_pending() && self.challenge_type == challenge_type
    }

    /// Terminal transition. Callers go through the repository's compare-and-set.
    pub(crate) fn mark_completed(&mut self, failed: bool, at: DateTime<Utc>) {
        self.state = ChallengeState::Completed;
        self.failed = failed;
        self.completed_at = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_key_is_order_independent() {
        let a = GroupKey::from_ids(["t2", "t1", "t3"]);
        let b = GroupKey::from_ids(vec!["t3".to_string(), "t1".to_string(), "t2".to_string()]);
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn test_group_key_length_prefix_prevents_join_collisions() {
        assert_ne!(GroupKey::from_ids(["ab", "c"]), GroupKey::from_ids(["a", "bc"]));
        assert_ne!(GroupKey::from_ids(["a-b", "c"]), GroupKey::from_ids(["a", "b-c"]));
    }

    #[test]
    fn test_group_key_ignores_duplicates() {
        assert_eq!(GroupKey::from_ids(["t1", "t1", "t2"]), GroupKey::from_ids(["t2", "t1"]));
    }

    #[test]
    fn test_unlock_condition_tagged_json() {
        let cond = UnlockCondition::Consistency { target: 7 };
        let json = serde_json::to_value(&cond).unwrap();
        assert_eq!(json["type"], "consistency");
        assert_eq!(json["target"], 7);

        let parsed: UnlockCondition =
            serde_json::from_str(r#"{"type":"attempts","attempts":10}"#).unwrap();
        assert_eq!(parsed, UnlockCondition::Attempts { attempts: 10, lands: None });
    }

    #[test]
    fn test_target_lands_resolution() {
        assert_eq!(UnlockCondition::Consistency { target: 8 }.target_lands(5), 8);
        assert_eq!(UnlockCondition::Attempts { attempts: 10, lands: Some(3) }.target_lands(5), 3);
        assert_eq!(UnlockCondition::Attempts { attempts: 10, lands: None }.target_lands(5), 5);
        let boss = UnlockCondition::Boss { trick_id: "t".into(), obstacle_id: "o".into() };
        assert_eq!(boss.target_lands(5), 5);
    }

    #[test]
    fn test_only_daily_can_fail() {
        assert!(ChallengeType::Daily.can_fail());
        assert!(!ChallengeType::Initial.can_fail());
    }
}
