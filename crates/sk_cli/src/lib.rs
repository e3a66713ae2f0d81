//! Store file handling for the `sk` CLI
//!
//! The whole engine state lives in one JSON `StoreSnapshot` file. Every
//! command loads it, runs one service call, and writes it back through a
//! temp file + rename so a crash never leaves a half-written store.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use sk_core::config::{load_from_env, load_from_path};
use sk_core::repository::{load_snapshots, UserRepository};
use sk_core::{
    ChallengeBoard, EngineConfig, MemoryStore, Obstacle, ObstacleAttempts, ProgressionService, StoreSnapshot,
    TrickSnapshot, UserProgression,
};

/// What was written by `save_snapshot`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    /// SHA256 of the written bytes (hex)
    pub checksum: String,
    pub size: u64,
}

/// Everything `sk status` prints for one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub progression: UserProgression,
    pub board: ChallengeBoard,
    pub tricks: Vec<TrickSnapshot>,
}

/// Default obstacle catalog for a fresh store
pub fn starter_obstacles() -> Vec<Obstacle> {
    vec![
        Obstacle::new("flat", "Flatground", "flat", 1),
        Obstacle::new("manual-pad", "Manual Pad", "manual", 1),
        Obstacle::new("curb", "Curb", "ledge", 1),
        Obstacle::new("ledge", "Ledge", "ledge", 2),
        Obstacle::new("hubba", "Hubba", "ledge", 4),
        Obstacle::new("flat-rail", "Flat Rail", "rail", 2),
        Obstacle::new("handrail", "Handrail", "rail", 4),
        Obstacle::new("three-stair", "3 Stair", "stairs", 2),
        Obstacle::new("five-stair", "5 Stair", "stairs", 3),
        Obstacle::new("gap", "Gap", "stairs", 5),
    ]
}

/// Fresh store holding the given users and the obstacle catalog.
pub fn new_snapshot(user_ids: &[String], obstacles: Vec<Obstacle>) -> StoreSnapshot {
    StoreSnapshot {
        obstacles,
        users: user_ids.iter().map(UserProgression::new).collect(),
        ..StoreSnapshot::default()
    }
}

pub fn load_snapshot(path: &Path) -> Result<StoreSnapshot> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read store file: {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Failed to parse store file: {}", path.display()))
}

/// Write `snapshot` to `path` atomically.
pub fn save_snapshot(path: &Path, snapshot: &StoreSnapshot) -> Result<SnapshotMetadata> {
    let bytes = serde_json::to_vec_pretty(snapshot).context("Failed to serialize store")?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create store directory: {}", parent.display()))?;
    }

    let tmp = temp_path(path);
    fs::write(&tmp, &bytes).with_context(|| format!("Failed to write temp file: {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move {} into place", tmp.display()))?;

    let checksum = format!("{:x}", Sha256::digest(&bytes));
    tracing::debug!(path = %path.display(), size = bytes.len(), %checksum, "store saved");
    Ok(SnapshotMetadata { checksum, size: bytes.len() as u64 })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// `--config` wins; otherwise `SK_ENGINE_CONFIG_PATH`, otherwise defaults.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let config = match path {
        Some(path) => load_from_path(path)?,
        None => load_from_env()?,
    };
    Ok(config)
}

/// `obstacle:attempts:landed`, e.g. `flat:10:7`
pub fn parse_entry(raw: &str) -> Result<ObstacleAttempts> {
    let parts: Vec<&str> = raw.split(':').collect();
    let [obstacle_id, attempts, landed] = parts.as_slice() else {
        bail!("Expected obstacle:attempts:landed, got '{}'", raw);
    };
    Ok(ObstacleAttempts {
        obstacle_id: obstacle_id.trim().to_string(),
        attempts: attempts.trim().parse().with_context(|| format!("Invalid attempts in '{}'", raw))?,
        landed: landed.trim().parse().with_context(|| format!("Invalid landed count in '{}'", raw))?,
    })
}

/// A loaded store plus the service running over it
pub struct Workspace {
    path: PathBuf,
    pub service: ProgressionService<MemoryStore>,
}

impl Workspace {
    pub fn open(path: &Path, config: EngineConfig) -> Result<Self> {
        let snapshot = load_snapshot(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            service: ProgressionService::new(MemoryStore::from_snapshot(snapshot), config),
        })
    }

    pub fn status(&self, user_id: &str) -> Result<StatusReport> {
        let repo = self.service.repo();
        Ok(StatusReport {
            progression: repo.progression(user_id)?,
            board: self.service.board(user_id)?,
            tricks: load_snapshots(repo, user_id)?,
        })
    }

    /// Persist the store. Commands that fail never reach this, so the file stays as it was.
    pub fn commit(self) -> Result<SnapshotMetadata> {
        save_snapshot(&self.path, &self.service.repo().to_snapshot())
    }
}
