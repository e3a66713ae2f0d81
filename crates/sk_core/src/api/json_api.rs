//! JSON entry points
//!
//! Each call carries the whole `StoreSnapshot` in its request and returns the
//! updated snapshot, so a host without a Rust-side repository can drive the
//! engine with strings alone. Engine failures come back as `success: false`
//! with the error kind; malformed requests are an `ApiError`.

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::completion::{AttemptData, CompletionResult};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult, ErrorKind};
use crate::progression::{LedgerUpdate, XpProjection};
use crate::repository::{MemoryStore, StoreSnapshot};
use crate::service::{GenerationReport, ProgressionService};

pub const SCHEMA_VERSION: u8 = 1;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid JSON request: {0}")]
    InvalidRequest(#[source] serde_json::Error),

    #[error("Unsupported schema version: {0}")]
    UnsupportedSchemaVersion(u8),

    #[error("Failed to serialize response: {0}")]
    Serialize(#[source] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerateChallengesRequest {
    pub schema_version: u8,
    pub snapshot: StoreSnapshot,
    pub user_id: String,
    pub today: NaiveDate,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CompleteChallengeRequest {
    pub schema_version: u8,
    pub snapshot: StoreSnapshot,
    pub user_id: String,
    pub challenge_id: String,
    #[serde(default)]
    pub attempt: AttemptData,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ApplyXpRequest {
    pub schema_version: u8,
    pub snapshot: StoreSnapshot,
    pub user_id: String,
    pub operation: XpOperation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum XpOperation {
    /// Credit XP and persist the result
    Grant { earned_xp: u32 },
    /// Preview only; the snapshot is returned unchanged
    Project { earned_xp: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum XpOutcome {
    Granted { update: LedgerUpdate },
    Projected { projection: XpProjection },
}

/// Response envelope shared by every entry point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ApiResponse<T> {
    pub schema_version: u8,
    pub success: bool,
    /// A missing field reads as `None`; no `T: Default` bound
    pub result: Option<T>,
    /// Updated store; absent on failure, when the request's snapshot still holds
    #[serde(default)]
    pub snapshot: Option<StoreSnapshot>,
    #[serde(default)]
    pub error_kind: Option<ErrorKind>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(result: T, snapshot: StoreSnapshot) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            success: true,
            result: Some(result),
            snapshot: Some(snapshot),
            error_kind: None,
            error_message: None,
        }
    }

    fn failed(err: &EngineError) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            success: false,
            result: None,
            snapshot: None,
            error_kind: Some(err.kind()),
            error_message: Some(err.to_string()),
        }
    }
}

pub fn generate_challenges_json(request_json: &str, config: &EngineConfig) -> Result<String, ApiError> {
    let request: GenerateChallengesRequest = parse_request(request_json)?;
    check_version(request.schema_version)?;

    let mut service = ProgressionService::new(MemoryStore::from_snapshot(request.snapshot), config.clone());
    let outcome: EngineResult<GenerationReport> =
        service.generate_for_user(&request.user_id, request.today, request.seed);
    respond(&service, outcome)
}

pub fn complete_challenge_json(request_json: &str, config: &EngineConfig) -> Result<String, ApiError> {
    let request: CompleteChallengeRequest = parse_request(request_json)?;
    check_version(request.schema_version)?;

    let mut service = ProgressionService::new(MemoryStore::from_snapshot(request.snapshot), config.clone());
    let outcome: EngineResult<CompletionResult> =
        service.complete(&request.user_id, &request.challenge_id, request.attempt);
    respond(&service, outcome)
}

pub fn apply_xp_json(request_json: &str, config: &EngineConfig) -> Result<String, ApiError> {
    let request: ApplyXpRequest = parse_request(request_json)?;
    check_version(request.schema_version)?;

    let mut service = ProgressionService::new(MemoryStore::from_snapshot(request.snapshot), config.clone());
    let outcome = match request.operation {
        XpOperation::Grant { earned_xp } => {
            service.grant_xp(&request.user_id, earned_xp).map(|update| XpOutcome::Granted { update })
        }
        XpOperation::Project { earned_xp } => service
            .project_xp(&request.user_id, earned_xp)
            .map(|projection| XpOutcome::Projected { projection }),
    };
    respond(&service, outcome)
}

/// JSON Schemas of every request type, keyed by type name
pub fn request_schemas() -> serde_json::Value {
    serde_json::json!({
        "GenerateChallengesRequest": schemars::schema_for!(GenerateChallengesRequest),
        "CompleteChallengeRequest": schemars::schema_for!(CompleteChallengeRequest),
        "ApplyXpRequest": schemars::schema_for!(ApplyXpRequest),
    })
}

fn parse_request<T: DeserializeOwned>(request_json: &str) -> Result<T, ApiError> {
    serde_json::from_str(request_json).map_err(ApiError::InvalidRequest)
}

fn check_version(version: u8) -> Result<(), ApiError> {
    if version != SCHEMA_VERSION {
        return Err(ApiError::UnsupportedSchemaVersion(version));
    }
    Ok(())
}

fn respond<T: Serialize>(
    service: &ProgressionService<MemoryStore>,
    outcome: EngineResult<T>,
) -> Result<String, ApiError> {
    let response = match outcome {
        Ok(result) => ApiResponse::ok(result, service.repo().to_snapshot()),
        Err(err) => {
            tracing::warn!(error = %err, "json request failed");
            ApiResponse::failed(&err)
        }
    };
    serde_json::to_string(&response).map_err(ApiError::Serialize)
}
