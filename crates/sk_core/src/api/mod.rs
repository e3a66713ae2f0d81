//! String-in, string-out entry points for hosts outside Rust.

pub mod json_api;

pub use json_api::{
    apply_xp_json, complete_challenge_json, generate_challenges_json, request_schemas, ApiError,
    ApiResponse, ApplyXpRequest, CompleteChallengeRequest, GenerateChallengesRequest, XpOperation,
    XpOutcome, SCHEMA_VERSION,
};
