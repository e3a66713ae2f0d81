use std::path::Path;
use std::{env, fs};

use super::{ConfigError, EngineConfig};

pub const ENGINE_CONFIG_PATH_ENV: &str = "SK_ENGINE_CONFIG_PATH";

/// Load config from the JSON file named by `SK_ENGINE_CONFIG_PATH`.
///
/// Unset or blank falls back to the default config. A file that exists but
/// fails to parse or validate is an error, never silently ignored.
pub fn load_from_env() -> Result<EngineConfig, ConfigError> {
    let Ok(path) = env::var(ENGINE_CONFIG_PATH_ENV) else {
        return Ok(EngineConfig::default());
    };

    let path = path.trim();
    if path.is_empty() {
        return Ok(EngineConfig::default());
    }

    load_from_path(path)
}

/// Load and validate a JSON config file.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let config = EngineConfig::from_json(&content)?;
    config.validate()?;
    tracing::info!(path = %path.display(), "loaded engine config");
    Ok(config)
}
