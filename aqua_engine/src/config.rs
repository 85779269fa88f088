//! TOML configuration loader with validation.
//!
//! Loads an [`EngineConfig`] from a TOML file and runs its bound checks.
//! An invalid configuration is fatal before the engine starts; nothing
//! inside the scan cycle ever re-reads configuration.

use std::path::Path;

use thiserror::Error;

use aqua_common::config::EngineConfig;

// ─── Error Type ─────────────────────────────────────────────────────

/// Configuration loading/validation error.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("config I/O error: {0}")]
    Io(String),
    /// TOML parse error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Parameter validation error.
    #[error("config validation: {0}")]
    Validation(String),
}

// ─── Loading Functions ──────────────────────────────────────────────

/// Load and validate the engine configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("failed to read {}: {e}", path.display())))?;
    load_config_from_str(&raw)
}

/// Load config from a TOML string (also used by tests).
pub fn load_config_from_str(raw: &str) -> Result<EngineConfig, ConfigError> {
    let config: EngineConfig =
        toml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
    config.validate().map_err(ConfigError::Validation)?;
    Ok(config)
}

// ─── Tests ──────────────────────────────────────────────────────────
