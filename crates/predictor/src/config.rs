//! Predictor configuration
//!
//! Loaded from TOML, optionally overridden by `WU_PREDICTOR_*` environment
//! variables. Every section has defaults so partial files are accepted.

use crate::errors::{PredictorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "WU_PREDICTOR_";

/// Top-level predictor configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Prediction memoization
    pub cache: CacheConfig,
    /// Diagnostic logging
    pub logging: LoggingConfig,
}

/// Prediction cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Memoize predictions by fingerprint
    pub enabled: bool,
    /// Upper bound on entries; least recently used are evicted first. Unbounded when unset.
    pub max_entries: Option<usize>,
    /// Keep the full encoded vector per entry and treat fingerprint collisions as misses
    pub verify_keys: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: None,
            verify_keys: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive for binaries (`RUST_LOG` still wins)
    pub level: String,
    /// Log every encoded vector and scorer timing at DEBUG
    pub log_features: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_features: false,
        }
    }
}

const KNOWN_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

impl PredictorConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(std::env::vars())
    }

    /// Apply `WU_PREDICTOR_*` overrides from an arbitrary key/value source
    pub fn apply_overrides<I, K, V>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let Some(key) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value = value.as_ref().trim();
            match key {
                "CACHE_ENABLED" => self.cache.enabled = parse_bool(key, value)?,
                "CACHE_MAX_ENTRIES" => {
                    self.cache.max_entries = if value.is_empty() || value == "none" {
                        None
                    } else {
                        Some(value.parse().map_err(|_| {
                            PredictorError::Config(format!("{key}: expected integer, got '{value}'"))
                        })?)
                    }
                }
                "CACHE_VERIFY_KEYS" => self.cache.verify_keys = parse_bool(key, value)?,
                "LOG_LEVEL" => self.logging.level = value.to_string(),
                "LOG_FEATURES" => self.logging.log_features = parse_bool(key, value)?,
                other => warn!("Ignoring unknown override {ENV_PREFIX}{other}"),
            }
        }
        Ok(())
    }

    /// Reject unusable settings and return warnings for questionable ones
    ///
    /// Nothing is logged here; callers decide how to report the warnings.
    pub fn validate(&self) -> Result<Vec<String>> {
        let mut warnings = Vec::new();

        if self.cache.max_entries == Some(0) {
            return Err(PredictorError::Config(
                "cache.max_entries must be positive; disable the cache instead".to_string(),
            ));
        }

        if !self.cache.enabled && (self.cache.max_entries.is_some() || self.cache.verify_keys) {
            warnings.push("Cache disabled; max_entries and verify_keys have no effect".to_string());
        }

        if !KNOWN_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            warnings.push(format!("Unknown log level '{}'", self.logging.level));
        }

        Ok(warnings)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(PredictorError::Config(format!(
            "{key}: expected boolean, got '{value}'"
        ))),
    }
}
