//! Serializable run configuration.

use std::path::{Path, PathBuf};

use drawlab_core::{EngineConfig, RngSource};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unique identifier for a run (content-addressable hash).
pub type RunId = String;

/// Errors from loading or validating a run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Serializable configuration for one calculation + validation run.
///
/// Everything needed to reproduce a run:
/// - the table file and the pick size
/// - the number of validation trials and the random source
/// - the worker layout of the engine and the validator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    /// Table file in the text table format.
    pub table: PathBuf,

    /// Items per pick.
    pub amount: usize,

    /// Validation trials; 0 skips validation.
    pub trials: usize,

    /// Random source for validation draws.
    pub rng: RngKind,

    /// Master seed for `RngKind::Seeded`.
    pub seed: u64,

    /// Worker threads; 0 uses rayon's default.
    pub threads: usize,

    /// Use worker threads at all.
    pub parallel: bool,
}

/// Configurable random source kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RngKind {
    Os,
    Fast,
    #[default]
    Seeded,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            table: PathBuf::from("table.txt"),
            amount: 1,
            trials: 1_000_000,
            rng: RngKind::default(),
            seed: 42,
            threads: 0,
            parallel: true,
        }
    }
}

impl RunConfig {
    /// Load a config from a TOML file.
    ///
    /// A relative `table` path is resolved against the config file's
    /// directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        if config.table.is_relative() {
            if let Some(dir) = path.parent() {
                config.table = dir.join(&config.table);
            }
        }
        Ok(config)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.table.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("table path is empty".into()));
        }
        Ok(())
    }

    /// Computes a deterministic hash ID for this configuration.
    ///
    /// Two runs with identical configs have the same RunId; it also scopes the
    /// validator's sub-seeds.
    pub fn run_id(&self) -> RunId {
        // plain data: serializing to JSON cannot fail
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    /// The random source this config selects.
    pub fn rng_source(&self) -> RngSource {
        match self.rng {
            RngKind::Os => RngSource::Os,
            RngKind::Fast => RngSource::Fast,
            RngKind::Seeded => RngSource::Seeded(self.seed),
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            parallel: self.parallel,
            threads: self.threads,
        }
    }
}
