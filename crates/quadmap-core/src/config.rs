//! Configuration for the encoding layer.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`QUADMAP_ENCODER__` prefix)
//! 2. Config file (`quadmap.toml`, `[encoder]` section)
//! 3. Defaults

use serde::{Deserialize, Serialize};

use crate::error::{MapperError, Result};
use crate::types::SYSTEM_PREFIX;

/// How zero values (empty string, 0, false, ...) of populated fields are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZeroValuePolicy {
    /// Zero means "not provided"; the field is skipped.
    #[default]
    Skip,
    /// Zero is a legitimate value and is written.
    Keep,
}

/// Source of blank node identifiers for records pending creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlankNodeStrategy {
    /// `_:b1`, `_:b2`, ... from a per-encoder counter.
    Counter,
    /// `_:<uuid>` from random v4 uuids.
    #[default]
    Uuid,
}

/// Encoder settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderConfig {
    #[serde(default)]
    pub zero_values: ZeroValuePolicy,

    #[serde(default)]
    pub blank_nodes: BlankNodeStrategy,

    /// Work factor for password hashing (4..=31).
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,

    /// Names with this prefix belong to the store and are never reconciled.
    #[serde(default = "default_system_prefix")]
    pub system_prefix: String,
}

fn default_bcrypt_cost() -> u32 {
    4
}

fn default_system_prefix() -> String {
    SYSTEM_PREFIX.to_string()
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            zero_values: ZeroValuePolicy::default(),
            blank_nodes: BlankNodeStrategy::default(),
            bcrypt_cost: default_bcrypt_cost(),
            system_prefix: default_system_prefix(),
        }
    }
}

impl EncoderConfig {
    /// Load the `[encoder]` section from `{file_prefix}.toml` and the environment.
    ///
    /// A missing file or section yields the defaults.
    pub fn load(file_prefix: &str) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("QUADMAP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| MapperError::Config(e.to_string()))?;

        let loaded = match cfg.get::<EncoderConfig>("encoder") {
            Ok(c) => c,
            Err(config::ConfigError::NotFound(_)) => EncoderConfig::default(),
            Err(e) => return Err(MapperError::Config(e.to_string())),
        };
        loaded.validate()?;
        Ok(loaded)
    }

    pub fn validate(&self) -> Result<()> {
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(MapperError::Config(format!(
                "bcrypt_cost must be within 4..=31, got {}",
                self.bcrypt_cost
            )));
        }
        if self.system_prefix.is_empty() {
            return Err(MapperError::Config("system_prefix must not be empty".into()));
        }
        Ok(())
    }
}
