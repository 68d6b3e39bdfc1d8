//! Pipeline configuration management.
//!
//! One serializable struct carries every setting of a run, so a saved
//! config file reproduces the run exactly (the cache key is derived from it).
//!
//! # Features
//!
//! - **Unified Configuration**: single struct combining all pipeline stages
//! - **Serialization**: save/load configurations to TOML or JSON
//! - **Validation**: configurations are checked before a pipeline is built
//!
//! # Example
//!
//! ```ignore
//! use county_abt::config::{CachePolicy, PipelineConfig};
//!
//! let mut config = PipelineConfig::default();
//! config.expected_rows = Some(312_480);
//! config.cache.policy = CachePolicy::ReuseIfPresent;
//! config.save_toml("abt.toml")?;
//!
//! let loaded = PipelineConfig::load_toml("abt.toml")?;
//! let pipeline = Pipeline::from_config(loaded)?;
//! ```

use crate::error::Result;
use crate::{FeatureConfig, ImputationConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Unified pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Exact row count asserted after load; the loaded count is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_rows: Option<usize>,

    /// Field delimiter shared by the input table and the exported ABT
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Imputation cascade settings
    #[serde(default)]
    pub imputation: ImputationConfig,

    /// Feature derivation settings
    #[serde(default)]
    pub features: FeatureConfig,

    /// Policy resolution settings
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Output cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Output format settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Experiment metadata (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ExperimentMetadata>,
}

/// Policy resolution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Treat reopening phases as unreported when no stay-home order was ever issued
    pub discard_phases_without_stay_home: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            discard_phases_without_stay_home: true,
        }
    }
}

/// When a cached ABT may stand in for a fresh computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Always rebuild; the cache is neither read nor written
    #[default]
    RecomputeAlways,
    /// Reuse an entry whose content key matches, otherwise rebuild and store
    ReuseIfPresent,
}

/// Output cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub policy: CachePolicy,

    /// Directory holding cache entries
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            policy: CachePolicy::RecomputeAlways,
            dir: PathBuf::from(".abt_cache"),
        }
    }
}

fn default_delimiter() -> char {
    ','
}

/// Output format settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Also write `features.npy` and `metadata.json` next to the table
    pub write_numpy: bool,
}

/// Experiment metadata for tracking and reproducibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentMetadata {
    /// Experiment name
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Creation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// Version or git commit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Custom tags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            expected_rows: None,
            delimiter: default_delimiter(),
            imputation: ImputationConfig::default(),
            features: FeatureConfig::default(),
            policy: PolicyConfig::default(),
            cache: CacheConfig::default(),
            export: ExportConfig::default(),
            metadata: None,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(mut self, metadata: ExperimentMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_features(mut self, config: FeatureConfig) -> Self {
        self.features = config;
        self
    }

    pub fn with_imputation(mut self, config: ImputationConfig) -> Self {
        self.imputation = config;
        self
    }

    pub fn with_expected_rows(mut self, rows: usize) -> Self {
        self.expected_rows = Some(rows);
        self
    }

    pub fn with_cache(mut self, policy: CachePolicy, dir: impl Into<PathBuf>) -> Self {
        self.cache = CacheConfig {
            policy,
            dir: dir.into(),
        };
        self
    }

    /// Delimiter as the single byte the CSV reader and writer expect.
    pub fn delimiter_byte(&self) -> u8 {
        // ASCII is enforced by validate().
        self.delimiter as u8
    }

    /// Validate the configuration.
    ///
    /// Returns Ok(()) if valid, Err(msg) otherwise.
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.imputation.validate()?;
        self.features.validate()?;

        if !self.delimiter.is_ascii() || self.delimiter.is_ascii_alphanumeric() {
            return Err(format!(
                "delimiter must be an ASCII punctuation or whitespace character, got {:?}",
                self.delimiter
            ));
        }
        if self.delimiter == '.' || self.delimiter == '-' {
            return Err(format!(
                "delimiter {:?} collides with numeric formatting",
                self.delimiter
            ));
        }
        if self.expected_rows == Some(0) {
            return Err("expected_rows must be > 0 when set".to_string());
        }
        if self.cache.policy == CachePolicy::ReuseIfPresent
            && self.cache.dir.as_os_str().is_empty()
        {
            return Err("cache.dir must be set when reusing cached output".to_string());
        }

        Ok(())
    }

    /// Save configuration to TOML file.
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        fs::write(path, toml_string)?;
        Ok(())
    }

    /// Load and validate configuration from TOML file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: PipelineConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json_string = serde_json::to_string_pretty(self)?;
        fs::write(path, json_string)?;
        Ok(())
    }

    /// Load and validate configuration from JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }
}
