//! Fluent builder for pipeline configuration.
//!
//! # Quick Start
//!
//! ```ignore
//! use county_abt::PipelineBuilder;
//!
//! // Defaults: 7-day window, stabilizer 1.0, always recompute
//! let pipeline = PipelineBuilder::new().build()?;
//!
//! let summary = pipeline.run("county_day.csv", "abt.csv")?;
//! ```
//!
//! # Common Configurations
//!
//! ## Reproducible batch run
//!
//! ```ignore
//! let pipeline = PipelineBuilder::new()
//!     .expected_rows(312_480)
//!     .reuse_cache("/var/cache/abt")
//!     .with_numpy_export()
//!     .build()?;
//! ```
//!
//! ## Two-week horizon
//!
//! ```ignore
//! let pipeline = PipelineBuilder::new()
//!     .window(14)
//!     .stabilizer(0.5)
//!     .without_scaled_features()
//!     .build()?;
//! ```

use crate::config::{CachePolicy, ExperimentMetadata, PipelineConfig};
use crate::error::Result;
use crate::pipeline::Pipeline;
use std::path::PathBuf;

/// Fluent builder for creating pipeline configurations.
///
/// Every setter overrides one field of [`PipelineConfig::default`]; the
/// assembled configuration is validated by [`build_config`](Self::build_config).
#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    config: PipelineConfig,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn from_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Trailing window length in days.
    pub fn window(mut self, days: usize) -> Self {
        self.config.features.window = days;
        self
    }

    /// Additive offset in trailing sums and count ratios.
    pub fn stabilizer(mut self, value: f64) -> Self {
        self.config.features.stabilizer = value;
        self
    }

    pub fn without_scaled_features(mut self) -> Self {
        self.config.features.include_scaled = false;
        self
    }

    /// Longest mobility gap bridged by interpolation.
    pub fn interpolation_max_gap(mut self, days: usize) -> Self {
        self.config.imputation.interpolation_max_gap = days;
        self
    }

    pub fn mobility_divisor(mut self, divisor: f64) -> Self {
        self.config.imputation.mobility_divisor = divisor;
        self
    }

    /// Keep reopening phases reported for counties that never issued a
    /// stay-home order.
    pub fn keep_phases_without_stay_home(mut self) -> Self {
        self.config.policy.discard_phases_without_stay_home = false;
        self
    }

    /// Assert the exact number of input rows.
    pub fn expected_rows(mut self, rows: usize) -> Self {
        self.config.expected_rows = Some(rows);
        self
    }

    /// Reuse cached tables stored under `dir`.
    pub fn reuse_cache(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.cache.policy = CachePolicy::ReuseIfPresent;
        self.config.cache.dir = dir.into();
        self
    }

    pub fn recompute_always(mut self) -> Self {
        self.config.cache.policy = CachePolicy::RecomputeAlways;
        self
    }

    /// Field delimiter for input and output tables.
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.config.delimiter = delimiter;
        self
    }

    /// Also write a NumPy feature matrix next to the table.
    pub fn with_numpy_export(mut self) -> Self {
        self.config.export.write_numpy = true;
        self
    }

    pub fn with_metadata(mut self, metadata: ExperimentMetadata) -> Self {
        self.config.metadata = Some(metadata);
        self
    }

    /// Validate and return the configuration without building a pipeline.
    pub fn build_config(self) -> Result<PipelineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }

    pub fn build(self) -> Result<Pipeline> {
        Pipeline::from_config(self.build_config()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults_match_config() {
        let config = PipelineBuilder::new().build_config().unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_builder_setters() {
        let config = PipelineBuilder::new()
            .window(14)
            .stabilizer(0.5)
            .without_scaled_features()
            .interpolation_max_gap(3)
            .keep_phases_without_stay_home()
            .expected_rows(100)
            .reuse_cache("cache")
            .delimiter(';')
            .with_numpy_export()
            .build_config()
            .unwrap();

        assert_eq!(config.features.window, 14);
        assert_eq!(config.features.stabilizer, 0.5);
        assert!(!config.features.include_scaled);
        assert_eq!(config.imputation.interpolation_max_gap, 3);
        assert!(!config.policy.discard_phases_without_stay_home);
        assert_eq!(config.expected_rows, Some(100));
        assert_eq!(config.cache.policy, CachePolicy::ReuseIfPresent);
        assert_eq!(config.delimiter_byte(), b';');
        assert!(config.export.write_numpy);
    }

    #[test]
    fn test_builder_validates() {
        assert!(PipelineBuilder::new().window(0).build().is_err());
        assert!(PipelineBuilder::new().stabilizer(-1.0).build_config().is_err());
    }
}
