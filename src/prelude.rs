//! Prelude module for convenient imports.
//!
//! # Usage
//!
//! ```ignore
//! use county_abt::prelude::*;
//!
//! let config = PipelineConfig::default();
//! let pipeline = Pipeline::from_config(config)?;
//! let summary = pipeline.run("county_day.csv", "abt.csv")?;
//! ```
//!
//! # What's Included
//!
//! ## Core Pipeline
//! - [`Pipeline`] - Main processing pipeline
//! - [`PipelineBuilder`] - Fluent configuration
//! - [`PipelineConfig`] - Pipeline configuration
//! - [`PipelineOutput`] - Finished panel plus stage statistics
//!
//! ## Stages
//! - [`PanelLoader`], [`MonotonicityCorrector`], [`PolicyResolver`],
//!   [`Imputer`], [`FeatureEngineer`]
//!
//! ## Errors
//! - [`AbtError`] - Fatal pipeline errors

// ============================================================================
// Core Pipeline
// ============================================================================

pub use crate::builder::PipelineBuilder;
pub use crate::config::{CachePolicy, ExperimentMetadata, PipelineConfig};
pub use crate::pipeline::{Pipeline, PipelineOutput, PipelineStats, RunSummary};

// ============================================================================
// Stages
// ============================================================================

pub use crate::correction::MonotonicityCorrector;
pub use crate::features::{FeatureConfig, FeatureEngineer};
pub use crate::imputation::{ImputationConfig, ImputationReport, Imputer};
pub use crate::loader::PanelLoader;
pub use crate::panel::Panel;
pub use crate::policy::{PolicyPhase, PolicyResolver};

// ============================================================================
// Schema
// ============================================================================

pub use crate::schema::{names, ColumnFamily, COUNT_SERIES};

// ============================================================================
// Export & Validation
// ============================================================================

pub use crate::export::{CsvExporter, NumpyExporter};
pub use crate::validation::{PanelValidator, ValidationResult};

// ============================================================================
// Errors
// ============================================================================

pub use crate::error::{AbtError, Result};
