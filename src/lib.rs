//! County ABT
//!
//! Builds an analytics base table from a county-day panel of cumulative
//! case and death counts, policy flags, mobility, weather, labor and
//! census covariates.
//!
//! # Overview
//!
//! The pipeline is strict: every stage either hands a fully well-formed
//! panel to the next one or aborts the run with a typed [`AbtError`].
//!
//! - **Monotonicity correction**: cumulative counts are made non-decreasing
//! - **Policy resolution**: raw flags become one ordinal phase per day
//! - **Cascading imputation**: each covariate family is filled through an
//!   ordered chain of progressively coarser group statistics
//! - **Feature derivation**: new counts, trailing sums, targets, ratios,
//!   event timing and scaled covariates, followed by an edge trim
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          County ABT                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  schema/      - Column registry and family membership           │
//! │  panel/       - Columnar county-day table and group spans       │
//! │  loader       - Delimited-text input                            │
//! │  correction   - Cumulative count repair                         │
//! │  policy/      - Policy phase resolution                         │
//! │  imputation/  - Cascading imputers                              │
//! │  features/    - Derived features and edge trim                  │
//! │  validation   - Stage-boundary checks                           │
//! │  export/      - CSV and NumPy output                            │
//! │  cache        - Content-addressed output cache                  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use county_abt::prelude::*;
//!
//! let pipeline = PipelineBuilder::new().expected_rows(312_480).build()?;
//! let summary = pipeline.run("county_day.csv", "abt.csv")?;
//! ```

pub mod builder;
pub mod cache;
pub mod config;
pub mod correction;
pub mod error;
pub mod export;
pub mod features;
pub mod imputation;
pub mod loader;
pub mod panel;
pub mod pipeline;
pub mod policy;
pub mod prelude;
pub mod schema;
pub mod validation;

// Re-exports - Errors
pub use error::{AbtError, Result};

// Re-exports - Schema
pub use schema::{
    input_registry, names, ColumnDef, ColumnFamily, ColumnKind, ColumnRegistry, ColumnRole,
    CountSeries, COUNT_SERIES, SCHEMA_VERSION,
};

// Re-exports - Config
pub use builder::PipelineBuilder;
pub use config::{
    CacheConfig, CachePolicy, ExperimentMetadata, ExportConfig, PipelineConfig, PolicyConfig,
};

// Re-exports - Stages
pub use correction::MonotonicityCorrector;
pub use features::{FeatureConfig, FeatureEngineer, TrimReport, NO_EVENT};
pub use imputation::{Cascade, FillStep, ImputationConfig, ImputationReport, Imputer, KeySpec};
pub use loader::PanelLoader;
pub use panel::Panel;
pub use policy::{PolicyPhase, PolicyResolver};

// Re-exports - Validation
pub use validation::{check_cardinality, PanelValidator, ValidationLevel, ValidationResult};

// Re-exports - Export
pub use cache::{cache_key, CacheEntry, TableCache};
pub use export::{CsvExporter, ExportMetadata, NumpyExporter};

// Re-exports - Pipeline
pub use pipeline::{Pipeline, PipelineOutput, PipelineStats, RunSummary};
