//! Unified pipeline for building the analytics base table.
//!
//! Connects every stage in a fixed order. Each stage receives a fully
//! well-formed panel from the one before it; any failed check aborts the run
//! and nothing is written.
//!
//! # Architecture
//!
//! ```text
//! raw table ──► PanelLoader ──► entry checks ──► sort (county, date)
//!                                                      │
//!     ┌────────────────────────────────────────────────┘
//!     ▼
//! MonotonicityCorrector ──► PolicyResolver ──► Imputer ──► imputed checks
//!                                                               │
//!     ┌─────────────────────────────────────────────────────────┘
//!     ▼
//! FeatureEngineer::derive ──► FeatureEngineer::trim ──► output checks
//!                                                               │
//!                               CsvExporter ◄── NumpyExporter ◄─┘ (optional)
//! ```
//!
//! Row count is asserted after load, after policy resolution and after
//! imputation. The edge trim is the only stage allowed to drop rows.
//!
//! # Example
//!
//! ```ignore
//! use county_abt::prelude::*;
//!
//! let pipeline = PipelineBuilder::new()
//!     .expected_rows(312_480)
//!     .reuse_cache(".abt_cache")
//!     .build()?;
//!
//! let summary = pipeline.run("county_day.csv", "abt.csv")?;
//! println!("{} rows, cache hit: {}", summary.rows, summary.cache_hit);
//! ```
//!
//! # Output Structure
//!
//! | Field | Type | Description |
//! |-------|------|-------------|
//! | `panel` | `Panel` | Finished table |
//! | `stats.rows_loaded` | `usize` | Rows read from the input |
//! | `stats.rows_output` | `usize` | Rows after the edge trim |
//! | `stats.imputation` | `ImputationReport` | Cells filled per family, column and step |
//! | `stats.trim` | `TrimReport` | Rows removed by the edge trim |

use crate::cache::{cache_key, TableCache};
use crate::config::PipelineConfig;
use crate::correction::MonotonicityCorrector;
use crate::error::Result;
use crate::export::{CsvExporter, NumpyExporter};
use crate::features::{FeatureEngineer, TrimReport};
use crate::imputation::{ImputationReport, Imputer};
use crate::loader::PanelLoader;
use crate::panel::Panel;
use crate::policy::PolicyResolver;
use crate::validation::{check_cardinality, PanelValidator};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Statistics from one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineStats {
    /// Rows read from the input
    pub rows_loaded: usize,

    /// Rows in the finished table
    pub rows_output: usize,

    /// Number of counties
    pub counties: usize,

    pub imputation: ImputationReport,

    pub trim: TrimReport,

    /// Wall time spent in `process_panel`
    pub elapsed: Duration,
}

/// Output from pipeline processing.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Finished table, sorted by (county, date)
    pub panel: Panel,

    pub stats: PipelineStats,
}

/// Result of [`Pipeline::run`].
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Path the table was written to
    pub output: PathBuf,

    /// Content key of this run
    pub cache_key: String,

    /// Whether the table was served from the cache
    pub cache_hit: bool,

    pub rows: usize,

    pub columns: usize,

    /// Stage statistics; `None` on a cache hit
    pub stats: Option<PipelineStats>,
}

/// Main pipeline - connects all stages.
pub struct Pipeline {
    config: PipelineConfig,
    loader: PanelLoader,
    resolver: PolicyResolver,
    imputer: Imputer,
    engineer: FeatureEngineer,
    validator: PanelValidator,
    cache: TableCache,
}

impl Pipeline {
    /// Create pipeline from configuration.
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            loader: PanelLoader::new(config.delimiter_byte()),
            resolver: PolicyResolver::new(config.policy.discard_phases_without_stay_home),
            imputer: Imputer::new(&config.imputation),
            engineer: FeatureEngineer::new(config.features.clone()),
            validator: PanelValidator::new(),
            cache: TableCache::new(&config.cache),
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage over a loaded panel.
    pub fn process_panel(&self, panel: Panel) -> Result<PipelineOutput> {
        let started = Instant::now();

        self.validator.validate_input(&panel).into_result()?;
        let rows_loaded = panel.len();
        let expected = self.config.expected_rows.unwrap_or(rows_loaded);
        check_cardinality("load", expected, rows_loaded)?;

        let panel = panel.sorted()?;
        let counties = panel.group_count();
        log::info!("Loaded {rows_loaded} rows across {counties} counties");

        let panel = MonotonicityCorrector::apply(panel)?;
        let panel = self.resolver.resolve(panel)?;
        check_cardinality("policy", expected, panel.len())?;

        let (panel, imputation) = self.imputer.impute_all(panel)?;
        check_cardinality("imputation", expected, panel.len())?;
        self.validator.validate_imputed(&panel).into_result()?;

        let panel = self.engineer.derive(panel)?;
        let (panel, trim) = self.engineer.trim(panel)?;
        self.validator.validate_output(&panel).into_result()?;

        let stats = PipelineStats {
            rows_loaded,
            rows_output: panel.len(),
            counties,
            imputation,
            trim,
            elapsed: started.elapsed(),
        };
        log::info!(
            "Pipeline complete: {} -> {} rows in {:.2?}",
            stats.rows_loaded,
            stats.rows_output,
            stats.elapsed
        );
        Ok(PipelineOutput { panel, stats })
    }

    /// Parse raw delimited bytes and run every stage.
    pub fn process_bytes(&self, input: &[u8]) -> Result<PipelineOutput> {
        let panel = self.loader.load_reader(input)?;
        self.process_panel(panel)
    }

    /// Build the table for `input` and write it to `output`.
    ///
    /// Under [`crate::config::CachePolicy::ReuseIfPresent`] a cached table
    /// with the same content key is copied instead of recomputed.
    pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(&self, input: P, output: Q) -> Result<RunSummary> {
        let input = input.as_ref();
        let output = output.as_ref();

        let bytes = fs::read(input)?;
        let key = cache_key(&bytes, &self.config)?;

        if let Some((cached, entry)) = self.cache.lookup(&key) {
            log::info!("Cache hit for {} (key {key})", input.display());
            copy_into_place(&cached, output)?;
            return Ok(RunSummary {
                output: output.to_path_buf(),
                cache_key: key,
                cache_hit: true,
                rows: entry.rows,
                columns: entry.columns,
                stats: None,
            });
        }

        log::info!("Building table from {}", input.display());
        let result = self.process_bytes(&bytes)?;

        // The table goes last: a failed NumPy export must not leave it behind.
        let npy_dir = self.config.export.write_numpy.then(|| numpy_dir(output));
        if let Some(dir) = &npy_dir {
            NumpyExporter::new(dir).export(&result.panel)?;
        }
        let exporter = CsvExporter::new(self.config.delimiter_byte());
        let columns = match exporter.write(&result.panel, output) {
            Ok(columns) => columns,
            Err(err) => {
                if let Some(dir) = &npy_dir {
                    discard_numpy(dir);
                }
                return Err(err);
            }
        };
        self.cache.store(&key, output, result.panel.len(), columns)?;

        Ok(RunSummary {
            output: output.to_path_buf(),
            cache_key: key,
            cache_hit: false,
            rows: result.panel.len(),
            columns,
            stats: Some(result.stats),
        })
    }
}

/// Sibling directory for the NumPy export of `output`.
pub fn numpy_dir(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "abt".to_string());
    output.with_file_name(format!("{stem}_npy"))
}

/// Remove the files of a NumPy export whose table could not be written.
fn discard_numpy(dir: &Path) {
    for name in ["features.npy", "metadata.json"] {
        let path = dir.join(name);
        if let Err(err) = fs::remove_file(&path) {
            log::warn!("Could not remove {}: {err}", path.display());
        }
    }
}

fn copy_into_place(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut staged = to.as_os_str().to_os_string();
    staged.push(".partial");
    fs::copy(from, &staged)?;
    fs::rename(&staged, to)?;
    Ok(())
}
