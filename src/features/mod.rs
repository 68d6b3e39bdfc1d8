//! Feature derivation for the analytics base table.
//!
//! Runs on the corrected, policy-resolved, fully imputed panel. Nothing here
//! imputes: a missing cell in an input column is a defect upstream and
//! aborts the run.
//!
//! # Architecture
//!
//! - `epidemic`: count-series features for confirmed cases and deaths
//!   (new counts, trailing sums, targets, penetration, momentum, event timing)
//! - `covariates`: age bands, income scaling, unemployment ratios and
//!   change, test positivity and optional min-max scaled weather and density
//! - `series`: per-county window helpers shared by both
//!
//! Policy timing (`days_in_policy_phase`) is derived from the resolved
//! `policy_code`.
//!
//! # Edge trim
//!
//! The first `window` rows of each county have no complete trailing window.
//! [`FeatureEngineer::trim`] removes them; it is the only step allowed to
//! drop rows.
//!
//! ```ignore
//! use county_abt::features::{FeatureConfig, FeatureEngineer};
//!
//! let engineer = FeatureEngineer::new(FeatureConfig::default());
//! let panel = engineer.derive(panel)?;
//! let (panel, trim) = engineer.trim(panel)?;
//! ```

pub mod covariates;
pub mod epidemic;
pub mod series;

pub use epidemic::NO_EVENT;

use crate::error::{AbtError, Result};
use crate::panel::{collect_column, Panel};
use crate::schema::{names, COUNT_SERIES};
use serde::{Deserialize, Serialize};

/// Configuration for feature derivation.
///
/// # Example
///
/// ```
/// use county_abt::FeatureConfig;
///
/// let config = FeatureConfig::default();
/// assert_eq!(config.window, 7);
/// assert_eq!(config.stabilizer, 1.0);
///
/// let config = FeatureConfig::default().with_scaled(false);
/// assert!(!config.include_scaled);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Trailing window length in days for sums and targets
    pub window: usize,

    /// Additive offset in trailing sums and count ratios
    pub stabilizer: f64,

    /// Median household income is divided by this
    pub income_divisor: f64,

    /// Whether to emit min-max scaled weather and density columns
    pub include_scaled: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            window: 7,
            stabilizer: 1.0,
            income_divisor: 10_000.0,
            include_scaled: true,
        }
    }
}

impl FeatureConfig {
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn with_stabilizer(mut self, stabilizer: f64) -> Self {
        self.stabilizer = stabilizer;
        self
    }

    pub fn with_scaled(mut self, enabled: bool) -> Self {
        self.include_scaled = enabled;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.window == 0 {
            return Err("window must be > 0".to_string());
        }
        if self.stabilizer <= 0.0 || !self.stabilizer.is_finite() {
            return Err(format!(
                "stabilizer must be positive and finite, got {}",
                self.stabilizer
            ));
        }
        if self.income_divisor == 0.0 || !self.income_divisor.is_finite() {
            return Err(format!(
                "income_divisor must be finite and non-zero, got {}",
                self.income_divisor
            ));
        }
        Ok(())
    }
}

/// Rows removed by the edge trim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrimReport {
    pub rows_before: usize,
    pub rows_after: usize,
    pub groups: usize,
    /// Counties with no row left after the trim
    pub groups_emptied: usize,
}

impl TrimReport {
    pub fn rows_dropped(&self) -> usize {
        self.rows_before - self.rows_after
    }
}

/// Derives model features from an imputed panel.
#[derive(Debug, Clone, Default)]
pub struct FeatureEngineer {
    config: FeatureConfig,
}

impl FeatureEngineer {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Add every derived column to a sorted, imputed panel.
    pub fn derive(&self, mut panel: Panel) -> Result<Panel> {
        let population = dense(&panel, names::POP_TOTAL)?;

        for series in COUNT_SERIES {
            let cumulative = dense(&panel, series.source)?;
            let columns = epidemic::count_series_features(
                &panel,
                series,
                &cumulative,
                &population,
                &self.config,
            );
            for (name, values) in columns {
                panel.set_numeric(name, values)?;
            }
        }

        let codes = dense(&panel, names::POLICY_CODE)?;
        let dates = panel.dates().to_vec();
        let days_in_policy = collect_column(&panel.groups(), |span| {
            epidemic::days_in_run(&dates[span.range()], &codes[span.range()])
        });
        panel.set_dense(names::DAYS_IN_POLICY, days_in_policy)?;

        let mut dense_columns = covariates::age_bands(&panel, &population)?;
        dense_columns.extend(covariates::economic(&panel, &population, &self.config)?);
        dense_columns.extend(covariates::testing(&panel)?);
        if self.config.include_scaled {
            dense_columns.extend(covariates::scaled(&panel)?);
        }
        for (name, values) in dense_columns {
            panel.set_dense(name, values)?;
        }
        for (name, values) in covariates::unemployment_change(&panel, &self.config)? {
            panel.set_numeric(name, values)?;
        }

        log::info!(
            "Derived features: {} numeric columns on {} rows",
            panel.numeric_names().count(),
            panel.len()
        );
        Ok(panel)
    }

    /// Drop the first `window` rows of every county.
    ///
    /// Those rows have no complete trailing window; every later row keeps
    /// its lag references, so at most `window` rows per county are removed.
    pub fn trim(&self, panel: Panel) -> Result<(Panel, TrimReport)> {
        let w = self.config.window;
        let spans = panel.groups();
        let keep: Vec<bool> = spans
            .iter()
            .flat_map(|span| (0..span.len()).map(move |i| i >= w))
            .collect();
        let groups_emptied = spans.iter().filter(|s| s.len() <= w).count();

        let trimmed = panel.filter_rows(&keep);
        let report = TrimReport {
            rows_before: panel.len(),
            rows_after: trimmed.len(),
            groups: spans.len(),
            groups_emptied,
        };
        if report.rows_dropped() > w * report.groups {
            return Err(AbtError::Cardinality {
                stage: "trim".to_string(),
                expected: report.rows_before - w * report.groups,
                actual: report.rows_after,
            });
        }
        if groups_emptied > 0 {
            log::warn!("{groups_emptied} county series too short to survive the edge trim");
        }
        log::info!(
            "Edge trim: {} -> {} rows ({} dropped across {} counties)",
            report.rows_before,
            report.rows_after,
            report.rows_dropped(),
            report.groups
        );
        Ok((trimmed, report))
    }
}

/// A numeric column that must be complete at this point.
pub(crate) fn dense(panel: &Panel, name: &str) -> Result<Vec<f64>> {
    let values = panel.require_numeric(name)?;
    values
        .iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| AbtError::ResidualNull {
                stage: "features".to_string(),
                family: "input".to_string(),
                column: name.to_string(),
                remaining: values.iter().filter(|v| v.is_none()).count(),
                example_county: panel.county_fips()[row],
            })
        })
        .collect()
}
