//! Cascading Imputation
//!
//! Fills missing values family by family. Each family has its own
//! [`Cascade`]: an ordered list of fallback levels from the most granular
//! grouping to a global statistic.
//!
//! # Standard cascades
//!
//! ```text
//! mobility     interpolate(≤7d) → county×week×dow → state×week×dow
//!              → week×dow → dow → global median, then ÷100
//! weather      county×week×dow → state×week → global median
//! economic     forward-fill → state×date rate×pop → date rate×pop
//!              → global rate×pop
//! demographic  state weighted median → national weighted median
//! density      (0 = missing) state pooled density → national pooled density
//! testing      forward-fill → state×date rate×pop → date rate×pop
//!              → global rate×pop (only when the test counts are present)
//! ```
//!
//! Weeks are MMWR epi-weeks; `dow` is day of week.
//!
//! # Example
//!
//! ```ignore
//! use county_abt::imputation::{ImputationConfig, Imputer};
//!
//! let imputer = Imputer::new(&ImputationConfig::default());
//! let (panel, report) = imputer.impute_all(panel)?;
//! println!("filled {} cells", report.total_filled());
//! ```

mod cascade;
mod grouping;
pub mod stats;

pub use cascade::{Cascade, ColumnReport, FamilyReport, FillStep};
pub use grouping::{day_of_week, epi_week, GroupContext, GroupKey, KeySpec};

use crate::error::Result;
use crate::panel::Panel;
use crate::schema::{
    ColumnFamily, DEMOGRAPHIC_IMPUTED_COLUMNS, DENSITY_COLUMNS, ECONOMIC_COLUMNS,
    MOBILITY_COLUMNS, TESTING_COLUMNS, WEATHER_COLUMNS,
};
use serde::{Deserialize, Serialize};

/// Imputation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputationConfig {
    /// Longest interior gap, in days, bridged by mobility interpolation
    pub interpolation_max_gap: usize,

    /// Mobility values are divided by this after filling (percent to fraction)
    pub mobility_divisor: f64,
}

impl Default for ImputationConfig {
    fn default() -> Self {
        Self {
            interpolation_max_gap: 7,
            mobility_divisor: 100.0,
        }
    }
}

impl ImputationConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.mobility_divisor == 0.0 || !self.mobility_divisor.is_finite() {
            return Err(format!(
                "mobility_divisor must be finite and non-zero, got {}",
                self.mobility_divisor
            ));
        }
        Ok(())
    }
}

/// Imputation summary across families.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImputationReport {
    pub families: Vec<FamilyReport>,
}

impl ImputationReport {
    pub fn total_filled(&self) -> usize {
        self.families.iter().map(FamilyReport::total_filled).sum()
    }

    pub fn family(&self, family: ColumnFamily) -> Option<&FamilyReport> {
        self.families.iter().find(|f| f.family == family)
    }
}

/// Runs every family cascade over a panel.
#[derive(Debug, Clone)]
pub struct Imputer {
    cascades: Vec<Cascade>,
}

impl Imputer {
    /// Standard cascades for every imputed family.
    pub fn new(config: &ImputationConfig) -> Self {
        let cols = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        let mobility = Cascade::new(
            ColumnFamily::Mobility,
            cols(MOBILITY_COLUMNS),
            vec![
                FillStep::Interpolate {
                    max_gap: config.interpolation_max_gap,
                },
                FillStep::Median(KeySpec::COUNTY_WEEK_DOW),
                FillStep::Median(KeySpec::STATE_WEEK_DOW),
                FillStep::Median(KeySpec::WEEK_DOW),
                FillStep::Median(KeySpec::DOW),
                FillStep::Median(KeySpec::GLOBAL),
            ],
        )
        .with_divisor(config.mobility_divisor);

        let weather = Cascade::new(
            ColumnFamily::Weather,
            cols(WEATHER_COLUMNS),
            vec![
                FillStep::Median(KeySpec::COUNTY_WEEK_DOW),
                FillStep::Median(KeySpec::STATE_WEEK),
                FillStep::Median(KeySpec::GLOBAL),
            ],
        );

        let per_capita = || {
            vec![
                FillStep::ForwardFill,
                FillStep::PopulationRate(KeySpec::STATE_DATE),
                FillStep::PopulationRate(KeySpec::DATE),
                FillStep::PopulationRate(KeySpec::GLOBAL),
            ]
        };

        let economic = Cascade::new(ColumnFamily::Economic, cols(ECONOMIC_COLUMNS), per_capita());

        let demographic = Cascade::new(
            ColumnFamily::Demographic,
            cols(DEMOGRAPHIC_IMPUTED_COLUMNS),
            vec![
                FillStep::WeightedMedian(KeySpec::STATE),
                FillStep::WeightedMedian(KeySpec::GLOBAL),
            ],
        );

        let density = Cascade::new(
            ColumnFamily::Density,
            cols(DENSITY_COLUMNS),
            vec![
                FillStep::PooledDensity(KeySpec::STATE),
                FillStep::PooledDensity(KeySpec::GLOBAL),
            ],
        )
        .with_zero_as_missing();

        let testing = Cascade::new(ColumnFamily::Testing, cols(TESTING_COLUMNS), per_capita());

        Self {
            cascades: vec![mobility, weather, economic, demographic, density, testing],
        }
    }

    /// Imputer with custom cascades.
    pub fn with_cascades(cascades: Vec<Cascade>) -> Self {
        Self { cascades }
    }

    pub fn cascades(&self) -> &[Cascade] {
        &self.cascades
    }

    /// Run every cascade in order over a sorted panel.
    ///
    /// Optional columns absent from the panel are skipped; required columns
    /// were checked at load.
    pub fn impute_all(&self, mut panel: Panel) -> Result<(Panel, ImputationReport)> {
        let ctx = GroupContext::new(&panel)?;
        let mut report = ImputationReport::default();

        for cascade in &self.cascades {
            let present: Vec<String> = cascade
                .columns
                .iter()
                .filter(|c| panel.has_numeric(c))
                .cloned()
                .collect();
            if present.len() < cascade.columns.len() {
                log::debug!(
                    "{}: {} optional column(s) not in input",
                    cascade.family,
                    cascade.columns.len() - present.len()
                );
            }
            let cascade = Cascade {
                columns: present,
                ..cascade.clone()
            };
            let (next, family) = cascade.apply(panel, &ctx)?;
            panel = next;
            report.families.push(family);
        }

        log::info!("Imputation complete: {} cells filled", report.total_filled());
        Ok((panel, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ImputationConfig::default();
        assert_eq!(config.interpolation_max_gap, 7);
        assert!(config.validate().is_ok());
        let bad = ImputationConfig {
            mobility_divisor: 0.0,
            ..config
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_standard_cascade_order() {
        let imputer = Imputer::new(&ImputationConfig::default());
        let families: Vec<ColumnFamily> = imputer.cascades().iter().map(|c| c.family).collect();
        assert_eq!(families, ColumnFamily::imputed());

        let mobility = &imputer.cascades()[0];
        assert_eq!(mobility.steps.len(), 6);
        assert_eq!(mobility.steps.last(), Some(&FillStep::Median(KeySpec::GLOBAL)));
        assert_eq!(mobility.divisor, Some(100.0));
        assert!(imputer.cascades()[4].zero_is_missing);
        assert_eq!(imputer.cascades()[5].steps, imputer.cascades()[2].steps);
    }
}
