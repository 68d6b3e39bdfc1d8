//! Stage-Boundary Validation
//!
//! Checks run between pipeline stages. Each check adds an entry to a
//! [`ValidationResult`]; warnings are logged and the run continues, errors
//! are converted into an [`AbtError`] and abort the run.
//!
//! # Checkpoints
//!
//! 1. **Input**: cumulative counts are whole and non-negative, population is
//!    positive, age columns are complete, densities and test counts are
//!    non-negative, state and county labels are present
//! 2. **Cardinality**: row count matches the expected count after load and
//!    again after imputation
//! 3. **Imputed**: no input column intended for the ABT has a missing cell
//! 4. **Output**: every output column is null-free except the look-ahead and
//!    look-back references, policy codes are in range, cumulative counts are
//!    non-decreasing
//!
//! # Usage
//!
//! ```ignore
//! use county_abt::validation::PanelValidator;
//!
//! let report = PanelValidator::new().validate_input(&panel);
//! if report.has_warnings() {
//!     for warning in report.warnings() {
//!         log::warn!("{warning}");
//!     }
//! }
//! report.into_result()?;
//! ```

use crate::error::{AbtError, Result};
use crate::panel::Panel;
use crate::policy::PolicyPhase;
use crate::schema::{
    edge_reference_columns, input_registry, names, ColumnRole, AGE_COLUMNS, COUNT_SERIES,
    TESTING_COLUMNS,
};
use std::collections::HashSet;
use std::fmt;

/// A failed check, convertible into the matching [`AbtError`].
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    /// Column missing or unusable
    Schema { column: String, detail: String },

    /// Impossible cell value
    Malformed {
        column: String,
        row: usize,
        value: String,
    },

    /// Missing cells where none are allowed
    Nulls {
        stage: String,
        family: String,
        column: String,
        remaining: usize,
        example_county: u32,
    },
}

impl Violation {
    pub fn into_error(self) -> AbtError {
        match self {
            Violation::Schema { column, detail } => AbtError::Schema { column, detail },
            Violation::Malformed { column, row, value } => {
                AbtError::MalformedValue { column, row, value }
            }
            Violation::Nulls {
                stage,
                family,
                column,
                remaining,
                example_county,
            } => AbtError::ResidualNull {
                stage,
                family,
                column,
                remaining,
                example_county,
            },
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Schema { column, detail } => write!(f, "`{column}`: {detail}"),
            Violation::Malformed { column, row, value } => {
                write!(f, "`{column}` row {row}: {value:?}")
            }
            Violation::Nulls {
                column,
                remaining,
                example_county,
                ..
            } => write!(
                f,
                "`{column}`: {remaining} missing cell(s), e.g. county {example_county}"
            ),
        }
    }
}

/// Validation result for a single check.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    /// Data is valid
    Valid,
    /// Data has minor issues (warnings)
    Warning(String),
    /// Data violates a pipeline invariant
    Error(Violation),
}

impl ValidationLevel {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationLevel::Valid)
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, ValidationLevel::Warning(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ValidationLevel::Error(_))
    }
}

impl fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationLevel::Valid => write!(f, "Valid"),
            ValidationLevel::Warning(msg) => write!(f, "Warning: {msg}"),
            ValidationLevel::Error(v) => write!(f, "Error: {v}"),
        }
    }
}

/// Aggregated validation result.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    results: Vec<(String, ValidationLevel)>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, check_name: &str, level: ValidationLevel) {
        self.results.push((check_name.to_string(), level));
    }

    /// Check if all validations passed (no errors or warnings).
    pub fn is_valid(&self) -> bool {
        self.results.iter().all(|(_, level)| level.is_valid())
    }

    pub fn has_errors(&self) -> bool {
        self.results.iter().any(|(_, level)| level.is_error())
    }

    pub fn has_warnings(&self) -> bool {
        self.results.iter().any(|(_, level)| level.is_warning())
    }

    pub fn warnings(&self) -> Vec<String> {
        self.results
            .iter()
            .filter_map(|(name, level)| match level {
                ValidationLevel::Warning(msg) => Some(format!("{name}: {msg}")),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.results
            .iter()
            .filter_map(|(name, level)| match level {
                ValidationLevel::Error(v) => Some(format!("{name}: {v}")),
                _ => None,
            })
            .collect()
    }

    pub fn all_results(&self) -> &[(String, ValidationLevel)] {
        &self.results
    }

    pub fn check_count(&self) -> usize {
        self.results.len()
    }

    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|(_, l)| l.is_valid()).count()
    }

    /// Log warnings, then fail on the first error.
    pub fn into_result(self) -> Result<ValidationResult> {
        for warning in self.warnings() {
            log::warn!("{warning}");
        }
        let first_error = self.results.iter().find_map(|(_, level)| match level {
            ValidationLevel::Error(v) => Some(v.clone()),
            _ => None,
        });
        match first_error {
            Some(violation) => Err(violation.into_error()),
            None => Ok(self),
        }
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let passed = self.passed_count();
        let total = self.check_count();
        writeln!(f, "Validation: {passed}/{total} checks passed")?;

        for (name, level) in &self.results {
            if !level.is_valid() {
                writeln!(f, "  - {name}: {level}")?;
            }
        }

        Ok(())
    }
}

/// Assert an exact row count at a checkpoint.
pub fn check_cardinality(stage: &str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(AbtError::Cardinality {
            stage: stage.to_string(),
            expected,
            actual,
        });
    }
    log::debug!("Cardinality at `{stage}`: {actual} rows");
    Ok(())
}

/// Panel validator for the stage boundaries.
#[derive(Debug, Clone, Default)]
pub struct PanelValidator;

impl PanelValidator {
    pub fn new() -> Self {
        Self
    }

    /// Entry checks, run before any transformation.
    pub fn validate_input(&self, panel: &Panel) -> ValidationResult {
        let mut result = ValidationResult::new();

        if panel.is_empty() {
            result.add(
                "non_empty",
                ValidationLevel::Error(Violation::Schema {
                    column: names::COUNTY_FIP.to_string(),
                    detail: "input has no rows".to_string(),
                }),
            );
            return result;
        }

        for series in COUNT_SERIES {
            check_cells(panel, series.source, &mut result, |v| {
                v.is_some_and(|x| x >= 0.0 && x.fract() == 0.0)
            });
        }
        check_cells(panel, names::POP_TOTAL, &mut result, |v| {
            v.is_some_and(|x| x > 0.0)
        });
        for column in AGE_COLUMNS {
            check_cells(panel, column, &mut result, |v| v.is_some_and(|x| x >= 0.0));
        }
        check_cells(panel, names::POP_DENSITY, &mut result, |v| {
            v.map_or(true, |x| x >= 0.0)
        });
        for column in [names::LABOR_FORCE, names::UNEMPLOYED] {
            check_cells(panel, column, &mut result, |v| v.map_or(true, |x| x >= 0.0));
        }
        for column in TESTING_COLUMNS.iter().filter(|c| panel.has_numeric(c)) {
            check_cells(panel, column, &mut result, |v| v.map_or(true, |x| x >= 0.0));
        }
        // Labels are never imputed.
        for column in [names::STATE, names::COUNTY] {
            self.check_labels(panel, column, &mut result);
        }

        self.check_unemployment_bound(panel, &mut result);
        result
    }

    /// No input column kept in the ABT may have a missing cell.
    pub fn validate_imputed(&self, panel: &Panel) -> ValidationResult {
        let mut result = ValidationResult::new();
        for def in input_registry().all() {
            if !matches!(def.role, ColumnRole::Complete | ColumnRole::Imputed) {
                continue;
            }
            if panel.has_numeric(def.name) {
                check_complete(panel, def.name, "imputation", def.family.name(), &mut result);
            }
        }
        result
    }

    /// Final checks on the trimmed table.
    pub fn validate_output(&self, panel: &Panel) -> ValidationResult {
        let mut result = ValidationResult::new();
        let edge: HashSet<String> = edge_reference_columns().into_iter().collect();

        for name in panel.numeric_names() {
            if !edge.contains(name) {
                check_complete(panel, name, "output", "output", &mut result);
            }
        }
        for name in panel.text_names() {
            let nulls = panel.text(name).map_or(0, |c| c.iter().filter(|v| v.is_none()).count());
            if nulls > 0 {
                result.add(
                    &format!("complete:{name}"),
                    ValidationLevel::Error(Violation::Schema {
                        column: name.to_string(),
                        detail: format!("{nulls} missing text cell(s) in output"),
                    }),
                );
            }
        }

        check_cells(panel, names::POLICY_CODE, &mut result, |v| {
            v.is_some_and(|x| {
                x >= 0.0 && x.fract() == 0.0 && PolicyPhase::from_code(x as u8).is_some()
            })
        });

        for series in COUNT_SERIES {
            self.check_monotone(panel, series.source, &mut result);
        }
        result
    }

    fn check_monotone(&self, panel: &Panel, column: &str, result: &mut ValidationResult) {
        let Some(values) = panel.numeric(column) else {
            return;
        };
        for span in panel.groups() {
            for i in span.start + 1..span.end {
                if let (Some(prev), Some(cur)) = (values[i - 1], values[i]) {
                    if cur < prev {
                        result.add(
                            &format!("monotone:{column}"),
                            ValidationLevel::Error(Violation::Malformed {
                                column: column.to_string(),
                                row: i,
                                value: format!("{cur} after {prev} in county {}", span.county_fip),
                            }),
                        );
                        return;
                    }
                }
            }
        }
        result.add(&format!("monotone:{column}"), ValidationLevel::Valid);
    }

    fn check_labels(&self, panel: &Panel, column: &str, result: &mut ValidationResult) {
        let Some(values) = panel.text(column) else {
            return;
        };
        let check = format!("labels:{column}");
        match values.iter().position(Option::is_none) {
            Some(row) => result.add(
                &check,
                ValidationLevel::Error(Violation::Schema {
                    column: column.to_string(),
                    detail: format!(
                        "{} missing label(s), first in county {}",
                        values.iter().filter(|v| v.is_none()).count(),
                        panel.county_fips()[row]
                    ),
                }),
            ),
            None => result.add(&check, ValidationLevel::Valid),
        }
    }

    fn check_unemployment_bound(&self, panel: &Panel, result: &mut ValidationResult) {
        let (Some(lf), Some(un)) = (
            panel.numeric(names::LABOR_FORCE),
            panel.numeric(names::UNEMPLOYED),
        ) else {
            return;
        };
        let over = lf
            .iter()
            .zip(un)
            .filter(|pair| matches!(pair, (Some(lf), Some(un)) if un > lf))
            .count();
        if over > 0 {
            result.add(
                "unemployment_bound",
                ValidationLevel::Warning(format!("{over} row(s) with unemployed > labor_force")),
            );
        } else {
            result.add("unemployment_bound", ValidationLevel::Valid);
        }
    }
}

/// Every present cell of `column` must satisfy `ok`; reports the first that does not.
fn check_cells<F>(panel: &Panel, column: &str, result: &mut ValidationResult, ok: F)
where
    F: Fn(Option<f64>) -> bool,
{
    let check = format!("values:{column}");
    let Some(values) = panel.numeric(column) else {
        result.add(
            &check,
            ValidationLevel::Error(Violation::Schema {
                column: column.to_string(),
                detail: "numeric column is missing".to_string(),
            }),
        );
        return;
    };
    match values.iter().position(|v| !ok(*v)) {
        Some(row) => result.add(
            &check,
            ValidationLevel::Error(Violation::Malformed {
                column: column.to_string(),
                row,
                value: values[row].map(|v| v.to_string()).unwrap_or_default(),
            }),
        ),
        None => result.add(&check, ValidationLevel::Valid),
    }
}

fn check_complete(
    panel: &Panel,
    column: &str,
    stage: &str,
    family: &str,
    result: &mut ValidationResult,
) {
    let check = format!("complete:{column}");
    match panel.first_null_county(column) {
        Some(county) => result.add(
            &check,
            ValidationLevel::Error(Violation::Nulls {
                stage: stage.to_string(),
                family: family.to_string(),
                column: column.to_string(),
                remaining: panel.null_count(column),
                example_county: county,
            }),
        ),
        None => result.add(&check, ValidationLevel::Valid),
    }
}
