//! Error taxonomy for the ABT pipeline.
//!
//! Every check in the pipeline is fatal. There is no recovery path: a stage
//! either hands a fully well-formed panel to the next stage or the run stops
//! with one of these errors and no output file is written.

use chrono::NaiveDate;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, AbtError>;

/// Fatal pipeline errors.
#[derive(Debug, Error)]
pub enum AbtError {
    /// An expected column is absent or unusable at pipeline entry.
    #[error("schema violation on column `{column}`: {detail}")]
    Schema { column: String, detail: String },

    /// A cell could not be parsed or holds an impossible value.
    #[error("malformed value in column `{column}` at row {row}: {value:?}")]
    MalformedValue {
        column: String,
        row: usize,
        value: String,
    },

    /// Row count changed at a checkpoint.
    #[error("cardinality violation at stage `{stage}`: expected {expected} rows, found {actual}")]
    Cardinality {
        stage: String,
        expected: usize,
        actual: usize,
    },

    /// Nulls survived a full imputation cascade (or appeared after it).
    #[error(
        "residual nulls at stage `{stage}`: {remaining} null cells in `{column}` ({family}), e.g. county {example_county}"
    )]
    ResidualNull {
        stage: String,
        family: String,
        column: String,
        remaining: usize,
        example_county: u32,
    },

    /// Resolved policy coverage has a hole.
    #[error("policy gap of {gap_days} days for county {county_fip} after {after}")]
    PolicyGap {
        county_fip: u32,
        gap_days: i64,
        after: NaiveDate,
    },

    /// Two rows share (county, date), so row order is ambiguous.
    #[error("duplicate date {date} for county {county_fip}")]
    DuplicateDate { county_fip: u32, date: NaiveDate },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("NumPy write error: {0}")]
    Npy(#[from] ndarray_npy::WriteNpyError),

    #[error("array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

impl AbtError {
    /// Shorthand for a schema violation.
    pub fn schema(column: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Schema {
            column: column.into(),
            detail: detail.into(),
        }
    }

    /// Short name of the failed check, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            AbtError::Schema { .. } | AbtError::MalformedValue { .. } => "schema",
            AbtError::Cardinality { .. } => "cardinality",
            AbtError::ResidualNull { .. } => "residual_null",
            AbtError::PolicyGap { .. } => "policy_gap",
            AbtError::DuplicateDate { .. } => "duplicate_date",
            AbtError::Config(_) => "config",
            AbtError::Io(_)
            | AbtError::Csv(_)
            | AbtError::Json(_)
            | AbtError::TomlDe(_)
            | AbtError::TomlSer(_)
            | AbtError::Npy(_)
            | AbtError::Shape(_) => "io",
        }
    }

    /// Pipeline stage the failure was raised at, when recorded.
    pub fn stage(&self) -> Option<&str> {
        match self {
            AbtError::Cardinality { stage, .. } | AbtError::ResidualNull { stage, .. } => {
                Some(stage)
            }
            AbtError::PolicyGap { .. } => Some("policy"),
            AbtError::Schema { .. } | AbtError::MalformedValue { .. } => Some("load"),
            _ => None,
        }
    }

    /// County the failure points at, when there is one.
    pub fn county(&self) -> Option<u32> {
        match self {
            AbtError::ResidualNull { example_county, .. } => Some(*example_county),
            AbtError::PolicyGap { county_fip, .. } | AbtError::DuplicateDate { county_fip, .. } => {
                Some(*county_fip)
            }
            _ => None,
        }
    }
}

impl From<String> for AbtError {
    fn from(msg: String) -> Self {
        AbtError::Config(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_county() {
        let err = AbtError::PolicyGap {
            county_fip: 1001,
            gap_days: 3,
            after: NaiveDate::from_ymd_opt(2020, 4, 1).unwrap(),
        };
        assert_eq!(err.kind(), "policy_gap");
        assert_eq!(err.county(), Some(1001));
        assert!(err.to_string().contains("1001"));
        assert_eq!(err.stage(), Some("policy"));

        let err = AbtError::schema("date", "missing");
        assert_eq!(err.kind(), "schema");
        assert_eq!(err.county(), None);
    }

    #[test]
    fn test_config_from_string() {
        let err: AbtError = "window must be > 0".to_string().into();
        assert!(matches!(err, AbtError::Config(_)));
    }
}
