//! Column Schema Module
//!
//! Declares every column the pipeline reads or writes, grouped into
//! families. Imputation cascades and completeness checks are driven from
//! these declarations rather than from column-name patterns.
//!
//! # Example
//!
//! ```ignore
//! use county_abt::schema::{input_registry, ColumnFamily};
//!
//! let registry = input_registry();
//! for col in registry.by_family(ColumnFamily::Mobility) {
//!     println!("{}: {}", col.name, col.description);
//! }
//! ```

mod column_def;
mod registry;

pub use column_def::{ColumnDef, ColumnFamily, ColumnKind, ColumnRegistry, ColumnRole, Presence};
pub use registry::{
    count_feature_columns, edge_reference_columns, full_registry, input_registry, names,
    CountSeries, AGE_BANDS, AGE_COLUMNS, COUNT_SERIES, DEMOGRAPHIC_IMPUTED_COLUMNS,
    DENSITY_COLUMNS, ECONOMIC_COLUMNS, INPUT_COLUMNS, MOBILITY_COLUMNS, POLICY_FLAGS,
    TESTING_COLUMNS, WEATHER_COLUMNS,
};

/// Current schema version, recorded in export metadata.
pub const SCHEMA_VERSION: &str = "1.0.0";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_version() {
        assert!(!SCHEMA_VERSION.is_empty());
    }

    #[test]
    fn test_imputed_families_have_columns() {
        let registry = input_registry();
        for family in ColumnFamily::imputed() {
            assert!(
                !registry.by_family(*family).is_empty(),
                "family {family} has no columns"
            );
        }
    }

    #[test]
    fn test_no_duplicate_names() {
        let registry = full_registry();
        let names = registry.names();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(names.len(), sorted.len());
    }

    #[test]
    fn test_registry_lookup() {
        let registry = input_registry();
        let col = registry.get(names::TMPF_MEAN).unwrap();
        assert_eq!(col.family, ColumnFamily::Weather);
        assert_eq!(col.kind, ColumnKind::Numeric);
        assert!(col.must_be_complete());
        assert!(!registry.get(names::PHASE_1).unwrap().must_be_complete());
        assert!(registry.get("not_a_column").is_none());
    }
}
