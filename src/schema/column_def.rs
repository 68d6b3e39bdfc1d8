//! Column definitions and schema types.
//!
//! This module defines the core types for column metadata:
//! - `ColumnFamily`: which feature family a column belongs to
//! - `ColumnRole`: how the column is treated by the null checks
//! - `ColumnDef`: metadata for a single column
//! - `ColumnRegistry`: lookup over a set of column definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Semantic family of a column.
///
/// Imputation families share one fill cascade; the remaining families are
/// structural (keys, counts, policy) or produced by the feature stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ColumnFamily {
    /// Identifying keys: county, state, date and their labels
    Key,

    /// Cumulative case/death counts
    Cumulative,

    /// Raw policy stage flags and the resolved policy
    Policy,

    /// Google mobility, percent change from baseline
    Mobility,

    /// Daily temperature and humidity
    Weather,

    /// Labor force and unemployment counts
    Economic,

    /// ACS-derived county attributes
    Demographic,

    /// Population per unit land area
    Density,

    /// Cumulative COVID test counts
    Testing,

    /// Outputs of the feature stage
    Derived,
}

impl ColumnFamily {
    /// Families that run through an imputation cascade, in pipeline order.
    pub fn imputed() -> &'static [ColumnFamily] {
        &[
            ColumnFamily::Mobility,
            ColumnFamily::Weather,
            ColumnFamily::Economic,
            ColumnFamily::Demographic,
            ColumnFamily::Density,
            ColumnFamily::Testing,
        ]
    }

    /// Display name for this family.
    pub fn name(&self) -> &'static str {
        match self {
            ColumnFamily::Key => "key",
            ColumnFamily::Cumulative => "cumulative",
            ColumnFamily::Policy => "policy",
            ColumnFamily::Mobility => "mobility",
            ColumnFamily::Weather => "weather",
            ColumnFamily::Economic => "economic",
            ColumnFamily::Demographic => "demographic",
            ColumnFamily::Density => "density",
            ColumnFamily::Testing => "testing",
            ColumnFamily::Derived => "derived",
        }
    }
}

impl std::fmt::Display for ColumnFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Storage kind of a column in the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    Numeric,
    Text,
}

/// How a column is treated by completeness checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnRole {
    /// Must be complete from load onwards
    Complete,

    /// May be null on input; complete after its family's cascade
    Imputed,

    /// Raw input consumed by a stage and not written to the ABT
    RawInput,

    /// Derived; complete after the edge trim
    Feature,

    /// Derived look-ahead/look-back reference; null where its window leaves the series
    EdgeReference,
}

/// Whether the loader insists on a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Presence {
    Required,
    Optional,
}

/// Definition of a single column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColumnDef {
    /// Column header in the input/output table
    pub name: &'static str,

    pub family: ColumnFamily,

    pub kind: ColumnKind,

    pub role: ColumnRole,

    pub presence: Presence,

    /// Human-readable description
    pub description: &'static str,
}

impl ColumnDef {
    pub const fn numeric(
        name: &'static str,
        family: ColumnFamily,
        role: ColumnRole,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            family,
            kind: ColumnKind::Numeric,
            role,
            presence: Presence::Required,
            description,
        }
    }

    pub const fn text(
        name: &'static str,
        family: ColumnFamily,
        role: ColumnRole,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            family,
            kind: ColumnKind::Text,
            role,
            presence: Presence::Required,
            description,
        }
    }

    /// Mark the column as optional on input.
    pub const fn optional(mut self) -> Self {
        self.presence = Presence::Optional;
        self
    }

    pub fn is_required(&self) -> bool {
        self.presence == Presence::Required
    }

    /// Whether the column must be null-free in the final ABT.
    pub fn must_be_complete(&self) -> bool {
        matches!(
            self.role,
            ColumnRole::Complete | ColumnRole::Imputed | ColumnRole::Feature
        )
    }
}

/// Lookup over a fixed set of column definitions.
#[derive(Debug, Clone)]
pub struct ColumnRegistry {
    columns: Vec<ColumnDef>,
    name_index: HashMap<&'static str, usize>,
}

impl ColumnRegistry {
    /// Build a registry from definitions. Later duplicates are ignored.
    pub fn new(defs: impl IntoIterator<Item = ColumnDef>) -> Self {
        let mut columns = Vec::new();
        let mut name_index = HashMap::new();
        for def in defs {
            if name_index.contains_key(def.name) {
                continue;
            }
            name_index.insert(def.name, columns.len());
            columns.push(def);
        }
        Self {
            columns,
            name_index,
        }
    }

    pub fn get(&self, name: &str) -> Option<&ColumnDef> {
        self.name_index.get(name).map(|&i| &self.columns[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.name_index.contains_key(name)
    }

    pub fn all(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Columns belonging to a family, in declaration order.
    pub fn by_family(&self, family: ColumnFamily) -> Vec<&ColumnDef> {
        self.columns.iter().filter(|c| c.family == family).collect()
    }

    /// Column names in declaration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }
}
