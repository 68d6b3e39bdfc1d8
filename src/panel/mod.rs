//! Columnar County-Day Panel
//!
//! The in-memory table every stage consumes and returns. Keys are stored
//! as typed columns; every other column is either numeric
//! (`Vec<Option<f64>>`) or text (`Vec<Option<String>>`), with `None`
//! meaning a missing cell.
//!
//! # Ordering
//!
//! Stages that work per county assume rows are sorted by
//! `(county_fip, date)` with one row per day. [`Panel::sorted`] establishes
//! and checks that precondition; [`Panel::groups`] then returns the row
//! span of each county.
//!
//! ```text
//! rows:   0   1   2   3   4   5
//! fip:  1001 1001 1001 1003 1003 1003
//! date:  d0   d1   d2   d0   d1   d2
//!       └──── span 0 ────┘└──── span 1 ────┘
//! ```

mod groups;

pub use groups::{collect_column, group_spans, map_groups, GroupSpan};

use crate::error::{AbtError, Result};
use crate::schema::names;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// A numeric column; `None` is a missing cell.
pub type NumericColumn = Vec<Option<f64>>;

/// A text column; `None` is a missing cell.
pub type TextColumn = Vec<Option<String>>;

/// Columnar county-day table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Panel {
    county_fip: Vec<u32>,
    state_code: Vec<String>,
    date: Vec<NaiveDate>,
    numeric: BTreeMap<String, NumericColumn>,
    text: BTreeMap<String, TextColumn>,
}

impl Panel {
    /// Create a panel from its key columns.
    pub fn new(county_fip: Vec<u32>, state_code: Vec<String>, date: Vec<NaiveDate>) -> Result<Self> {
        let rows = county_fip.len();
        if state_code.len() != rows {
            return Err(AbtError::schema(
                names::STATE_CODE,
                format!("{} values for {rows} rows", state_code.len()),
            ));
        }
        if date.len() != rows {
            return Err(AbtError::schema(
                names::DATE,
                format!("{} values for {rows} rows", date.len()),
            ));
        }
        Ok(Self {
            county_fip,
            state_code,
            date,
            numeric: BTreeMap::new(),
            text: BTreeMap::new(),
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.county_fip.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.county_fip.is_empty()
    }

    pub fn county_fips(&self) -> &[u32] {
        &self.county_fip
    }

    pub fn state_codes(&self) -> &[String] {
        &self.state_code
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.date
    }

    // ------------------------------------------------------------------
    // Numeric columns
    // ------------------------------------------------------------------

    pub fn numeric(&self, name: &str) -> Option<&[Option<f64>]> {
        self.numeric.get(name).map(Vec::as_slice)
    }

    /// Numeric column that the caller cannot proceed without.
    pub fn require_numeric(&self, name: &str) -> Result<&[Option<f64>]> {
        self.numeric(name)
            .ok_or_else(|| AbtError::schema(name, "numeric column is missing"))
    }

    pub fn has_numeric(&self, name: &str) -> bool {
        self.numeric.contains_key(name)
    }

    /// Insert or replace a numeric column.
    pub fn set_numeric(&mut self, name: impl Into<String>, values: NumericColumn) -> Result<()> {
        let name = name.into();
        self.check_len(&name, values.len())?;
        self.numeric.insert(name, values);
        Ok(())
    }

    /// Insert or replace a column with no missing cells.
    pub fn set_dense(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        self.set_numeric(name, values.into_iter().map(Some).collect())
    }

    pub fn remove_numeric(&mut self, name: &str) -> Option<NumericColumn> {
        self.numeric.remove(name)
    }

    /// Numeric column names in output order.
    pub fn numeric_names(&self) -> impl Iterator<Item = &str> {
        self.numeric.keys().map(String::as_str)
    }

    // ------------------------------------------------------------------
    // Text columns
    // ------------------------------------------------------------------

    pub fn text(&self, name: &str) -> Option<&[Option<String>]> {
        self.text.get(name).map(Vec::as_slice)
    }

    pub fn has_text(&self, name: &str) -> bool {
        self.text.contains_key(name)
    }

    pub fn set_text(&mut self, name: impl Into<String>, values: TextColumn) -> Result<()> {
        let name = name.into();
        self.check_len(&name, values.len())?;
        self.text.insert(name, values);
        Ok(())
    }

    pub fn remove_text(&mut self, name: &str) -> Option<TextColumn> {
        self.text.remove(name)
    }

    pub fn text_names(&self) -> impl Iterator<Item = &str> {
        self.text.keys().map(String::as_str)
    }

    fn check_len(&self, name: &str, len: usize) -> Result<()> {
        if len != self.len() {
            return Err(AbtError::schema(
                name,
                format!("column has {len} values, panel has {} rows", self.len()),
            ));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Nulls
    // ------------------------------------------------------------------

    /// Number of missing cells in a numeric column (0 if absent).
    pub fn null_count(&self, name: &str) -> usize {
        self.numeric(name)
            .map(|col| col.iter().filter(|v| v.is_none()).count())
            .unwrap_or(0)
    }

    /// County of the first missing cell in a numeric column.
    pub fn first_null_county(&self, name: &str) -> Option<u32> {
        self.numeric(name)?
            .iter()
            .position(Option::is_none)
            .map(|i| self.county_fip[i])
    }

    // ------------------------------------------------------------------
    // Row operations
    // ------------------------------------------------------------------

    /// Sort rows by `(county_fip, date)` and check the per-county series.
    ///
    /// Fails with [`AbtError::DuplicateDate`] when a county repeats a date and
    /// with a schema violation when a county's dates are not contiguous.
    pub fn sorted(self) -> Result<Panel> {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by_key(|&i| (self.county_fip[i], self.date[i]));
        let already_sorted = order.iter().enumerate().all(|(pos, &i)| pos == i);
        let panel = if already_sorted { self } else { self.take(&order) };

        for span in panel.groups() {
            for i in span.start + 1..span.end {
                let gap = (panel.date[i] - panel.date[i - 1]).num_days();
                if gap == 0 {
                    return Err(AbtError::DuplicateDate {
                        county_fip: span.county_fip,
                        date: panel.date[i],
                    });
                }
                if gap != 1 {
                    return Err(AbtError::schema(
                        names::DATE,
                        format!(
                            "county {} skips {} day(s) after {}",
                            span.county_fip,
                            gap - 1,
                            panel.date[i - 1]
                        ),
                    ));
                }
            }
        }
        Ok(panel)
    }

    /// Row spans per county. Assumes the panel is sorted.
    pub fn groups(&self) -> Vec<GroupSpan> {
        group_spans(&self.county_fip)
    }

    /// Number of distinct counties in a sorted panel.
    pub fn group_count(&self) -> usize {
        self.groups().len()
    }

    /// New panel holding the given rows in the given order.
    pub fn take(&self, rows: &[usize]) -> Panel {
        fn pick<T: Clone>(col: &[T], rows: &[usize]) -> Vec<T> {
            rows.iter().map(|&i| col[i].clone()).collect()
        }
        Panel {
            county_fip: pick(&self.county_fip, rows),
            state_code: pick(&self.state_code, rows),
            date: pick(&self.date, rows),
            numeric: self
                .numeric
                .iter()
                .map(|(k, v)| (k.clone(), pick(v, rows)))
                .collect(),
            text: self
                .text
                .iter()
                .map(|(k, v)| (k.clone(), pick(v, rows)))
                .collect(),
        }
    }

    /// Keep rows where `keep` is true, preserving order.
    pub fn filter_rows(&self, keep: &[bool]) -> Panel {
        let rows: Vec<usize> = keep
            .iter()
            .enumerate()
            .filter_map(|(i, &k)| k.then_some(i))
            .collect();
        self.take(&rows)
    }
}
