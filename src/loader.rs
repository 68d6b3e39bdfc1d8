//! Delimited-text loader.
//!
//! Reads the raw county-day table into a [`Panel`]. Only declared columns
//! are kept; undeclared headers are skipped. A missing required column or an
//! unparsable cell aborts the load before any transformation runs.
//!
//! Missing cells are the empty string and the usual NA spellings
//! (`NA`, `NaN`, `null`, `None` in numeric columns).

use crate::error::{AbtError, Result};
use crate::panel::Panel;
use crate::schema::{input_registry, names, ColumnDef, ColumnKind};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y%m%d"];

/// Reads delimited text into a [`Panel`].
#[derive(Debug, Clone)]
pub struct PanelLoader {
    delimiter: u8,
}

impl Default for PanelLoader {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl PanelLoader {
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }

    /// Load a panel from a file.
    pub fn load_path<P: AsRef<Path>>(&self, path: P) -> Result<Panel> {
        let file = std::fs::File::open(path.as_ref())?;
        log::info!("Loading panel from {}", path.as_ref().display());
        self.load_reader(file)
    }

    /// Load a panel from any reader.
    pub fn load_reader<R: Read>(&self, reader: R) -> Result<Panel> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let index: HashMap<&str, usize> = headers.iter().enumerate().map(|(i, h)| (h, i)).collect();

        let registry = input_registry();
        for def in registry.all() {
            if def.is_required() && !index.contains_key(def.name) {
                return Err(AbtError::schema(def.name, "required column is missing"));
            }
        }
        let present: Vec<(ColumnDef, usize)> = registry
            .all()
            .iter()
            .filter(|def| !is_key(def.name))
            .filter_map(|def| index.get(def.name).map(|&i| (*def, i)))
            .collect();
        let skipped = headers.len().saturating_sub(present.len() + 3);
        if skipped > 0 {
            log::debug!("Skipping {skipped} undeclared column(s)");
        }

        let fip_idx = index[names::COUNTY_FIP];
        let state_idx = index[names::STATE_CODE];
        let date_idx = index[names::DATE];

        let mut fips = Vec::new();
        let mut states = Vec::new();
        let mut dates = Vec::new();
        let mut numeric: Vec<Vec<Option<f64>>> = Vec::new();
        let mut text: Vec<Vec<Option<String>>> = Vec::new();
        for (def, _) in &present {
            match def.kind {
                ColumnKind::Numeric => numeric.push(Vec::new()),
                ColumnKind::Text => text.push(Vec::new()),
            }
        }

        for (row, record) in rdr.records().enumerate() {
            let record = record?;
            let cell = |i: usize| record.get(i).unwrap_or("");

            fips.push(parse_fip(cell(fip_idx), row)?);
            let state = cell(state_idx);
            if state.is_empty() {
                return Err(malformed(names::STATE_CODE, row, state));
            }
            states.push(state.to_string());
            dates.push(parse_date(cell(date_idx), row)?);

            let (mut n, mut t) = (0, 0);
            for (def, i) in &present {
                let raw = cell(*i);
                match def.kind {
                    ColumnKind::Numeric => {
                        numeric[n].push(parse_number(raw).map_err(|_| malformed(def.name, row, raw))?);
                        n += 1;
                    }
                    ColumnKind::Text => {
                        text[t].push((!raw.is_empty()).then(|| raw.to_string()));
                        t += 1;
                    }
                }
            }
        }

        let mut panel = Panel::new(fips, states, dates)?;
        let (mut numeric, mut text) = (numeric.into_iter(), text.into_iter());
        for (def, _) in &present {
            match def.kind {
                ColumnKind::Numeric => {
                    if let Some(col) = numeric.next() {
                        panel.set_numeric(def.name, col)?;
                    }
                }
                ColumnKind::Text => {
                    if let Some(col) = text.next() {
                        panel.set_text(def.name, col)?;
                    }
                }
            }
        }

        log::info!(
            "Loaded {} rows, {} numeric and {} text columns",
            panel.len(),
            panel.numeric_names().count(),
            panel.text_names().count()
        );
        Ok(panel)
    }
}

fn is_key(name: &str) -> bool {
    matches!(name, names::COUNTY_FIP | names::STATE_CODE | names::DATE)
}

fn malformed(column: &str, row: usize, value: &str) -> AbtError {
    AbtError::MalformedValue {
        column: column.to_string(),
        row,
        value: value.to_string(),
    }
}

fn parse_fip(raw: &str, row: usize) -> Result<u32> {
    if let Ok(v) = raw.parse::<u32>() {
        return Ok(v);
    }
    // Some upstream exports write FIPS codes as floats.
    match raw.parse::<f64>() {
        Ok(v) if v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 => Ok(v as u32),
        _ => Err(malformed(names::COUNTY_FIP, row, raw)),
    }
}

fn parse_date(raw: &str, row: usize) -> Result<NaiveDate> {
    // Timestamps like "2020-04-01 00:00:00" keep only the date part.
    let day = raw.split_whitespace().next().unwrap_or("");
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(day, fmt).ok())
        .ok_or_else(|| malformed(names::DATE, row, raw))
}

/// Parse a numeric cell; `Ok(None)` for a missing value.
pub fn parse_number(raw: &str) -> std::result::Result<Option<f64>, std::num::ParseFloatError> {
    if raw.is_empty() || matches!(raw, "NA" | "N/A" | "NaN" | "nan" | "null" | "None") {
        return Ok(None);
    }
    let v: f64 = raw.parse()?;
    Ok(v.is_finite().then_some(v))
}
