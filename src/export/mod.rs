//! Table export.
//!
//! Writes the finished panel as delimited text and, optionally, as a NumPy
//! feature matrix for Python consumers.
//!
//! # Formats
//!
//! - CSV: one row per (county, date), key columns first, then text columns,
//!   then numeric columns in name order. Missing cells are empty.
//! - NumPy (.npy): `features.npy` \[N_rows, N_numeric\] with NaN for missing
//!   cells, plus `metadata.json` naming the columns.
//!
//! Both writers stage output in a sibling file and rename it into place, so
//! a failed run never leaves a partial table at the target path.
//!
//! # Example
//!
//! ```ignore
//! use county_abt::export::{CsvExporter, NumpyExporter};
//!
//! CsvExporter::new(b',').write(&output.panel, "abt.csv")?;
//! NumpyExporter::new("abt_npy").export(&output.panel)?;
//! ```

use crate::error::Result;
use crate::panel::Panel;
use crate::schema::{names, SCHEMA_VERSION};
use ndarray::Array2;
use ndarray_npy::WriteNpyExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Column order of an exported table.
pub fn column_order(panel: &Panel) -> Vec<String> {
    let mut columns = vec![
        names::COUNTY_FIP.to_string(),
        names::STATE_CODE.to_string(),
        names::DATE.to_string(),
    ];
    columns.extend(panel.text_names().map(str::to_string));
    columns.extend(panel.numeric_names().map(str::to_string));
    columns
}

/// Path of the staging file for `target`.
fn staging_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    target.with_file_name(name)
}

/// Delimited-text writer.
#[derive(Debug, Clone)]
pub struct CsvExporter {
    delimiter: u8,
}

impl Default for CsvExporter {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvExporter {
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }

    /// Write the panel to `path`. Returns the number of columns written.
    pub fn write<P: AsRef<Path>>(&self, panel: &Panel, path: P) -> Result<usize> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let staged = staging_path(path);
        let columns = self.write_to(panel, File::create(&staged)?);
        let columns = match columns {
            Ok(n) => n,
            Err(e) => {
                let _ = fs::remove_file(&staged);
                return Err(e);
            }
        };
        fs::rename(&staged, path)?;

        log::info!(
            "Exported table: {} [{} rows × {} columns]",
            path.display(),
            panel.len(),
            columns
        );
        Ok(columns)
    }

    /// Write the panel to any writer.
    pub fn write_to<W: std::io::Write>(&self, panel: &Panel, writer: W) -> Result<usize> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(writer);

        let header = column_order(panel);
        wtr.write_record(&header)?;

        let text: Vec<&[Option<String>]> = panel
            .text_names()
            .filter_map(|n| panel.text(n))
            .collect();
        let numeric: Vec<&[Option<f64>]> = panel
            .numeric_names()
            .filter_map(|n| panel.numeric(n))
            .collect();

        let mut record: Vec<String> = Vec::with_capacity(header.len());
        for row in 0..panel.len() {
            record.clear();
            record.push(panel.county_fips()[row].to_string());
            record.push(panel.state_codes()[row].clone());
            record.push(panel.dates()[row].format("%Y-%m-%d").to_string());
            for column in &text {
                record.push(column[row].clone().unwrap_or_default());
            }
            for column in &numeric {
                record.push(column[row].map(format_number).unwrap_or_default());
            }
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(header.len())
    }
}

/// Shortest round-trip representation; integral values print without a fraction.
fn format_number(v: f64) -> String {
    if v == 0.0 {
        // Normalizes -0.0.
        "0".to_string()
    } else {
        v.to_string()
    }
}

/// Metadata about an exported feature matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportMetadata {
    /// Number of rows (county-days)
    pub n_rows: usize,

    /// Number of numeric columns
    pub n_features: usize,

    /// Column names in matrix order
    pub feature_names: Vec<String>,

    /// Number of counties
    pub n_counties: usize,

    pub schema_version: String,

    /// Export timestamp
    pub export_timestamp: String,
}

/// NumPy exporter - exports numeric columns to .npy for Python.
pub struct NumpyExporter {
    output_dir: PathBuf,
}

impl NumpyExporter {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    /// Export the numeric columns of a panel.
    ///
    /// Creates:
    /// - features.npy: \[N_rows, N_features\] array, NaN where missing
    /// - metadata.json: column names and shape
    pub fn export(&self, panel: &Panel) -> Result<ExportMetadata> {
        fs::create_dir_all(&self.output_dir)?;

        let feature_names: Vec<String> = panel.numeric_names().map(str::to_string).collect();
        let columns: Vec<&[Option<f64>]> = feature_names
            .iter()
            .filter_map(|n| panel.numeric(n))
            .collect();
        let rows = panel.len();
        let cols = columns.len();

        let mut flat = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            flat.extend(columns.iter().map(|c| c[row].unwrap_or(f64::NAN)));
        }
        let array = Array2::from_shape_vec((rows, cols), flat)?;

        let path = self.output_dir.join("features.npy");
        let staged = staging_path(&path);
        array.write_npy(BufWriter::new(File::create(&staged)?))?;
        fs::rename(&staged, &path)?;
        log::info!(
            "Exported features: {} [{} rows × {} features]",
            path.display(),
            rows,
            cols
        );

        let metadata = ExportMetadata {
            n_rows: rows,
            n_features: cols,
            feature_names,
            n_counties: panel.group_count(),
            schema_version: SCHEMA_VERSION.to_string(),
            export_timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let path = self.output_dir.join("metadata.json");
        serde_json::to_writer_pretty(BufWriter::new(File::create(&path)?), &metadata)?;
        log::info!("Exported metadata: {}", path.display());

        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn panel() -> Panel {
        let d = |day| NaiveDate::from_ymd_opt(2020, 4, day).unwrap();
        let mut p = Panel::new(
            vec![1001, 1001, 1003],
            vec!["AL".to_string(); 3],
            vec![d(1), d(2), d(1)],
        )
        .unwrap();
        p.set_numeric("b_value", vec![Some(1.5), None, Some(-0.0)])
            .unwrap();
        p.set_dense("a_value", vec![1.0, 2.0, 3.0]).unwrap();
        p.set_text(
            names::POLICY,
            vec![
                Some("stay_home".to_string()),
                Some("phase_1".to_string()),
                Some("none_issued".to_string()),
            ],
        )
        .unwrap();
        p
    }

    #[test]
    fn test_column_order() {
        assert_eq!(
            column_order(&panel()),
            vec!["county_fip", "state_code", "date", "policy", "a_value", "b_value"]
        );
    }

    #[test]
    fn test_csv_contents() {
        let mut buf = Vec::new();
        CsvExporter::default().write_to(&panel(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "county_fip,state_code,date,policy,a_value,b_value");
        assert_eq!(lines[1], "1001,AL,2020-04-01,stay_home,1,1.5");
        assert_eq!(lines[2], "1001,AL,2020-04-02,phase_1,2,");
        assert_eq!(lines[3], "1003,AL,2020-04-01,none_issued,3,0");
    }

    #[test]
    fn test_csv_write_leaves_no_staging_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("abt.csv");
        let columns = CsvExporter::new(b'\t').write(&panel(), &path).unwrap();
        assert_eq!(columns, 6);
        assert!(path.exists());
        assert!(!staging_path(&path).exists());
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("county_fip\tstate_code"));
    }

    #[test]
    fn test_numpy_export() {
        let dir = tempdir().unwrap();
        let metadata = NumpyExporter::new(dir.path()).export(&panel()).unwrap();
        assert_eq!(metadata.n_rows, 3);
        assert_eq!(metadata.n_features, 2);
        assert_eq!(metadata.feature_names, vec!["a_value", "b_value"]);
        assert_eq!(metadata.n_counties, 2);
        assert!(dir.path().join("features.npy").exists());
        assert!(dir.path().join("metadata.json").exists());
    }
}
