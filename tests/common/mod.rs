//! Synthetic county-day tables for integration tests.

#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use county_abt::names;
use std::collections::BTreeMap;

/// Every input header, in the order the fixtures write them.
pub const HEADERS: &[&str] = &[
    names::COUNTY_FIP,
    names::STATE_CODE,
    names::DATE,
    names::STATE,
    names::COUNTY,
    names::CONFIRMED,
    names::DEATHS,
    names::TRAVEL_LIMIT,
    names::STAY_HOME,
    names::EDUCATIONAL_FAC,
    names::PHASE_1,
    names::PHASE_2,
    names::PHASE_3,
    names::RETAIL_AND_RECREATION,
    names::GROCERY_AND_PHARMACY,
    names::PARKS,
    names::TRANSIT_STATIONS,
    names::WORKPLACES,
    names::RESIDENTIAL,
    names::TMPF_MEAN,
    names::RELH_MEAN,
    names::LABOR_FORCE,
    names::UNEMPLOYED,
    names::POP_TOTAL,
    names::MEDIAN_HH_INCOME,
    names::GENDER_FEMALE,
    names::RACE_MINORITY,
    names::AGE_LE_24,
    names::AGE_25_34,
    names::AGE_35_44,
    names::AGE_45_54,
    names::AGE_55_64,
    names::AGE_65_74,
    names::AGE_75_84,
    names::AGE_85_GE,
    names::POP_DENSITY,
];

/// Optional headers written only when some row carries them.
pub const OPTIONAL_HEADERS: &[&str] = &[names::COV_POS_TESTS, names::COV_TOTAL_TESTS];

pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 3, 1).unwrap()
}

/// One input row as header -> raw cell text.
#[derive(Debug, Clone)]
pub struct Row {
    pub cells: BTreeMap<&'static str, String>,
}

impl Row {
    pub fn set(&mut self, column: &'static str, value: impl ToString) -> &mut Self {
        self.cells.insert(column, value.to_string());
        self
    }

    pub fn clear(&mut self, column: &'static str) -> &mut Self {
        self.cells.insert(column, String::new());
        self
    }
}

/// `days` complete rows for one county starting at [`start_date`].
///
/// Cumulative confirmed cases grow by 2 a day, deaths by 1 every third day.
/// A stay-home order is active from day 3.
pub fn county_rows(fip: u32, state: &str, days: usize) -> Vec<Row> {
    let pop = 10_000.0;
    (0..days)
        .map(|i| {
            let mut cells = BTreeMap::new();
            let date = start_date() + Duration::days(i as i64);
            let values: Vec<(&'static str, String)> = vec![
                (names::COUNTY_FIP, fip.to_string()),
                (names::STATE_CODE, state.to_string()),
                (names::DATE, date.format("%Y-%m-%d").to_string()),
                (names::STATE, format!("State {state}")),
                (names::COUNTY, format!("County {fip}")),
                (names::CONFIRMED, (2 * i).to_string()),
                (names::DEATHS, (i / 3).to_string()),
                (names::TRAVEL_LIMIT, "1".to_string()),
                (names::STAY_HOME, if i >= 3 { "1" } else { "0" }.to_string()),
                (names::EDUCATIONAL_FAC, "1".to_string()),
                (names::PHASE_1, "0".to_string()),
                (names::PHASE_2, "0".to_string()),
                (names::PHASE_3, "0".to_string()),
                (names::RETAIL_AND_RECREATION, format!("{}", -10.0 - (i % 7) as f64)),
                (names::GROCERY_AND_PHARMACY, format!("{}", 5.0 + (i % 3) as f64)),
                (names::PARKS, format!("{}", 20.0 - (i % 5) as f64)),
                (names::TRANSIT_STATIONS, "-30".to_string()),
                (names::WORKPLACES, format!("{}", -25.0 + (i % 2) as f64)),
                (names::RESIDENTIAL, "12".to_string()),
                (names::TMPF_MEAN, format!("{}", 50.0 + i as f64)),
                (names::RELH_MEAN, format!("{}", 60.0 + (i % 4) as f64)),
                (names::LABOR_FORCE, "5000".to_string()),
                (names::UNEMPLOYED, "250".to_string()),
                (names::POP_TOTAL, pop.to_string()),
                (names::MEDIAN_HH_INCOME, "50000".to_string()),
                (names::GENDER_FEMALE, "0.51".to_string()),
                (names::RACE_MINORITY, "0.2".to_string()),
                (names::AGE_LE_24, "3000".to_string()),
                (names::AGE_25_34, "1200".to_string()),
                (names::AGE_35_44, "1200".to_string()),
                (names::AGE_45_54, "1200".to_string()),
                (names::AGE_55_64, "1200".to_string()),
                (names::AGE_65_74, "1000".to_string()),
                (names::AGE_75_84, "700".to_string()),
                (names::AGE_85_GE, "500".to_string()),
                (names::POP_DENSITY, format!("{}", 50 + (fip % 7) * 10)),
            ];
            cells.extend(values);
            Row { cells }
        })
        .collect()
}

/// Render rows as comma-separated text with a header line.
pub fn to_csv(rows: &[Row]) -> String {
    let headers: Vec<&str> = HEADERS
        .iter()
        .chain(
            OPTIONAL_HEADERS
                .iter()
                .filter(|h| rows.iter().any(|r| r.cells.contains_key(*h))),
        )
        .copied()
        .collect();
    let mut out = headers.join(",");
    out.push('\n');
    for row in rows {
        let line: Vec<&str> = headers
            .iter()
            .map(|h| row.cells.get(h).map(String::as_str).unwrap_or(""))
            .collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

/// Three counties in two states, `days` rows each.
pub fn standard_rows(days: usize) -> Vec<Row> {
    let mut rows = county_rows(1001, "AL", days);
    rows.extend(county_rows(1003, "AL", days));
    rows.extend(county_rows(13001, "GA", days));
    rows
}

/// Parse an exported table into header and records.
pub fn read_table(text: &str) -> (Vec<String>, Vec<Vec<String>>) {
    let mut lines = text.lines();
    let header = lines
        .next()
        .unwrap()
        .split(',')
        .map(str::to_string)
        .collect();
    let records = lines
        .map(|l| l.split(',').map(str::to_string).collect())
        .collect();
    (header, records)
}

/// Values of one column of an exported table.
pub fn column<'a>(header: &[String], records: &'a [Vec<String>], name: &str) -> Vec<&'a str> {
    let idx = header
        .iter()
        .position(|h| h == name)
        .unwrap_or_else(|| panic!("column {name} not in output"));
    records.iter().map(|r| r[idx].as_str()).collect()
}
