//! Grouping keys for fallback statistics.
//!
//! A [`KeySpec`] names which dimensions a fallback level groups by. Each row
//! maps to a [`GroupKey`] in which the unused dimensions are zeroed, so one
//! hash-map shape serves every level of every cascade.

use crate::error::{AbtError, Result};
use crate::panel::Panel;
use crate::schema::names;
use ahash::AHashMap;
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// MMWR epidemiological week: `(epi_year, week)` with Sunday-start weeks.
///
/// Week 1 is the first week with at least four days in the calendar year,
/// i.e. the week that contains January 4th.
pub fn epi_week(date: NaiveDate) -> (i32, u32) {
    let year = date.year();
    let start = epi_year_start(year);
    let (epi_year, start) = if date < start {
        (year - 1, epi_year_start(year - 1))
    } else {
        let next = epi_year_start(year + 1);
        if date >= next {
            (year + 1, next)
        } else {
            (year, start)
        }
    };
    let week = (date - start).num_days() / 7 + 1;
    (epi_year, week as u32)
}

/// Sunday on or before January 4th.
fn epi_year_start(year: i32) -> NaiveDate {
    // January 4th exists in every year chrono can represent here.
    let jan4 = NaiveDate::from_ymd_opt(year, 1, 4).unwrap_or(NaiveDate::MIN);
    jan4 - Duration::days(i64::from(jan4.weekday().num_days_from_sunday()))
}

/// Day of week, 0 = Sunday.
#[inline]
pub fn day_of_week(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_sunday()
}

/// Dimensions a fallback level groups by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct KeySpec {
    pub county: bool,
    pub state: bool,
    pub epi_week: bool,
    pub day_of_week: bool,
    pub date: bool,
}

impl KeySpec {
    /// No grouping: one statistic over the whole column.
    pub const GLOBAL: KeySpec = KeySpec {
        county: false,
        state: false,
        epi_week: false,
        day_of_week: false,
        date: false,
    };
    pub const COUNTY_WEEK_DOW: KeySpec = KeySpec {
        county: true,
        epi_week: true,
        day_of_week: true,
        ..KeySpec::GLOBAL
    };
    pub const STATE_WEEK_DOW: KeySpec = KeySpec {
        state: true,
        epi_week: true,
        day_of_week: true,
        ..KeySpec::GLOBAL
    };
    pub const STATE_WEEK: KeySpec = KeySpec {
        state: true,
        epi_week: true,
        ..KeySpec::GLOBAL
    };
    pub const WEEK_DOW: KeySpec = KeySpec {
        epi_week: true,
        day_of_week: true,
        ..KeySpec::GLOBAL
    };
    pub const DOW: KeySpec = KeySpec {
        day_of_week: true,
        ..KeySpec::GLOBAL
    };
    pub const STATE: KeySpec = KeySpec {
        state: true,
        ..KeySpec::GLOBAL
    };
    pub const STATE_DATE: KeySpec = KeySpec {
        state: true,
        date: true,
        ..KeySpec::GLOBAL
    };
    pub const DATE: KeySpec = KeySpec {
        date: true,
        ..KeySpec::GLOBAL
    };

    pub fn is_global(&self) -> bool {
        *self == KeySpec::GLOBAL
    }
}

impl fmt::Display for KeySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = [
            (self.county, "county"),
            (self.state, "state"),
            (self.epi_week, "epi_week"),
            (self.day_of_week, "day_of_week"),
            (self.date, "date"),
        ]
        .iter()
        .filter_map(|&(on, name)| on.then_some(name))
        .collect();
        if parts.is_empty() {
            f.write_str("global")
        } else {
            f.write_str(&parts.join("×"))
        }
    }
}

/// Hashable group identity; unused dimensions are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupKey {
    county: u32,
    state: u32,
    epi_year: i32,
    epi_week: u32,
    day_of_week: u32,
    day: i32,
}

/// Per-row grouping attributes, computed once per imputation run.
///
/// Keys never change during imputation, so the context is read-only while
/// cascades run.
#[derive(Debug, Clone)]
pub struct GroupContext {
    county: Vec<u32>,
    state: Vec<u32>,
    epi: Vec<(i32, u32)>,
    dow: Vec<u32>,
    day: Vec<i32>,
    population: Vec<f64>,
}

impl GroupContext {
    pub fn new(panel: &Panel) -> Result<Self> {
        let mut state_ids: AHashMap<&str, u32> = AHashMap::new();
        let state = panel
            .state_codes()
            .iter()
            .map(|code| {
                let next = state_ids.len() as u32;
                *state_ids.entry(code.as_str()).or_insert(next)
            })
            .collect();

        let population = panel
            .require_numeric(names::POP_TOTAL)?
            .iter()
            .enumerate()
            .map(|(row, v)| match v {
                Some(p) if *p > 0.0 => Ok(*p),
                _ => Err(AbtError::MalformedValue {
                    column: names::POP_TOTAL.to_string(),
                    row,
                    value: v.map(|p| p.to_string()).unwrap_or_default(),
                }),
            })
            .collect::<Result<Vec<f64>>>()?;

        Ok(Self {
            county: panel.county_fips().to_vec(),
            state,
            epi: panel.dates().iter().map(|d| epi_week(*d)).collect(),
            dow: panel.dates().iter().map(|d| day_of_week(*d)).collect(),
            day: panel.dates().iter().map(|d| d.num_days_from_ce()).collect(),
            population,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.county.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.county.is_empty()
    }

    /// Group key of `row` under `spec`.
    pub fn key(&self, spec: KeySpec, row: usize) -> GroupKey {
        let (epi_year, epi_week) = if spec.epi_week {
            self.epi[row]
        } else {
            (0, 0)
        };
        GroupKey {
            county: if spec.county { self.county[row] } else { 0 },
            state: if spec.state { self.state[row] } else { 0 },
            epi_year,
            epi_week,
            day_of_week: if spec.day_of_week { self.dow[row] } else { 0 },
            day: if spec.date { self.day[row] } else { 0 },
        }
    }

    #[inline]
    pub fn population(&self, row: usize) -> f64 {
        self.population[row]
    }

    #[inline]
    pub fn county(&self, row: usize) -> u32 {
        self.county[row]
    }
}
