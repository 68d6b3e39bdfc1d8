//! Monotonicity correction for cumulative counts.
//!
//! Reporting corrections make raw cumulative series dip. The corrector walks
//! each county's series from the last day backward and, whenever a day is
//! lower than the day before it, lowers the earlier day by the deficit. The
//! most recent value is never touched and the result is non-decreasing.
//!
//! ```text
//! raw:        0  5  3  4  2  6
//! corrected:  0  2  2  2  2  6
//! ```

use crate::error::{AbtError, Result};
use crate::panel::{map_groups, Panel};
use crate::schema::COUNT_SERIES;

/// Repairs spurious decreases in cumulative count columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicityCorrector;

impl MonotonicityCorrector {
    /// Correct one series in place. Returns the number of adjusted entries.
    pub fn correct(series: &mut [i64]) -> usize {
        let mut adjusted = 0;
        for i in (1..series.len()).rev() {
            let delta = series[i] - series[i - 1];
            if delta < 0 {
                series[i - 1] += delta;
                adjusted += 1;
            }
        }
        adjusted
    }

    /// Correct every cumulative count column, per county.
    ///
    /// The panel must be sorted. Cumulative cells must be present,
    /// non-negative whole numbers.
    pub fn apply(mut panel: Panel) -> Result<Panel> {
        let spans = panel.groups();
        for series in COUNT_SERIES {
            let raw = to_counts(series.source, panel.require_numeric(series.source)?)?;

            let corrected = map_groups(&spans, |span| {
                let mut part = raw[span.range()].to_vec();
                let adjusted = Self::correct(&mut part);
                (part, adjusted)
            });
            let adjusted: usize = corrected.iter().map(|(_, n)| n).sum();
            let values: Vec<f64> = corrected
                .into_iter()
                .flat_map(|(part, _)| part)
                .map(|v| v as f64)
                .collect();

            log::info!(
                "Monotonicity correction on `{}`: {} entries lowered",
                series.source,
                adjusted
            );
            panel.set_dense(series.source, values)?;
        }
        Ok(panel)
    }
}

fn to_counts(column: &str, values: &[Option<f64>]) -> Result<Vec<i64>> {
    values
        .iter()
        .enumerate()
        .map(|(row, v)| match v {
            Some(x) if *x >= 0.0 && x.fract() == 0.0 => Ok(*x as i64),
            Some(x) => Err(AbtError::MalformedValue {
                column: column.to_string(),
                row,
                value: x.to_string(),
            }),
            None => Err(AbtError::schema(
                column,
                format!("cumulative count missing at row {row}"),
            )),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::names;
    use chrono::NaiveDate;

    fn is_non_decreasing(s: &[i64]) -> bool {
        s.windows(2).all(|w| w[1] >= w[0])
    }

    fn check(s: &mut [i64]) {
        let last = *s.last().unwrap();
        MonotonicityCorrector::correct(s);
        assert!(is_non_decreasing(s));
        assert_eq!(*s.last().unwrap(), last);
    }

    #[test]
    fn test_single_dip() {
        let mut s = vec![0, 5, 3, 4, 2, 6];
        check(&mut s);
        assert_eq!(s, vec![0, 2, 2, 2, 2, 6]);
    }

    #[test]
    fn test_cascading_deficit() {
        let mut s = vec![10, 10, 10, 1];
        check(&mut s);
        assert_eq!(s, vec![1, 1, 1, 1]);
    }

    #[test]
    fn test_idempotent_on_monotone() {
        let mut s = vec![0, 0, 1, 1, 3, 3, 6];
        let before = s.clone();
        assert_eq!(MonotonicityCorrector::correct(&mut s), 0);
        assert_eq!(s, before);
    }

    #[test]
    fn test_single_and_empty() {
        let mut s = vec![7];
        assert_eq!(MonotonicityCorrector::correct(&mut s), 0);
        assert_eq!(s, vec![7]);
        let mut e: Vec<i64> = vec![];
        assert_eq!(MonotonicityCorrector::correct(&mut e), 0);
    }

    fn panel(confirmed: Vec<Option<f64>>) -> Panel {
        let n = confirmed.len();
        let mut p = Panel::new(
            vec![1001; n],
            vec!["AL".to_string(); n],
            (0..n)
                .map(|i| NaiveDate::from_ymd_opt(2020, 4, 1 + i as u32).unwrap())
                .collect(),
        )
        .unwrap();
        p.set_numeric(names::CONFIRMED, confirmed).unwrap();
        p.set_dense(names::DEATHS, vec![0.0; n]).unwrap();
        p
    }

    #[test]
    fn test_apply_panel() {
        let p = panel(vec![Some(1.0), Some(4.0), Some(2.0)]);
        let p = MonotonicityCorrector::apply(p).unwrap();
        assert_eq!(
            p.numeric(names::CONFIRMED).unwrap(),
            &[Some(1.0), Some(2.0), Some(2.0)]
        );
    }

    #[test]
    fn test_apply_rejects_null_and_negative() {
        let p = panel(vec![Some(1.0), None]);
        assert!(matches!(
            MonotonicityCorrector::apply(p),
            Err(AbtError::Schema { .. })
        ));
        let p = panel(vec![Some(-1.0), Some(2.0)]);
        assert!(matches!(
            MonotonicityCorrector::apply(p),
            Err(AbtError::MalformedValue { .. })
        ));
    }
}
