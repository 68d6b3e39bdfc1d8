//! Demographic, economic, testing and scaled covariates.

use super::series::{lag_diff, min_max};
use super::{dense, FeatureConfig};
use crate::error::Result;
use crate::panel::{collect_column, Panel};
use crate::schema::{names, AGE_BANDS};

/// Coarse age bands as fractions of total population.
pub fn age_bands(panel: &Panel, population: &[f64]) -> Result<Vec<(String, Vec<f64>)>> {
    let mut out = Vec::with_capacity(AGE_BANDS.len());
    for (band, sources) in AGE_BANDS {
        let mut total = vec![0.0; panel.len()];
        for source in *sources {
            for (acc, v) in total.iter_mut().zip(dense(panel, source)?) {
                *acc += v;
            }
        }
        let frac = total.iter().zip(population).map(|(t, p)| t / p).collect();
        out.push((band.to_string(), frac));
    }
    Ok(out)
}

/// Income rescaling and unemployment ratios.
pub fn economic(
    panel: &Panel,
    population: &[f64],
    config: &FeatureConfig,
) -> Result<Vec<(String, Vec<f64>)>> {
    let income = dense(panel, names::MEDIAN_HH_INCOME)?;
    let labor_force = dense(panel, names::LABOR_FORCE)?;
    let unemployed = dense(panel, names::UNEMPLOYED)?;

    let income_scaled = income.iter().map(|v| v / config.income_divisor).collect();
    let rate = unemployed
        .iter()
        .zip(&labor_force)
        .map(|(u, lf)| if *lf > 0.0 { u / lf } else { 0.0 })
        .collect();
    let penetration = unemployed
        .iter()
        .zip(population)
        .map(|(u, p)| u / p)
        .collect();

    Ok(vec![
        (names::INCOME_SCALED.to_string(), income_scaled),
        (names::UNEMPLOYMENT_RATE.to_string(), rate),
        (names::UNEMPLOYMENT_PENETRATION.to_string(), penetration),
    ])
}

/// Change in unemployed over the window, absolute and relative.
///
/// Both are null in the first `window` rows of a county. The relative change
/// is also null where the earlier count is zero.
pub fn unemployment_change(
    panel: &Panel,
    config: &FeatureConfig,
) -> Result<Vec<(String, Vec<Option<f64>>)>> {
    let unemployed = dense(panel, names::UNEMPLOYED)?;
    let w = config.window;
    let spans = panel.groups();

    let target = collect_column(&spans, |span| lag_diff(&unemployed[span.range()], w));
    let pct_delta = collect_column(&spans, |span| {
        let u = &unemployed[span.range()];
        (0..u.len())
            .map(|t| {
                let prev = u[t.checked_sub(w)?];
                (prev != 0.0).then(|| (u[t] - prev) / prev)
            })
            .collect::<Vec<Option<f64>>>()
    });

    Ok(vec![
        (names::UNEMPLOYMENT_TARGET.to_string(), target),
        (names::UNEMPLOYMENT_PCT_DELTA.to_string(), pct_delta),
    ])
}

/// Positive tests over total tests, 0 where no test was reported.
///
/// `None` unless both test counts are in the panel.
pub fn testing(panel: &Panel) -> Result<Option<(String, Vec<f64>)>> {
    if !(panel.has_numeric(names::COV_POS_TESTS) && panel.has_numeric(names::COV_TOTAL_TESTS)) {
        log::debug!("Test counts incomplete, skipping {}", names::TESTING_POS_PROP);
        return Ok(None);
    }
    let positive = dense(panel, names::COV_POS_TESTS)?;
    let total = dense(panel, names::COV_TOTAL_TESTS)?;
    let prop = positive
        .iter()
        .zip(&total)
        .map(|(p, t)| if *t > 0.0 { p / t } else { 0.0 })
        .collect();
    Ok(Some((names::TESTING_POS_PROP.to_string(), prop)))
}

/// Per-county min-max weather and global min-max of log density.
pub fn scaled(panel: &Panel) -> Result<Vec<(String, Vec<f64>)>> {
    let spans = panel.groups();
    let mut out = Vec::with_capacity(3);
    for (source, target) in [
        (names::TMPF_MEAN, names::TMPF_SCALED),
        (names::RELH_MEAN, names::RELH_SCALED),
    ] {
        let values = dense(panel, source)?;
        let scaled = collect_column(&spans, |span| min_max(&values[span.range()]));
        out.push((target.to_string(), scaled));
    }

    let log_density: Vec<f64> = dense(panel, names::POP_DENSITY)?
        .iter()
        .map(|d| d.ln())
        .collect();
    out.push((names::POP_DENSITY_SCALED.to_string(), min_max(&log_density)));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn panel() -> Panel {
        let d = |day| NaiveDate::from_ymd_opt(2020, 5, day).unwrap();
        let mut p = Panel::new(
            vec![1, 1, 2, 2],
            vec!["AL".to_string(); 4],
            vec![d(1), d(2), d(1), d(2)],
        )
        .unwrap();
        p.set_dense(names::TMPF_MEAN, vec![50.0, 70.0, 60.0, 60.0]).unwrap();
        p.set_dense(names::RELH_MEAN, vec![1.0, 3.0, 2.0, 4.0]).unwrap();
        p.set_dense(names::POP_DENSITY, vec![1.0, 1.0, 100.0, 100.0]).unwrap();
        p.set_dense(names::MEDIAN_HH_INCOME, vec![50_000.0; 4]).unwrap();
        p.set_dense(names::LABOR_FORCE, vec![500.0, 500.0, 0.0, 0.0]).unwrap();
        p.set_dense(names::UNEMPLOYED, vec![50.0, 25.0, 0.0, 0.0]).unwrap();
        p
    }

    #[test]
    fn test_scaled() {
        let cols = scaled(&panel()).unwrap();
        assert_eq!(cols[0].0, names::TMPF_SCALED);
        assert_eq!(cols[0].1, vec![0.0, 1.0, 0.5, 0.5]);
        assert_eq!(cols[1].1, vec![0.0, 1.0, 0.0, 1.0]);
        assert_eq!(cols[2].1, vec![0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_economic() {
        let p = panel();
        let cols = economic(&p, &[1000.0; 4], &FeatureConfig::default()).unwrap();
        assert_eq!(cols[0].1, vec![5.0; 4]);
        assert_eq!(cols[1].1, vec![0.1, 0.05, 0.0, 0.0]);
        assert_eq!(cols[2].1, vec![0.05, 0.025, 0.0, 0.0]);
    }

    #[test]
    fn test_unemployment_change_window_one() {
        let p = panel();
        let config = FeatureConfig::default().with_window(1);
        let cols = unemployment_change(&p, &config).unwrap();
        assert_eq!(cols[0].0, names::UNEMPLOYMENT_TARGET);
        assert_eq!(cols[0].1, vec![None, Some(-25.0), None, Some(0.0)]);
        // County 2 had nobody unemployed a day earlier.
        assert_eq!(cols[1].1, vec![None, Some(-0.5), None, None]);
    }

    #[test]
    fn test_testing_zero_total() {
        let mut p = panel();
        assert!(testing(&p).unwrap().is_none());

        p.set_dense(names::COV_POS_TESTS, vec![1.0, 3.0, 0.0, 2.0]).unwrap();
        p.set_dense(names::COV_TOTAL_TESTS, vec![10.0, 12.0, 0.0, 8.0]).unwrap();
        let (name, prop) = testing(&p).unwrap().unwrap();
        assert_eq!(name, names::TESTING_POS_PROP);
        assert_eq!(prop, vec![0.1, 0.25, 0.0, 0.25]);
    }
}
