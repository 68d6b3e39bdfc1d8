//! Count-series features: new counts, trailing sums, targets, ratios.
//!
//! For a cumulative series `c` with window `w` and stabilizer `s`:
//!
//! | Column | Definition |
//! |--------|------------|
//! | `*_new` | `c[t] - c[t-1]` |
//! | `*_7day_sum` | `new[t-w+1..=t]` summed, `+ s` |
//! | `*_7day_sum_lag` / `_lead` | `7day_sum[t∓w]` |
//! | `*_7day_pct_delta` | `(7day_sum - lag) / lag` |
//! | `*_target` | `c[t] - c[t-w]` |
//! | `*_target_lead` | `target[t+w]` |
//! | `*_penetration` | `(c + s) / population` |
//! | `*_momentum` | `7day_sum_lag / (c + s)` |
//! | `days_since_first_*` | calendar days since `c` first exceeded 0, `-1` before |
//!
//! Momentum compares last window's activity with the current total, so it
//! is null wherever `7day_sum_lag` is.

use super::series::{diff, lag, lag_diff, lead, rolling_sum};
use super::FeatureConfig;
use crate::panel::{map_groups, Panel};
use crate::schema::CountSeries;
use chrono::NaiveDate;

/// Sentinel for "no qualifying event yet".
pub const NO_EVENT: f64 = -1.0;

type Columns = Vec<(String, Vec<Option<f64>>)>;

/// Derive every feature of one count series.
///
/// `cumulative` and `population` are complete columns of a sorted panel.
pub fn count_series_features(
    panel: &Panel,
    series: &CountSeries,
    cumulative: &[f64],
    population: &[f64],
    config: &FeatureConfig,
) -> Columns {
    let w = config.window;
    let s = config.stabilizer;
    let dates = panel.dates();

    let parts = map_groups(&panel.groups(), |span| {
        let cum = &cumulative[span.range()];
        let pop = &population[span.range()];

        let new_counts = diff(cum);
        let sum = rolling_sum(&new_counts, w)
            .into_iter()
            .map(|v| v.map(|v| v + s))
            .collect::<Vec<_>>();
        let sum_lag = lag(&sum, w);
        let sum_lead = lead(&sum, w);
        let pct_delta = sum
            .iter()
            .zip(&sum_lag)
            .map(|(cur, prev)| match (cur, prev) {
                (Some(cur), Some(prev)) => Some((cur - prev) / prev),
                _ => None,
            })
            .collect::<Vec<_>>();
        let target = lag_diff(cum, w);
        let target_lead = lead(&target, w);
        let penetration = cum
            .iter()
            .zip(pop)
            .map(|(c, p)| Some((c + s) / p))
            .collect::<Vec<_>>();
        let momentum = sum_lag
            .iter()
            .zip(cum)
            .map(|(prev, c)| prev.map(|prev| prev / (c + s)))
            .collect::<Vec<_>>();
        let since_first = days_since_first(&dates[span.range()], cum);

        vec![
            new_counts,
            sum,
            sum_lag,
            sum_lead,
            pct_delta,
            target,
            target_lead,
            penetration,
            momentum,
            since_first,
        ]
    });

    let names = [
        series.new_counts(),
        series.sum_7day(),
        series.sum_7day_lag(),
        series.sum_7day_lead(),
        series.pct_delta(),
        series.target(),
        series.target_lead(),
        series.penetration(),
        series.momentum(),
        series.days_since_first(),
    ];
    let mut columns: Columns = names
        .into_iter()
        .map(|n| (n, Vec::with_capacity(panel.len())))
        .collect();
    for part in parts {
        for (column, values) in columns.iter_mut().zip(part) {
            column.1.extend(values);
        }
    }
    columns
}

/// Calendar-day offset from the first date on which `cumulative` exceeds zero.
///
/// This counts days on the calendar, not observed rows: a missing date in
/// the series still advances the offset. Rows before that date, and every
/// row of a series that never exceeds zero, get [`NO_EVENT`].
pub fn days_since_first(dates: &[NaiveDate], cumulative: &[f64]) -> Vec<Option<f64>> {
    let first = cumulative.iter().position(|&c| c > 0.0).map(|i| dates[i]);
    dates
        .iter()
        .map(|d| {
            Some(match first {
                Some(first) if *d >= first => (*d - first).num_days() as f64,
                _ => NO_EVENT,
            })
        })
        .collect()
}

/// Days since the start of the current run of equal values.
pub fn days_in_run(dates: &[NaiveDate], values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut run_start = 0;
    for i in 0..values.len() {
        if i > 0 && values[i] != values[i - 1] {
            run_start = i;
        }
        out.push((dates[i] - dates[run_start]).num_days() as f64);
    }
    out
}
