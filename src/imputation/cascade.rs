//! Multi-level fallback imputation.
//!
//! A [`Cascade`] runs an ordered list of [`FillStep`]s over each column of a
//! family. Every step fills only cells that are still missing, using a
//! statistic computed from the cells that are currently present (observed or
//! filled by an earlier step). Whatever survives the last step is a fatal
//! residual-null violation.

use super::grouping::{GroupContext, GroupKey, KeySpec};
use super::stats::{forward_fill, interpolate_linear, mean, median, weighted_median};
use crate::error::{AbtError, Result};
use crate::panel::{map_groups, GroupSpan, Panel};
use crate::schema::ColumnFamily;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One level of a fallback cascade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FillStep {
    /// Linear interpolation within each county over gaps of at most `max_gap` days.
    Interpolate { max_gap: usize },

    /// Carry the last observed value forward within each county.
    ForwardFill,

    /// Median over the group.
    Median(KeySpec),

    /// Mean of `value / population` over the group, times the row's population.
    PopulationRate(KeySpec),

    /// Population-weighted median of per-county values over the group.
    WeightedMedian(KeySpec),

    /// Pooled density over the group: total population / total land area.
    PooledDensity(KeySpec),
}

impl fmt::Display for FillStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillStep::Interpolate { max_gap } => write!(f, "interpolate(max_gap={max_gap})"),
            FillStep::ForwardFill => write!(f, "forward_fill"),
            FillStep::Median(spec) => write!(f, "median[{spec}]"),
            FillStep::PopulationRate(spec) => write!(f, "population_rate[{spec}]"),
            FillStep::WeightedMedian(spec) => write!(f, "weighted_median[{spec}]"),
            FillStep::PooledDensity(spec) => write!(f, "pooled_density[{spec}]"),
        }
    }
}

/// Cells filled by each step for one column.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ColumnReport {
    pub column: String,
    pub initial_nulls: usize,
    pub filled: Vec<(String, usize)>,
}

impl ColumnReport {
    pub fn total_filled(&self) -> usize {
        self.filled.iter().map(|(_, n)| n).sum()
    }
}

/// Imputation summary for one family.
#[derive(Debug, Clone, Serialize)]
pub struct FamilyReport {
    pub family: ColumnFamily,
    pub columns: Vec<ColumnReport>,
}

impl FamilyReport {
    pub fn total_filled(&self) -> usize {
        self.columns.iter().map(ColumnReport::total_filled).sum()
    }
}

/// Fallback imputation for the columns of one family.
#[derive(Debug, Clone)]
pub struct Cascade {
    pub family: ColumnFamily,
    pub columns: Vec<String>,
    pub steps: Vec<FillStep>,
    /// Treat zero as missing before filling.
    pub zero_is_missing: bool,
    /// Divide every value by this after filling.
    pub divisor: Option<f64>,
}

impl Cascade {
    pub fn new(family: ColumnFamily, columns: Vec<String>, steps: Vec<FillStep>) -> Self {
        Self {
            family,
            columns,
            steps,
            zero_is_missing: false,
            divisor: None,
        }
    }

    pub fn with_zero_as_missing(mut self) -> Self {
        self.zero_is_missing = true;
        self
    }

    pub fn with_divisor(mut self, divisor: f64) -> Self {
        self.divisor = Some(divisor);
        self
    }

    /// Fill every missing cell in the family's columns.
    pub fn apply(&self, mut panel: Panel, ctx: &GroupContext) -> Result<(Panel, FamilyReport)> {
        let spans = panel.groups();
        let mut reports = Vec::with_capacity(self.columns.len());

        for column in &self.columns {
            let mut values = panel.require_numeric(column)?.to_vec();
            if self.zero_is_missing {
                for v in values.iter_mut() {
                    if *v == Some(0.0) {
                        *v = None;
                    }
                }
            }

            let mut report = ColumnReport {
                column: column.clone(),
                initial_nulls: count_nulls(&values),
                filled: Vec::with_capacity(self.steps.len()),
            };

            for step in &self.steps {
                if count_nulls(&values) == 0 {
                    break;
                }
                let filled = run_step(*step, &mut values, ctx, &spans);
                log::debug!("{}/{column}: {step} filled {filled}", self.family);
                report.filled.push((step.to_string(), filled));
            }

            if let Some(row) = values.iter().position(Option::is_none) {
                return Err(AbtError::ResidualNull {
                    stage: "imputation".to_string(),
                    family: self.family.to_string(),
                    column: column.clone(),
                    remaining: count_nulls(&values),
                    example_county: ctx.county(row),
                });
            }

            if let Some(divisor) = self.divisor {
                for v in values.iter_mut().flatten() {
                    *v /= divisor;
                }
            }

            panel.set_numeric(column.clone(), values)?;
            reports.push(report);
        }

        let report = FamilyReport {
            family: self.family,
            columns: reports,
        };
        log::info!(
            "Imputed {} family: {} cells filled across {} column(s)",
            self.family,
            report.total_filled(),
            report.columns.len()
        );
        Ok((panel, report))
    }
}

fn count_nulls(values: &[Option<f64>]) -> usize {
    values.iter().filter(|v| v.is_none()).count()
}

fn run_step(
    step: FillStep,
    values: &mut Vec<Option<f64>>,
    ctx: &GroupContext,
    spans: &[GroupSpan],
) -> usize {
    match step {
        FillStep::Interpolate { max_gap } => {
            per_county(values, spans, |part| interpolate_linear(part, max_gap))
        }
        FillStep::ForwardFill => per_county(values, spans, forward_fill),
        FillStep::Median(spec) => {
            let mut groups: AHashMap<GroupKey, Vec<f64>> = AHashMap::new();
            for (row, v) in values.iter().enumerate() {
                if let Some(v) = v {
                    groups.entry(ctx.key(spec, row)).or_default().push(*v);
                }
            }
            let stats = reduce(groups, |vals| median(&vals));
            fill_from(values, ctx, spec, &stats, |stat, _| stat)
        }
        FillStep::PopulationRate(spec) => {
            let mut groups: AHashMap<GroupKey, Vec<f64>> = AHashMap::new();
            for (row, v) in values.iter().enumerate() {
                if let Some(v) = v {
                    groups
                        .entry(ctx.key(spec, row))
                        .or_default()
                        .push(*v / ctx.population(row));
                }
            }
            let stats = reduce(groups, |rates| mean(&rates));
            fill_from(values, ctx, spec, &stats, |rate, row| rate * ctx.population(row))
        }
        FillStep::WeightedMedian(spec) => {
            let mut groups: AHashMap<GroupKey, Vec<(f64, f64)>> = AHashMap::new();
            for (span, value) in spans.iter().zip(county_values(values, spans)) {
                if let Some(value) = value {
                    groups
                        .entry(ctx.key(spec, span.start))
                        .or_default()
                        .push((value, ctx.population(span.start)));
                }
            }
            let stats = reduce(groups, |pairs| weighted_median(&pairs));
            fill_from(values, ctx, spec, &stats, |stat, _| stat)
        }
        FillStep::PooledDensity(spec) => {
            // (population, area) totals per group.
            let mut groups: AHashMap<GroupKey, (f64, f64)> = AHashMap::new();
            for (span, density) in spans.iter().zip(county_values(values, spans)) {
                if let Some(density) = density.filter(|d| *d > 0.0) {
                    let pop = ctx.population(span.start);
                    let entry = groups.entry(ctx.key(spec, span.start)).or_default();
                    entry.0 += pop;
                    entry.1 += pop / density;
                }
            }
            let stats = reduce(groups, |(pop, area)| (area > 0.0).then(|| pop / area));
            fill_from(values, ctx, spec, &stats, |stat, _| stat)
        }
    }
}

/// Run a per-county series operation and write the parts back in order.
fn per_county<F>(values: &mut Vec<Option<f64>>, spans: &[GroupSpan], op: F) -> usize
where
    F: Fn(&mut [Option<f64>]) -> usize + Sync + Send,
{
    let source: &[Option<f64>] = values;
    let parts = map_groups(spans, |span| {
        let mut part = source[span.range()].to_vec();
        let filled = op(&mut part);
        (part, filled)
    });
    let mut filled = 0;
    let mut out = Vec::with_capacity(values.len());
    for (part, n) in parts {
        out.extend(part);
        filled += n;
    }
    *values = out;
    filled
}

/// Representative value per county: median of its observed cells.
fn county_values(values: &[Option<f64>], spans: &[GroupSpan]) -> Vec<Option<f64>> {
    spans
        .iter()
        .map(|span| {
            let observed: Vec<f64> = values[span.range()].iter().flatten().copied().collect();
            median(&observed)
        })
        .collect()
}

fn reduce<T, F>(groups: AHashMap<GroupKey, T>, stat: F) -> AHashMap<GroupKey, f64>
where
    F: Fn(T) -> Option<f64>,
{
    groups
        .into_iter()
        .filter_map(|(key, items)| stat(items).map(|s| (key, s)))
        .collect()
}

fn fill_from<F>(
    values: &mut [Option<f64>],
    ctx: &GroupContext,
    spec: KeySpec,
    stats: &AHashMap<GroupKey, f64>,
    estimate: F,
) -> usize
where
    F: Fn(f64, usize) -> f64,
{
    let mut filled = 0;
    for (row, cell) in values.iter_mut().enumerate() {
        if cell.is_none() {
            if let Some(&stat) = stats.get(&ctx.key(spec, row)) {
                *cell = Some(estimate(stat, row));
                filled += 1;
            }
        }
    }
    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::names;
    use chrono::NaiveDate;

    /// Two counties in one state, `days` days each.
    fn panel(days: usize, col: Vec<Option<f64>>, pops: [f64; 2]) -> Panel {
        let start = NaiveDate::from_ymd_opt(2020, 4, 5).unwrap();
        let mut fips = Vec::new();
        let mut dates = Vec::new();
        let mut pop = Vec::new();
        for (c, p) in [(1u32, pops[0]), (2u32, pops[1])] {
            for i in 0..days {
                fips.push(c);
                dates.push(start + chrono::Duration::days(i as i64));
                pop.push(p);
            }
        }
        let n = fips.len();
        let mut panel = Panel::new(fips, vec!["AL".to_string(); n], dates).unwrap();
        panel.set_dense(names::POP_TOTAL, pop).unwrap();
        panel.set_numeric("x", col).unwrap();
        panel
    }

    fn run(cascade: &Cascade, p: Panel) -> Result<(Panel, FamilyReport)> {
        let ctx = GroupContext::new(&p)?;
        cascade.apply(p, &ctx)
    }

    #[test]
    fn test_interpolate_then_global() {
        let p = panel(
            3,
            vec![Some(1.0), None, Some(3.0), None, None, None],
            [10.0, 10.0],
        );
        let cascade = Cascade::new(
            ColumnFamily::Mobility,
            vec!["x".into()],
            vec![FillStep::Interpolate { max_gap: 7 }, FillStep::Median(KeySpec::GLOBAL)],
        );
        let (p, report) = run(&cascade, p).unwrap();
        assert_eq!(
            p.numeric("x").unwrap(),
            &[Some(1.0), Some(2.0), Some(3.0), Some(2.0), Some(2.0), Some(2.0)]
        );
        assert_eq!(report.columns[0].initial_nulls, 4);
        assert_eq!(report.columns[0].filled, vec![
            ("interpolate(max_gap=7)".to_string(), 1),
            ("median[global]".to_string(), 3),
        ]);
    }

    #[test]
    fn test_residual_null_is_fatal() {
        let p = panel(2, vec![None; 4], [10.0, 10.0]);
        let cascade = Cascade::new(
            ColumnFamily::Weather,
            vec!["x".into()],
            vec![FillStep::Median(KeySpec::GLOBAL)],
        );
        let err = run(&cascade, p).unwrap_err();
        assert!(matches!(
            err,
            AbtError::ResidualNull { remaining: 4, example_county: 1, .. }
        ));
    }

    #[test]
    fn test_population_rate() {
        // County 1 reports 50 of 1000 on both days; county 2 is missing.
        let p = panel(2, vec![Some(50.0), Some(50.0), None, None], [1000.0, 200.0]);
        let cascade = Cascade::new(
            ColumnFamily::Economic,
            vec!["x".into()],
            vec![FillStep::ForwardFill, FillStep::PopulationRate(KeySpec::STATE_DATE)],
        );
        let (p, _) = run(&cascade, p).unwrap();
        assert_eq!(p.numeric("x").unwrap()[2], Some(10.0));
    }

    #[test]
    fn test_weighted_median_fill() {
        let p = panel(1, vec![Some(5.0), None], [30.0, 10.0]);
        let cascade = Cascade::new(
            ColumnFamily::Demographic,
            vec!["x".into()],
            vec![FillStep::WeightedMedian(KeySpec::STATE)],
        );
        let (p, _) = run(&cascade, p).unwrap();
        assert_eq!(p.numeric("x").unwrap(), &[Some(5.0), Some(5.0)]);
    }

    #[test]
    fn test_pooled_density_zero_as_missing() {
        // County 1: pop 100, density 50 => area 2. County 2 density 0.
        let p = panel(1, vec![Some(50.0), Some(0.0)], [100.0, 300.0]);
        let cascade = Cascade::new(
            ColumnFamily::Density,
            vec!["x".into()],
            vec![FillStep::PooledDensity(KeySpec::STATE)],
        )
        .with_zero_as_missing();
        let (p, report) = run(&cascade, p).unwrap();
        assert_eq!(p.numeric("x").unwrap(), &[Some(50.0), Some(50.0)]);
        assert_eq!(report.columns[0].initial_nulls, 1);
    }

    #[test]
    fn test_divisor_applied_after_fill() {
        let p = panel(1, vec![Some(-20.0), None], [1.0, 1.0]);
        let cascade = Cascade::new(
            ColumnFamily::Mobility,
            vec!["x".into()],
            vec![FillStep::Median(KeySpec::GLOBAL)],
        )
        .with_divisor(100.0);
        let (p, _) = run(&cascade, p).unwrap();
        assert_eq!(p.numeric("x").unwrap(), &[Some(-0.2), Some(-0.2)]);
    }
}
