//! Fill statistics.
//!
//! All statistics skip missing entries; callers pass only observed values.

/// Ordinary median. `None` for an empty input.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

/// Arithmetic mean. `None` for an empty input.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population-weighted median of `(value, weight)` pairs.
///
/// Equivalent to the ordinary median of the multiset in which each value is
/// repeated `round(weight)` times. Pairs whose rounded weight is zero do not
/// contribute. `None` when the total weight is zero.
pub fn weighted_median(pairs: &[(f64, f64)]) -> Option<f64> {
    let mut items: Vec<(f64, u64)> = pairs
        .iter()
        .filter_map(|&(v, w)| {
            let w = w.round();
            (w >= 1.0).then_some((v, w as u64))
        })
        .collect();
    let total: u64 = items.iter().map(|(_, w)| w).sum();
    if total == 0 {
        return None;
    }
    items.sort_by(|a, b| a.0.total_cmp(&b.0));

    // 1-based positions in the expanded sample.
    let lower = (total + 1) / 2;
    let upper = total / 2 + 1;
    let lo = nth_weighted(&items, lower)?;
    if total % 2 == 1 {
        Some(lo)
    } else {
        let hi = nth_weighted(&items, upper)?;
        Some((lo + hi) / 2.0)
    }
}

fn nth_weighted(items: &[(f64, u64)], position: u64) -> Option<f64> {
    let mut seen = 0;
    for &(v, w) in items {
        seen += w;
        if seen >= position {
            return Some(v);
        }
    }
    None
}

/// Linear interpolation over interior gaps of at most `max_gap` cells.
///
/// Leading and trailing gaps, and interior gaps longer than `max_gap`, are
/// left untouched. Returns the number of filled cells.
pub fn interpolate_linear(series: &mut [Option<f64>], max_gap: usize) -> usize {
    let mut filled = 0;
    let mut last_known: Option<usize> = None;
    for i in 0..series.len() {
        let Some(right) = series[i] else {
            continue;
        };
        if let Some(l) = last_known {
            let gap = i - l - 1;
            if gap > 0 && gap <= max_gap {
                if let Some(left) = series[l] {
                    let span = (i - l) as f64;
                    for j in l + 1..i {
                        let step = (j - l) as f64;
                        series[j] = Some(left + (right - left) * step / span);
                        filled += 1;
                    }
                }
            }
        }
        last_known = Some(i);
    }
    filled
}

/// Carry the last observed value forward. Returns the number of filled cells.
pub fn forward_fill(series: &mut [Option<f64>]) -> usize {
    let mut filled = 0;
    let mut last = None;
    for cell in series.iter_mut() {
        match cell {
            Some(v) => last = Some(*v),
            None => {
                if let Some(v) = last {
                    *cell = Some(v);
                    filled += 1;
                }
            }
        }
    }
    filled
}
