//! Window helpers over one county's series.
//!
//! Every helper returns a vector the same length as its input; positions
//! whose window leaves the series are `None`.

/// First difference: `x[t] - x[t-1]`, `None` at `t = 0`.
pub fn diff(values: &[f64]) -> Vec<Option<f64>> {
    lag_diff(values, 1)
}

/// `x[t] - x[t-k]`, `None` for `t < k`.
pub fn lag_diff(values: &[f64], k: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|t| (t >= k).then(|| values[t] - values[t - k]))
        .collect()
}

/// Trailing sum of `window` values ending at `t`.
///
/// `None` unless all `window` values are present.
pub fn rolling_sum(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|t| {
            if window == 0 || t + 1 < window {
                return None;
            }
            values[t + 1 - window..=t]
                .iter()
                .try_fold(0.0, |acc, v| v.map(|v| acc + v))
        })
        .collect()
}

/// Value `k` rows earlier: `y[t] = x[t-k]`.
pub fn lag(values: &[Option<f64>], k: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|t| if t >= k { values[t - k] } else { None })
        .collect()
}

/// Value `k` rows later: `y[t] = x[t+k]`.
pub fn lead(values: &[Option<f64>], k: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|t| values.get(t + k).copied().flatten())
        .collect()
}

/// Per-series min-max scaling; a constant series maps to 0.5.
pub fn min_max(values: &[f64]) -> Vec<f64> {
    let (lo, hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = hi - lo;
    values
        .iter()
        .map(|&v| if range > 0.0 { (v - lo) / range } else { 0.5 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff() {
        assert_eq!(diff(&[0.0, 2.0, 5.0]), vec![None, Some(2.0), Some(3.0)]);
        assert!(diff(&[]).is_empty());
    }

    #[test]
    fn test_rolling_sum_requires_full_window() {
        let v = vec![None, Some(1.0), Some(2.0), Some(3.0)];
        assert_eq!(rolling_sum(&v, 2), vec![None, None, Some(3.0), Some(5.0)]);
        assert_eq!(rolling_sum(&v, 5), vec![None; 4]);
    }

    #[test]
    fn test_lag_and_lead() {
        let v = vec![Some(1.0), Some(2.0), Some(3.0)];
        assert_eq!(lag(&v, 1), vec![None, Some(1.0), Some(2.0)]);
        assert_eq!(lead(&v, 2), vec![Some(3.0), None, None]);
    }

    #[test]
    fn test_min_max() {
        assert_eq!(min_max(&[2.0, 4.0, 3.0]), vec![0.0, 1.0, 0.5]);
        assert_eq!(min_max(&[7.0, 7.0]), vec![0.5, 0.5]);
    }
}
