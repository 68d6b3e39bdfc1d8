//! Per-county group spans over a sorted panel.

use std::ops::Range;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Contiguous row range belonging to one county in a sorted panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupSpan {
    pub county_fip: u32,
    pub start: usize,
    pub end: usize,
}

impl GroupSpan {
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Split a county column into runs of equal consecutive values.
///
/// The panel must already be sorted by county; an unsorted column yields one
/// span per run, not per county.
pub fn group_spans(county_fip: &[u32]) -> Vec<GroupSpan> {
    let mut spans = Vec::new();
    let mut start = 0;
    for i in 1..=county_fip.len() {
        if i == county_fip.len() || county_fip[i] != county_fip[start] {
            spans.push(GroupSpan {
                county_fip: county_fip[start],
                start,
                end: i,
            });
            start = i;
        }
    }
    spans
}

/// Apply `f` to every group, returning results in group order.
///
/// With the `parallel` feature the groups are processed on the rayon pool;
/// the indexed collect keeps the output order identical to the sequential
/// path.
pub fn map_groups<T, F>(spans: &[GroupSpan], f: F) -> Vec<T>
where
    T: Send,
    F: Fn(&GroupSpan) -> T + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        spans.par_iter().map(f).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        spans.iter().map(f).collect()
    }
}

/// Build a full-length column from per-group slices.
///
/// `f` must return exactly `span.len()` values for each span.
pub fn collect_column<T, F>(spans: &[GroupSpan], f: F) -> Vec<T>
where
    T: Send,
    F: Fn(&GroupSpan) -> Vec<T> + Sync + Send,
{
    let parts = map_groups(spans, f);
    let total = parts.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(total);
    for part in parts {
        out.extend(part);
    }
    out
}
