//! Policy Phase Resolution
//!
//! Collapses the raw per-stage policy flags into one ordered "current
//! policy" value per county-day.
//!
//! # Resolution steps
//!
//! ```text
//! raw text flag ──► RawFlag (active / inactive / never issued / not reported)
//!                       │
//!                       ▼
//!        contradiction rule (phases without any stay-home are not reported)
//!                       │
//!                       ▼
//!        per-row coalesce: phase_3 > phase_2 > phase_1 > stay_home
//!                       │
//!                       ▼
//!        forward-fill within county, default NoneIssued
//! ```
//!
//! The resolved phase is written as a text label (`policy`) and an ordinal
//! code (`policy_code`); every raw flag is also written as a 0/1 indicator
//! (`policy_<flag>`). Raw flag text is dropped.

mod phase;

pub use phase::{PolicyPhase, RawFlag};

use crate::error::{AbtError, Result};
use crate::panel::{map_groups, Panel};
use crate::schema::{names, POLICY_FLAGS};

/// Stage flags in precedence order, most advanced first.
const PRECEDENCE: &[(&str, PolicyPhase)] = &[
    (names::PHASE_3, PolicyPhase::Phase3),
    (names::PHASE_2, PolicyPhase::Phase2),
    (names::PHASE_1, PolicyPhase::Phase1),
    (names::STAY_HOME, PolicyPhase::StayHome),
];

/// Resolves raw policy flags into a single ordered phase.
#[derive(Debug, Clone)]
pub struct PolicyResolver {
    discard_phases_without_stay_home: bool,
}

impl Default for PolicyResolver {
    fn default() -> Self {
        Self {
            discard_phases_without_stay_home: true,
        }
    }
}

impl PolicyResolver {
    pub fn new(discard_phases_without_stay_home: bool) -> Self {
        Self {
            discard_phases_without_stay_home,
        }
    }

    /// Resolve the current policy for every row of a sorted panel.
    pub fn resolve(&self, mut panel: Panel) -> Result<Panel> {
        let rows = panel.len();

        let mut flags: Vec<(&'static str, &'static str, Vec<RawFlag>)> = Vec::new();
        for &(raw, out) in POLICY_FLAGS {
            let parsed = match panel.text(raw) {
                Some(col) => parse_column(raw, col)?,
                None if is_stage(raw) => {
                    return Err(AbtError::schema(raw, "policy stage column is missing"))
                }
                None => continue,
            };
            flags.push((raw, out, parsed));
        }

        let stay_home = flag_values(&flags, names::STAY_HOME);
        let mut discarded = 0usize;
        if self.discard_phases_without_stay_home {
            for (raw, _, values) in flags.iter_mut() {
                if !matches!(*raw, names::PHASE_1 | names::PHASE_2 | names::PHASE_3) {
                    continue;
                }
                for (value, home) in values.iter_mut().zip(&stay_home) {
                    if *home == RawFlag::NeverIssued && *value == RawFlag::Active {
                        *value = RawFlag::NotReported;
                        discarded += 1;
                    }
                }
            }
        }
        if discarded > 0 {
            log::warn!("Discarded {discarded} phase flag(s) set without any stay-home order");
        }

        // Per-row coalesce across stages.
        let stages: Vec<(PolicyPhase, Vec<RawFlag>)> = PRECEDENCE
            .iter()
            .map(|&(raw, phase)| (phase, flag_values(&flags, raw)))
            .collect();
        let recorded: Vec<Option<PolicyPhase>> = (0..rows)
            .map(|i| {
                stages
                    .iter()
                    .find(|(_, values)| values[i] == RawFlag::Active)
                    .map(|(phase, _)| *phase)
            })
            .collect();

        // Forward-fill per county.
        let spans = panel.groups();
        let resolved: Vec<PolicyPhase> = map_groups(&spans, |span| {
            let mut current = None;
            recorded[span.range()]
                .iter()
                .map(|r| {
                    if r.is_some() {
                        current = *r;
                    }
                    current.unwrap_or(PolicyPhase::NoneIssued)
                })
                .collect::<Vec<_>>()
        })
        .into_iter()
        .flatten()
        .collect();

        let mut counts = [0usize; 5];
        for phase in &resolved {
            counts[phase.code() as usize] += 1;
        }
        log::info!(
            "Policy resolved: {}",
            PolicyPhase::ALL
                .iter()
                .map(|p| format!("{}={}", p.label(), counts[p.code() as usize]))
                .collect::<Vec<_>>()
                .join(", ")
        );

        for (raw, out, values) in flags {
            panel.set_dense(
                out,
                values
                    .iter()
                    .map(|v| if v.is_active() { 1.0 } else { 0.0 })
                    .collect(),
            )?;
            panel.remove_text(raw);
        }
        panel.set_dense(
            names::POLICY_CODE,
            resolved.iter().map(|p| f64::from(p.code())).collect(),
        )?;
        panel.set_text(
            names::POLICY,
            resolved.iter().map(|p| Some(p.label().to_string())).collect(),
        )?;

        check_policy_coverage(&panel)?;
        Ok(panel)
    }
}

/// Check that resolved policy covers every row with no gap between runs.
///
/// Runs of equal policy are formed per county; the distance from the last
/// day of one run to the first day of the next must be exactly one day.
pub fn check_policy_coverage(panel: &Panel) -> Result<()> {
    let codes = panel.require_numeric(names::POLICY_CODE)?;
    let dates = panel.dates();

    for span in panel.groups() {
        let mut run_end: Option<usize> = None;
        for i in span.range() {
            let Some(code) = codes[i] else {
                return Err(AbtError::ResidualNull {
                    stage: "policy".to_string(),
                    family: "policy".to_string(),
                    column: names::POLICY_CODE.to_string(),
                    remaining: panel.null_count(names::POLICY_CODE),
                    example_county: span.county_fip,
                });
            };
            if let Some(end) = run_end {
                if codes[end] != Some(code) {
                    let gap = (dates[i] - dates[end]).num_days();
                    if gap > 1 {
                        return Err(AbtError::PolicyGap {
                            county_fip: span.county_fip,
                            gap_days: gap,
                            after: dates[end],
                        });
                    }
                }
            }
            run_end = Some(i);
        }
    }
    Ok(())
}

fn is_stage(raw: &str) -> bool {
    PRECEDENCE.iter().any(|(name, _)| *name == raw)
}

fn parse_column(column: &str, values: &[Option<String>]) -> Result<Vec<RawFlag>> {
    values
        .iter()
        .enumerate()
        .map(|(row, v)| {
            RawFlag::parse(v.as_deref()).ok_or_else(|| AbtError::MalformedValue {
                column: column.to_string(),
                row,
                value: v.clone().unwrap_or_default(),
            })
        })
        .collect()
}

fn flag_values(flags: &[(&str, &str, Vec<RawFlag>)], raw: &str) -> Vec<RawFlag> {
    flags
        .iter()
        .find(|(name, _, _)| *name == raw)
        .map(|(_, _, v)| v.clone())
        .unwrap_or_default()
}
