//! Policy phase resolution on loaded panels.

mod common;

use chrono::NaiveDate;
use common::{county_rows, to_csv, Row};
use county_abt::policy::check_policy_coverage;
use county_abt::{names, AbtError, Panel, PanelLoader, PolicyPhase, PolicyResolver};

fn resolve(rows: &[Row], resolver: &PolicyResolver) -> county_abt::Result<Panel> {
    let panel = PanelLoader::default()
        .load_reader(to_csv(rows).as_bytes())?
        .sorted()?;
    resolver.resolve(panel)
}

fn labels(panel: &Panel) -> Vec<&str> {
    panel
        .text(names::POLICY)
        .unwrap()
        .iter()
        .map(|v| v.as_deref().unwrap())
        .collect()
}

/// One county with every stage flag cleared.
fn blank_county(days: usize) -> Vec<Row> {
    let mut rows = county_rows(1001, "AL", days);
    for row in rows.iter_mut() {
        for flag in [names::STAY_HOME, names::PHASE_1, names::PHASE_2, names::PHASE_3] {
            row.clear(flag);
        }
    }
    rows
}

#[test]
fn test_precedence_and_forward_fill() {
    let mut rows = blank_county(8);
    rows[2].set(names::STAY_HOME, "1");
    rows[5].set(names::STAY_HOME, "1");
    rows[5].set(names::PHASE_1, "1");
    rows[7].set(names::PHASE_3, "1");

    let panel = resolve(&rows, &PolicyResolver::default()).unwrap();
    assert_eq!(
        labels(&panel),
        vec![
            "none_issued",
            "none_issued",
            "stay_home",
            "stay_home",
            "stay_home",
            "phase_1",
            "phase_1",
            "phase_3",
        ]
    );
    let codes: Vec<f64> = panel
        .numeric(names::POLICY_CODE)
        .unwrap()
        .iter()
        .map(|v| v.unwrap())
        .collect();
    assert_eq!(codes, vec![0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0, 4.0]);
}

#[test]
fn test_phases_without_stay_home_are_discarded() {
    let mut rows = blank_county(6);
    for row in rows.iter_mut() {
        row.set(names::STAY_HOME, "None Issued");
    }
    rows[3].set(names::PHASE_1, "1");

    let panel = resolve(&rows, &PolicyResolver::default()).unwrap();
    assert!(labels(&panel).iter().all(|l| *l == "none_issued"));
    assert!(panel
        .numeric("policy_phase_1")
        .unwrap()
        .iter()
        .all(|v| *v == Some(0.0)));

    let kept = resolve(&rows, &PolicyResolver::new(false)).unwrap();
    assert_eq!(labels(&kept)[3..], ["phase_1", "phase_1", "phase_1"]);
}

#[test]
fn test_indicator_columns_replace_raw_flags() {
    let rows = county_rows(1001, "AL", 5);
    let panel = resolve(&rows, &PolicyResolver::default()).unwrap();

    for raw in [names::TRAVEL_LIMIT, names::STAY_HOME, names::PHASE_1] {
        assert!(!panel.has_text(raw), "raw flag {raw} should be dropped");
    }
    let stay: Vec<Option<f64>> = panel.numeric("policy_stay_home").unwrap().to_vec();
    assert_eq!(
        stay,
        vec![Some(0.0), Some(0.0), Some(0.0), Some(1.0), Some(1.0)]
    );
    assert!(panel
        .numeric("policy_travel_limit")
        .unwrap()
        .iter()
        .all(|v| *v == Some(1.0)));
}

#[test]
fn test_unrecognized_flag_is_malformed() {
    let mut rows = county_rows(1001, "AL", 3);
    rows[1].set(names::PHASE_2, "maybe");
    match resolve(&rows, &PolicyResolver::default()) {
        Err(AbtError::MalformedValue { column, row, value }) => {
            assert_eq!(column, names::PHASE_2);
            assert_eq!(row, 1);
            assert_eq!(value, "maybe");
        }
        other => panic!("expected malformed value, got {other:?}"),
    }
}

#[test]
fn test_coverage_gap_is_fatal() {
    let d = |day| NaiveDate::from_ymd_opt(2020, 4, day).unwrap();
    let mut panel = Panel::new(
        vec![1001; 3],
        vec!["AL".to_string(); 3],
        vec![d(1), d(2), d(5)],
    )
    .unwrap();
    panel
        .set_dense(
            names::POLICY_CODE,
            vec![0.0, 0.0, f64::from(PolicyPhase::StayHome.code())],
        )
        .unwrap();

    match check_policy_coverage(&panel) {
        Err(AbtError::PolicyGap {
            county_fip,
            gap_days,
            after,
        }) => {
            assert_eq!(county_fip, 1001);
            assert_eq!(gap_days, 3);
            assert_eq!(after, d(2));
        }
        other => panic!("expected policy gap, got {other:?}"),
    }
}

#[test]
fn test_contiguous_coverage_passes() {
    let rows = county_rows(1001, "AL", 10);
    let panel = resolve(&rows, &PolicyResolver::default()).unwrap();
    assert!(check_policy_coverage(&panel).is_ok());
    assert_eq!(panel.null_count(names::POLICY_CODE), 0);
}
