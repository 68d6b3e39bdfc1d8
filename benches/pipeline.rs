//! Benchmark suite for ABT construction.
//!
//! Run with: `cargo bench`
//!
//! This benchmark measures:
//! - Monotonicity correction on long series
//! - Cascading imputation on a panel with scattered gaps
//! - Full pipeline throughput by county count

use chrono::{Duration, NaiveDate};
use county_abt::{
    names, ImputationConfig, Imputer, MonotonicityCorrector, PanelLoader, Pipeline,
    PipelineConfig,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

const DAYS: usize = 120;

const NUMERIC: &[&str] = &[
    names::RETAIL_AND_RECREATION,
    names::GROCERY_AND_PHARMACY,
    names::PARKS,
    names::TRANSIT_STATIONS,
    names::WORKPLACES,
    names::RESIDENTIAL,
    names::TMPF_MEAN,
    names::RELH_MEAN,
    names::LABOR_FORCE,
    names::UNEMPLOYED,
    names::MEDIAN_HH_INCOME,
    names::AGE_LE_24,
    names::AGE_25_34,
    names::AGE_35_44,
    names::AGE_45_54,
    names::AGE_55_64,
    names::AGE_65_74,
    names::AGE_75_84,
    names::AGE_85_GE,
    names::POP_DENSITY,
];

/// Synthetic county-day table with roughly 3% of covariate cells missing.
fn create_table(counties: usize) -> String {
    let start = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
    let mut out = format!(
        "{},{},{},{},{},{},{},{},{},{},{}\n",
        names::COUNTY_FIP,
        names::STATE_CODE,
        names::DATE,
        names::CONFIRMED,
        names::DEATHS,
        names::STAY_HOME,
        names::PHASE_1,
        names::PHASE_2,
        names::PHASE_3,
        names::POP_TOTAL,
        NUMERIC.join(",")
    );

    for c in 0..counties {
        let fip = 1001 + 2 * c;
        let state = ["AL", "GA", "TX", "OH"][c % 4];
        let pop = 5_000 + 1_000 * (c % 17);
        for d in 0..DAYS {
            let date = start + Duration::days(d as i64);
            let confirmed = d * (1 + c % 5);
            let deaths = confirmed / 40;
            let stay = if d >= 20 { "1" } else { "0" };
            let phase = if d >= 60 { "1" } else { "0" };
            out.push_str(&format!(
                "{fip},{state},{},{confirmed},{deaths},{stay},{phase},0,0,{pop}",
                date.format("%Y-%m-%d")
            ));
            for (k, _) in NUMERIC.iter().enumerate() {
                let missing = (c * 31 + d * 7 + k * 13) % 33 == 0 && k < 11;
                if missing {
                    out.push(',');
                } else {
                    out.push_str(&format!(",{}", 10 + (c + d + k) % 50));
                }
            }
            out.push('\n');
        }
    }
    out
}

/// Benchmark monotonicity correction.
fn bench_correction(c: &mut Criterion) {
    let mut group = c.benchmark_group("correction");

    let series: Vec<i64> = (0..10_000)
        .map(|i| if i % 97 == 0 { i / 2 } else { i })
        .collect();
    group.throughput(Throughput::Elements(series.len() as u64));
    group.bench_function("correct_10000", |b| {
        b.iter(|| {
            let mut s = series.clone();
            black_box(MonotonicityCorrector::correct(black_box(&mut s)))
        });
    });

    group.finish();
}

/// Benchmark the imputation cascades alone.
fn bench_imputation(c: &mut Criterion) {
    let mut group = c.benchmark_group("imputation");

    let table = create_table(100);
    let panel = PanelLoader::default()
        .load_reader(table.as_bytes())
        .unwrap()
        .sorted()
        .unwrap();
    let imputer = Imputer::new(&ImputationConfig::default());

    group.throughput(Throughput::Elements(panel.len() as u64));
    group.bench_function("impute_all_100_counties", |b| {
        b.iter(|| black_box(imputer.impute_all(black_box(panel.clone())).unwrap()));
    });

    group.finish();
}

/// Benchmark the full pipeline from raw bytes.
fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(20);

    let pipeline = Pipeline::from_config(PipelineConfig::default()).unwrap();
    for counties in [50usize, 200] {
        let table = create_table(counties);
        group.throughput(Throughput::Elements((counties * DAYS) as u64));
        group.bench_with_input(
            BenchmarkId::new("process_bytes", counties),
            &table,
            |b, table| {
                b.iter(|| black_box(pipeline.process_bytes(black_box(table.as_bytes())).unwrap()));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_correction, bench_imputation, bench_pipeline);

criterion_main!(benches);
