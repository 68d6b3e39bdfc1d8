//! Analytics Base Table Build Tool
//!
//! Reads a raw county-day table and writes the finished ABT.
//!
//! # Usage
//!
//! ```bash
//! # Defaults
//! cargo run --release --bin build_abt -- county_day.csv abt.csv
//!
//! # From TOML config
//! cargo run --release --bin build_abt -- --config configs/abt.toml county_day.csv abt.csv
//!
//! # Generate sample config
//! cargo run --release --bin build_abt -- --generate-config configs/abt.toml
//! ```
//!
//! Logging goes through `env_logger` (`RUST_LOG=debug` shows per-step fill
//! counts). On a failed check the tool prints the check, stage and county
//! and exits with status 2; no output file is written.

use county_abt::{
    AbtError, CachePolicy, ExperimentMetadata, Pipeline, PipelineConfig, RunSummary,
};
use std::process;

/// Main entry point for the build tool
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("build_abt");

    if args.len() < 2 {
        print_usage(program);
        process::exit(1);
    }

    match args[1].as_str() {
        "--config" => {
            if args.len() < 5 {
                eprintln!("Error: --config requires <path.toml> <input> <output>");
                process::exit(1);
            }
            let config = match PipelineConfig::load_toml(&args[2]) {
                Ok(c) => {
                    println!("✅ Loaded configuration: {}", args[2]);
                    c
                }
                Err(e) => {
                    eprintln!("❌ Failed to load config: {e}");
                    process::exit(1);
                }
            };
            run(config, &args[3], &args[4]);
        }
        "--generate-config" => {
            if args.len() < 3 {
                eprintln!("Error: --generate-config requires a path argument");
                process::exit(1);
            }
            generate_sample_config(&args[2]);
        }
        "--help" | "-h" => {
            print_usage(program);
        }
        flag if flag.starts_with('-') => {
            eprintln!("Unknown argument: {flag}");
            print_usage(program);
            process::exit(1);
        }
        _ => {
            if args.len() < 3 {
                eprintln!("Error: an output path is required");
                print_usage(program);
                process::exit(1);
            }
            run(PipelineConfig::default(), &args[1], &args[2]);
        }
    }
}

fn print_usage(program: &str) {
    eprintln!(
        r#"
Analytics Base Table Build Tool

Usage:
    {program} <input.csv> <output.csv>                       Build with defaults
    {program} --config <path.toml> <input.csv> <output.csv>  Build from config file
    {program} --generate-config <path>                       Generate sample config file
    {program} --help                                         Show this help

Set RUST_LOG=debug for per-step imputation counts.
"#
    );
}

/// Generate a sample configuration file
fn generate_sample_config(path: &str) {
    let mut config = PipelineConfig::default().with_metadata(ExperimentMetadata {
        name: "county_abt".to_string(),
        description: Some("County-day analytics base table".to_string()),
        created_at: Some(chrono::Utc::now().to_rfc3339()),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
        tags: Some(vec!["covid".to_string(), "county-day".to_string()]),
    });
    config.cache.policy = CachePolicy::ReuseIfPresent;

    match config.save_toml(path) {
        Ok(()) => {
            println!("✅ Generated sample config: {path}");
            println!("\nEdit the following fields before running:");
            println!("  - expected_rows: exact number of input rows (optional)");
            println!("  - cache.dir: where finished tables are cached");
        }
        Err(e) => {
            eprintln!("Error generating config: {e}");
            process::exit(1);
        }
    }
}

fn run(config: PipelineConfig, input: &str, output: &str) {
    let pipeline = match Pipeline::from_config(config) {
        Ok(p) => p,
        Err(e) => fail(&e),
    };
    match pipeline.run(input, output) {
        Ok(summary) => print_summary(&summary),
        Err(e) => fail(&e),
    }
}

fn print_summary(summary: &RunSummary) {
    println!("┌─ ABT Summary ──────────────────────────────────────────────────┐");
    println!("│ Output:     {}", summary.output.display());
    println!("│ Rows:       {}", summary.rows);
    println!("│ Columns:    {}", summary.columns);
    println!("│ Cache key:  {}", summary.cache_key);
    println!("│ Cache hit:  {}", summary.cache_hit);
    if let Some(stats) = &summary.stats {
        println!("│");
        println!("│ Rows loaded:    {}", stats.rows_loaded);
        println!("│ Counties:       {}", stats.counties);
        println!("│ Cells imputed:  {}", stats.imputation.total_filled());
        for family in stats.imputation.families.iter().filter(|f| !f.columns.is_empty()) {
            println!("│   {:<12} {}", family.family.to_string(), family.total_filled());
        }
        println!("│ Trimmed rows:   {}", stats.trim.rows_dropped());
        println!("│ Elapsed:        {:.2?}", stats.elapsed);
    }
    println!("└────────────────────────────────────────────────────────────────┘");
}

fn fail(err: &AbtError) -> ! {
    eprintln!("❌ Build failed: {err}");
    eprintln!("   check:  {}", err.kind());
    if let Some(stage) = err.stage() {
        eprintln!("   stage:  {stage}");
    }
    if let Some(county) = err.county() {
        eprintln!("   county: {county:05}");
    }
    process::exit(2);
}
