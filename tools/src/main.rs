//! spread-runner: headless runner for the CVD spread simulation.
//!
//! Usage:
//!   spread-runner data/default -n 3500 -t 10
//!   spread-runner data/default -n 500 -t 20 -e 7 --metrics --seed 12345

use anyhow::{Context, Result};
use clap::Parser;
use cvd_spread_core::{
    config::{SimConfig, DEFAULT_POPULATION_SIZE, DEFAULT_TIMESTEPS},
    engine::SimEngine,
    network,
    report::{self, RunReport},
    store::SimStore,
    types::new_run_id,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Folder holding the JSON parameter files.
    parameter_folder: PathBuf,

    #[arg(short = 'n', long, default_value_t = DEFAULT_POPULATION_SIZE)]
    size: usize,

    #[arg(short = 't', long = "timestep", default_value_t = DEFAULT_TIMESTEPS)]
    timesteps: u64,

    /// Experiment id, prefixed to output names.
    #[arg(short = 'e', long = "exp_id")]
    exp_id: Option<String>,

    /// Also collect the extended behaviour metrics.
    #[arg(long)]
    metrics: bool,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    #[arg(long, default_value = "./results")]
    results_dir: PathBuf,

    /// SQLite file for the event log and cross-run results.
    /// Defaults to `<results_dir>/runs.db`.
    #[arg(long)]
    db: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = SimConfig::load(&cli.parameter_folder)?;
    let experiment = report::stats_base_filename(
        cli.size,
        cli.timesteps,
        &config.config_name,
        cli.exp_id.as_deref(),
    );

    println!("CVD spread: spread-runner");
    println!("  parameters: {}", cli.parameter_folder.display());
    println!("  size:       {}", cli.size);
    println!("  timesteps:  {}", cli.timesteps);
    println!("  seed:       {}", cli.seed);
    println!("  experiment: {experiment}");
    println!();

    std::fs::create_dir_all(&cli.results_dir)
        .with_context(|| format!("Cannot create {}", cli.results_dir.display()))?;
    let db = cli.db.clone().unwrap_or_else(|| cli.results_dir.join("runs.db"));
    let store = SimStore::open(&db.to_string_lossy())?;
    store.migrate()?;

    let run_id = new_run_id(cli.seed);
    store.insert_run(&run_id, cli.seed, env!("CARGO_PKG_VERSION"))?;

    let population = network::generate_seeded(&config.population, cli.size, cli.seed)?;
    let mut engine = SimEngine::build(run_id, cli.seed, store, &config, population)?;

    engine.run_ticks(cli.timesteps)?;
    let report = engine.finalize(&experiment, cli.metrics)?;

    for path in write_report_files(&cli.results_dir, &report) {
        println!("  wrote {}", path.display());
    }
    if let Err(e) = engine.persist_report(&report) {
        log::error!("Could not append run {} to {}: {e}", report.run_id, db.display());
    }

    print_summary(&report);
    Ok(())
}

/// Write the report files. A failure is logged and leaves the in-memory
/// report usable for the database append and the summary.
fn write_report_files(dir: &Path, report: &RunReport) -> Vec<PathBuf> {
    match report::write_outputs(dir, report) {
        Ok(paths) => paths,
        Err(e) => {
            log::error!("Could not write report files to {}: {e}", dir.display());
            Vec::new()
        }
    }
}

fn print_summary(report: &RunReport) {
    println!();
    println!("=== RUN SUMMARY ===");
    println!("  run_id:          {}", report.run_id);
    println!("  timesteps:       {}", report.timesteps);
    println!("  population:      {} -> {}", report.initial_population, report.final_population);
    println!("  CVD events:      {}", report.total_deaths);
    match report.deaths.avg_age() {
        Some(age) => println!("  mean event age:  {age:.1}"),
        None => println!("  mean event age:  NaN"),
    }
    match report.final_analytics.avg_cv_chance {
        Some(p) => println!("  mean cv_chance:  {p:.4}"),
        None => println!("  mean cv_chance:  NaN"),
    }

    println!();
    println!("=== CALIBRATION ===");
    println!("  absolute error:  {:.2}", report.fit.absolute);
    println!("  under-estimate:  {:.2}", report.fit.under);
    println!("  over-estimate:   {:.2}", report.fit.over);
    if report.fit.undefined_buckets > 0 {
        println!("  empty buckets:   {}", report.fit.undefined_buckets);
    }
}
