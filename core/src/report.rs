//! End-of-run report and its file outputs.

use crate::{
    behaviour_metrics::BehaviourMetrics,
    demographics::DeathDemographics,
    error::SimResult,
    incidence::{FitScore, IncidenceReport},
    metrics_subsystem::AnalyticsSnapshot,
    types::{RunId, Tick},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything a finished run produced, independent of persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id:             RunId,
    /// Base name shared by the run's output files and its cross-run rows.
    pub experiment:         String,
    pub seed:               u64,
    pub timesteps:          Tick,
    pub initial_population: usize,
    pub final_population:   usize,
    pub total_deaths:       usize,
    pub incidence:          IncidenceReport,
    pub fit:                FitScore,
    pub final_analytics:    AnalyticsSnapshot,
    /// Deaths across the whole run.
    pub deaths:             DeathDemographics,
    pub behaviour_metrics:  Option<BehaviourMetrics>,
}

/// `n-{size}_t-{timesteps}_config-{name}`, prefixed by `expID-{id}_`
/// when an experiment id is given.
pub fn stats_base_filename(size: usize, timesteps: Tick, config_name: &str, exp_id: Option<&str>) -> String {
    let base = format!("n-{size}_t-{timesteps}_config-{config_name}");
    match exp_id {
        Some(id) => format!("expID-{id}_{base}"),
        None => base,
    }
}

/// Write the per-band incidence table (bands then totals) as CSV.
pub fn write_incidence_csv(path: &Path, incidence: &IncidenceReport) -> SimResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in incidence.all_rows() {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_behaviour_metrics(path: &Path, metrics: &BehaviourMetrics) -> SimResult<()> {
    std::fs::write(path, metrics.to_text())?;
    Ok(())
}

/// Write the run's files into `dir`. Returns the paths written.
pub fn write_outputs(dir: &Path, report: &RunReport) -> SimResult<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    let csv_path = dir.join(format!("{}_latest.csv", report.experiment));
    write_incidence_csv(&csv_path, &report.incidence)?;
    written.push(csv_path);

    if let Some(metrics) = &report.behaviour_metrics {
        let txt_path = dir.join(format!("{}_behaviour_metrics.txt", report.experiment));
        write_behaviour_metrics(&txt_path, metrics)?;
        written.push(txt_path);
    }
    log::info!("Wrote {} report file(s) to {}", written.len(), dir.display());
    Ok(written)
}
