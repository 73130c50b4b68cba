//! Cross-run result tables.
//!
//! Every finished run appends its incidence table and, when collected,
//! its behaviour metrics under an experiment name. Reading an experiment
//! back gives one series per key, in the order runs were appended.

use super::SimStore;
use crate::{
    behaviour_metrics::BehaviourMetrics,
    error::SimResult,
    incidence::{IncidenceReport, IncidenceRow},
};
use rusqlite::params;
use std::collections::BTreeMap;

impl SimStore {
    pub fn append_incidence_run(
        &self,
        experiment: &str,
        run_id: &str,
        report: &IncidenceReport,
    ) -> SimResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        for (order, row) in report.all_rows().enumerate() {
            tx.execute(
                "INSERT INTO incidence_run (
                    experiment, run_id, age_group, row_order,
                    f_incidents, f_years, f_rate, m_incidents, m_years, m_rate
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    experiment,
                    run_id,
                    row.age_group,
                    order as i64,
                    row.f_incidents as i64,
                    row.f_years as i64,
                    row.f_rate,
                    row.m_incidents as i64,
                    row.m_years as i64,
                    row.m_rate,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Incidence rows per age group ("total" included), one per run.
    pub fn incidence_history(&self, experiment: &str) -> SimResult<BTreeMap<String, Vec<IncidenceRow>>> {
        let mut stmt = self.conn.prepare(
            "SELECT age_group, f_incidents, f_years, f_rate, m_incidents, m_years, m_rate
             FROM incidence_run WHERE experiment = ?1
             ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![experiment], |r| {
            Ok(IncidenceRow {
                age_group:   r.get(0)?,
                f_incidents: r.get::<_, i64>(1)? as u64,
                f_years:     r.get::<_, i64>(2)? as u64,
                f_rate:      r.get(3)?,
                m_incidents: r.get::<_, i64>(4)? as u64,
                m_years:     r.get::<_, i64>(5)? as u64,
                m_rate:      r.get(6)?,
            })
        })?;
        let mut history: BTreeMap<String, Vec<IncidenceRow>> = BTreeMap::new();
        for row in rows {
            let row = row?;
            history.entry(row.age_group.clone()).or_default().push(row);
        }
        Ok(history)
    }

    /// Distinct runs recorded for an experiment, oldest first.
    pub fn experiment_runs(&self, experiment: &str) -> SimResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id FROM incidence_run WHERE experiment = ?1
             GROUP BY run_id ORDER BY MIN(id) ASC",
        )?;
        let runs = stmt
            .query_map(params![experiment], |r| r.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(runs)
    }

    pub fn append_behaviour_metrics(
        &self,
        experiment: &str,
        run_id: &str,
        metrics: &BehaviourMetrics,
    ) -> SimResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        for (order, metric) in metrics.metrics.iter().enumerate() {
            tx.execute(
                "INSERT INTO behaviour_metric_run (experiment, run_id, metric_order, name, value)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![experiment, run_id, order as i64, metric.name, metric.value],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Metric values per name, one per run.
    pub fn behaviour_metric_history(&self, experiment: &str) -> SimResult<BTreeMap<String, Vec<Option<f64>>>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, value FROM behaviour_metric_run WHERE experiment = ?1
             ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![experiment], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, Option<f64>>(1)?))
        })?;
        let mut history: BTreeMap<String, Vec<Option<f64>>> = BTreeMap::new();
        for row in rows {
            let (name, value) = row?;
            history.entry(name).or_default().push(value);
        }
        Ok(history)
    }
}
