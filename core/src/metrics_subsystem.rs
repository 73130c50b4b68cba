//! Per-timestep population analytics.
//!
//! Runs last in each timestep, after behaviour levels were committed and
//! the mortality pass removed this timestep's deaths, so each snapshot
//! describes the survivors as they enter the next timestep.

use crate::{
    error::SimResult,
    event::SimEvent,
    population::Population,
    rng::SubsystemRng,
    state::SimulationState,
    subsystem::SimSubsystem,
    types::{Behaviour, Level, Tick, BEHAVIOUR_COUNT, LEVEL_COUNT},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    /// -1 for the baseline taken before the first timestep.
    pub timestep:      i64,
    pub population:    usize,
    /// Mean CVD probability; undefined for an empty population.
    pub avg_cv_chance: Option<f64>,
    /// Share of agents at each level, per behaviour.
    pub prevalence:    [[Option<f64>; LEVEL_COUNT]; BEHAVIOUR_COUNT],
}

impl AnalyticsSnapshot {
    pub fn collect(timestep: i64, population: &Population) -> Self {
        let n = population.len();
        let mut cv_sum = 0.0;
        let mut counts = [[0usize; LEVEL_COUNT]; BEHAVIOUR_COUNT];
        for agent in population.iter() {
            cv_sum += agent.cv_chance;
            for behaviour in Behaviour::ALL {
                counts[behaviour.index()][agent.level(behaviour).index()] += 1;
            }
        }

        let share = |count: usize| (n > 0).then(|| count as f64 / n as f64);
        let mut prevalence = [[None; LEVEL_COUNT]; BEHAVIOUR_COUNT];
        for (b, row) in counts.iter().enumerate() {
            for (l, count) in row.iter().enumerate() {
                prevalence[b][l] = share(*count);
            }
        }

        if n == 0 {
            log::warn!("Timestep {timestep}: population is empty, analytics undefined");
        }
        Self {
            timestep,
            population: n,
            avg_cv_chance: (n > 0).then(|| cv_sum / n as f64),
            prevalence,
        }
    }

    pub fn prevalence(&self, behaviour: Behaviour, level: Level) -> Option<f64> {
        self.prevalence[behaviour.index()][level.index()]
    }
}

#[derive(Debug, Default)]
pub struct MetricsSubsystem;

impl MetricsSubsystem {
    pub fn new() -> Self {
        Self
    }
}

impl SimSubsystem for MetricsSubsystem {
    fn name(&self) -> &'static str { "metrics" }

    fn update(
        &mut self,
        tick: Tick,
        state: &mut SimulationState,
        _events_in: &[SimEvent],
        _rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        let snapshot = AnalyticsSnapshot::collect(tick as i64, &state.population);
        log::debug!(
            "Timestep {tick}: population {}, mean cv_chance {:?}",
            snapshot.population,
            snapshot.avg_cv_chance
        );
        let event = SimEvent::AnalyticsRecorded {
            tick,
            population: snapshot.population,
            avg_cv_chance: snapshot.avg_cv_chance,
        };
        state.analytics.push(snapshot);
        Ok(vec![event])
    }
}
