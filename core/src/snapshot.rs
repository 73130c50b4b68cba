//! Snapshot serialization of run state to JSON.
//!
//! A snapshot is taken every SNAPSHOT_INTERVAL timesteps. It captures the
//! living population (with all links), the incidence grids and the latest
//! analytics, enough to inspect or compare a run mid-way.

use crate::{
    agent::Agent,
    clock::SimClock,
    incidence::IncidenceTracker,
    metrics_subsystem::AnalyticsSnapshot,
    state::SimulationState,
    types::{RunId, Tick},
};
use serde::{Deserialize, Serialize};

pub const SNAPSHOT_INTERVAL: Tick = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimSnapshot {
    pub run_id:       RunId,
    /// Timesteps completed when the snapshot was taken.
    pub tick:         Tick,
    pub clock:        SimClock,
    pub total_deaths: usize,
    pub incidence:    IncidenceTracker,
    pub analytics:    Option<AnalyticsSnapshot>,
    pub agents:       Vec<Agent>,
}

impl SimSnapshot {
    pub fn capture(run_id: &str, tick: Tick, clock: &SimClock, state: &SimulationState) -> Self {
        Self {
            run_id:       run_id.to_string(),
            tick,
            clock:        clock.clone(),
            total_deaths: state.total_deaths(),
            incidence:    state.incidence.clone(),
            analytics:    state.latest_analytics().cloned(),
            agents:       state.population.iter().cloned().collect(),
        }
    }
}
