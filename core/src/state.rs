//! Mutable state of one run, shared by the subsystems through the engine.

use crate::{
    agent::Agent,
    demographics::DeathDemographics,
    incidence::IncidenceTracker,
    metrics_subsystem::AnalyticsSnapshot,
    population::Population,
    types::{AgentId, Tick},
};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct SimulationState {
    /// Living agents. Only shrinks.
    pub population:         Population,
    /// Removed agents by the timestep they died in. Append-only.
    pub deceased:           BTreeMap<Tick, Vec<Agent>>,
    pub incidence:          IncidenceTracker,
    /// Baseline (timestep -1) first, then one entry per timestep.
    pub analytics:          Vec<AnalyticsSnapshot>,
    /// Zeroed baseline record first, then one entry per timestep.
    pub death_demographics: Vec<DeathDemographics>,
    /// Population size at the start of each timestep.
    pub population_sizes:   Vec<usize>,
}

impl SimulationState {
    pub fn new(population: Population) -> Self {
        Self {
            population,
            deceased: BTreeMap::new(),
            incidence: IncidenceTracker::new(),
            analytics: Vec::new(),
            death_demographics: Vec::new(),
            population_sizes: Vec::new(),
        }
    }

    pub fn total_deaths(&self) -> usize {
        self.deceased.values().map(Vec::len).sum()
    }

    pub fn latest_analytics(&self) -> Option<&AnalyticsSnapshot> {
        self.analytics.last()
    }

    /// Ids of the agents that died in each timestep.
    pub fn deceased_ids(&self) -> BTreeMap<Tick, Vec<AgentId>> {
        self.deceased
            .iter()
            .map(|(tick, agents)| (*tick, agents.iter().map(|a| a.id).collect()))
            .collect()
    }
}
