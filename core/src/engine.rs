//! The simulation driver.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Behaviour subsystem  (propose for everyone, then commit)
//!   2. Mortality subsystem  (person-time, risk, CVD events, removal)
//!   3. Metrics subsystem    (analytics over the survivors)
//!
//! RULES:
//!   - Subsystems execute in registration order, every timestep.
//!   - No subsystem calls another subsystem's functions directly.
//!   - All randomness flows through the RngBank, one stream per
//!     subsystem per timestep.
//!   - Every subsystem event is recorded in the event log.

use crate::{
    behaviour_metrics::BehaviourMetrics,
    behaviour_subsystem::BehaviourSubsystem,
    clock::SimClock,
    config::SimConfig,
    demographics::DeathDemographics,
    error::{SimError, SimResult},
    event::{EventLogEntry, SimEvent},
    metrics_subsystem::{AnalyticsSnapshot, MetricsSubsystem},
    mortality_subsystem::MortalitySubsystem,
    network,
    population::Population,
    report::RunReport,
    risk::{LifestyleRiskModel, RiskModel},
    rng::{RngBank, SubsystemSlot},
    snapshot::{SimSnapshot, SNAPSHOT_INTERVAL},
    state::SimulationState,
    store::SimStore,
    subsystem::SimSubsystem,
    transition::{InfluenceAdoption, TransitionRule},
    types::{AgentId, RelationKind, RunId, Tick, BASELINE_TIMESTEP},
    weights::InfluenceWeights,
};
use std::collections::BTreeMap;

/// Population size used by `build_test`.
pub const TEST_POPULATION_SIZE: usize = 200;

pub struct SimEngine {
    pub run_id:   RunId,
    pub clock:    SimClock,
    pub rng_bank: RngBank,
    seed:         u64,
    subsystems:   Vec<(SubsystemSlot, Box<dyn SimSubsystem>)>,
    pub store:    SimStore,
    pub state:    SimulationState,
    initial_population: usize,
}

impl SimEngine {
    /// An engine with no subsystems registered.
    pub fn new(run_id: RunId, seed: u64, store: SimStore, population: Population) -> Self {
        Self {
            clock:    SimClock::new(run_id.clone()),
            rng_bank: RngBank::new(seed),
            seed,
            subsystems: Vec::new(),
            store,
            initial_population: population.len(),
            state:    SimulationState::new(population),
            run_id,
        }
    }

    /// Build a fully wired engine from a loaded parameter set.
    pub fn build(
        run_id: RunId,
        seed: u64,
        store: SimStore,
        config: &SimConfig,
        population: Population,
    ) -> SimResult<Self> {
        Self::with_models(
            run_id,
            seed,
            store,
            population,
            config.influence_weights(),
            Box::new(InfluenceAdoption::from_config(&config.transition)),
            Box::new(LifestyleRiskModel::from_config(&config.risk_model)),
        )
    }

    /// Build with explicit collaborators. Rejects a population whose
    /// workplace links cannot be weighted by both tables.
    pub fn with_models(
        run_id: RunId,
        seed: u64,
        store: SimStore,
        population: Population,
        weights: InfluenceWeights,
        rule: Box<dyn TransitionRule>,
        risk: Box<dyn RiskModel>,
    ) -> SimResult<Self> {
        check_workplace_weights(&population, &weights)?;
        let mut engine = SimEngine::new(run_id, seed, store, population);

        // EXECUTION ORDER: fixed, documented, never reordered.
        engine.register(
            SubsystemSlot::Behaviour,
            Box::new(BehaviourSubsystem::new(weights, rule)),
        );
        engine.register(SubsystemSlot::Mortality, Box::new(MortalitySubsystem::new(risk)));
        engine.register(SubsystemSlot::Metrics, Box::new(MetricsSubsystem::new()));
        Ok(engine)
    }

    /// Engine over an in-memory store and a generated test population.
    pub fn build_test(run_id: &str, seed: u64) -> SimResult<Self> {
        let store = SimStore::in_memory()?;
        store.migrate()?;
        store.insert_run(run_id, seed, "test")?;
        let config = SimConfig::default_test();
        let population = network::generate_seeded(&config.population, TEST_POPULATION_SIZE, seed)?;
        Self::build(run_id.to_string(), seed, store, &config, population)
    }

    /// Register a subsystem. Call in the documented execution order.
    pub fn register(&mut self, slot: SubsystemSlot, subsystem: Box<dyn SimSubsystem>) {
        self.subsystems.push((slot, subsystem));
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Validate the graph and record the baseline. Initializing → Running.
    pub fn initialize(&mut self) -> SimResult<()> {
        if !self.clock.is_initializing() {
            return Err(SimError::PhaseViolation {
                expected: "initializing",
                actual:   self.clock.phase.name().to_string(),
            });
        }
        self.state.population.validate_symmetry()?;
        for (_, subsystem) in &mut self.subsystems {
            subsystem.initialize(&mut self.state)?;
        }

        self.state
            .analytics
            .push(AnalyticsSnapshot::collect(BASELINE_TIMESTEP, &self.state.population));
        self.state.death_demographics.push(DeathDemographics::default());

        let event = SimEvent::RunInitialized {
            run_id:     self.run_id.clone(),
            seed:       self.seed,
            population: self.state.population.len(),
        };
        self.log_engine_event(BASELINE_TIMESTEP, &event)?;
        self.clock.begin()?;
        log::info!(
            "Run {} initialized: seed {}, {} agents",
            self.run_id,
            self.seed,
            self.state.population.len()
        );
        Ok(())
    }

    /// Advance one timestep. This is the core simulation step.
    pub fn tick(&mut self) -> SimResult<Vec<SimEvent>> {
        let current_tick = self.clock.advance()?;
        self.state.population_sizes.push(self.state.population.len());

        let mut tick_events: Vec<SimEvent> = vec![SimEvent::TickStarted { tick: current_tick }];

        // Each subsystem sees all events emitted so far this timestep.
        for (slot, subsystem) in &mut self.subsystems {
            let mut rng = self.rng_bank.for_subsystem_at_tick(*slot, current_tick);
            let new_events = subsystem.update(current_tick, &mut self.state, &tick_events, &mut rng)?;

            for event in &new_events {
                let entry = EventLogEntry::new(&self.run_id, current_tick as i64, subsystem.name(), event)?;
                self.store.append_event(&entry)?;
            }

            tick_events.extend(new_events);
        }

        tick_events.push(SimEvent::TickCompleted { tick: current_tick });

        let completed = current_tick + 1;
        if completed.is_multiple_of(SNAPSHOT_INTERVAL) {
            self.take_snapshot(completed)?;
        }

        Ok(tick_events)
    }

    /// Run n timesteps, initializing first if needed.
    pub fn run_ticks(&mut self, n: u64) -> SimResult<()> {
        if self.clock.is_initializing() {
            self.initialize()?;
        }
        for _ in 0..n {
            self.tick()?;
        }
        Ok(())
    }

    /// Close the run and build its report. Running → Finalizing → Done.
    ///
    /// `experiment` names the run's output files and cross-run records;
    /// `behaviour_metrics` enables the extended correlation report.
    pub fn finalize(&mut self, experiment: &str, behaviour_metrics: bool) -> SimResult<RunReport> {
        if self.clock.is_initializing() {
            self.initialize()?;
        }
        self.clock.finalize()?;
        let timesteps = self.clock.completed();

        let final_analytics = self
            .state
            .latest_analytics()
            .cloned()
            .unwrap_or_else(|| AnalyticsSnapshot::collect(timesteps as i64 - 1, &self.state.population));

        let behaviour_metrics = if behaviour_metrics {
            Some(BehaviourMetrics::collect(&self.state.population, final_analytics.avg_cv_chance)?)
        } else {
            None
        };

        let mut deaths = DeathDemographics::default();
        for agent in self.state.deceased.values().flatten() {
            deaths.record(agent);
        }

        let report = RunReport {
            run_id: self.run_id.clone(),
            experiment: experiment.to_string(),
            seed: self.seed,
            timesteps,
            initial_population: self.initial_population,
            final_population: self.state.population.len(),
            total_deaths: self.state.total_deaths(),
            incidence: self.state.incidence.report(),
            fit: self.state.incidence.fit_score(),
            final_analytics,
            deaths,
            behaviour_metrics,
        };

        let event = SimEvent::RunFinalized {
            run_id:       self.run_id.clone(),
            timesteps,
            survivors:    report.final_population,
            total_deaths: report.total_deaths,
        };
        self.log_engine_event(timesteps as i64, &event)?;
        self.clock.finish()?;
        log::info!(
            "Run {} finalized after {timesteps} timesteps: {} deaths, fit {:.2}",
            self.run_id,
            report.total_deaths,
            report.fit.absolute
        );
        Ok(report)
    }

    /// Append the run's results to the cross-run tables.
    pub fn persist_report(&self, report: &RunReport) -> SimResult<()> {
        self.store
            .append_incidence_run(&report.experiment, &report.run_id, &report.incidence)?;
        if let Some(metrics) = &report.behaviour_metrics {
            self.store
                .append_behaviour_metrics(&report.experiment, &report.run_id, metrics)?;
        }
        log::debug!("Persisted run {} under '{}'", report.run_id, report.experiment);
        Ok(())
    }

    /// Query events for a specific timestep from the store.
    /// Used by the determinism test and replay tooling.
    pub fn store_events_for_tick(&self, run_id: &str, tick: i64) -> SimResult<Vec<EventLogEntry>> {
        self.store.events_for_tick(run_id, tick)
    }

    /// Ids of the agents that died in each timestep.
    pub fn deceased_ids(&self) -> BTreeMap<Tick, Vec<AgentId>> {
        self.state.deceased_ids()
    }

    fn log_engine_event(&self, tick: i64, event: &SimEvent) -> SimResult<()> {
        let entry = EventLogEntry::new(&self.run_id, tick, "engine", event)?;
        self.store.append_event(&entry)
    }

    fn take_snapshot(&self, completed: Tick) -> SimResult<()> {
        let snapshot = SimSnapshot::capture(&self.run_id, completed, &self.clock, &self.state);
        let json = serde_json::to_string(&snapshot)?;
        self.store.save_snapshot(&self.run_id, completed, &json)?;
        log::debug!("Snapshot saved after timestep {completed}");
        Ok(())
    }
}

/// Every agent with colleagues needs a workplace type that both tables
/// carry weights for.
fn check_workplace_weights(population: &Population, weights: &InfluenceWeights) -> SimResult<()> {
    for agent in population.iter() {
        if agent.neighbours(RelationKind::Workplace).is_empty() {
            continue;
        }
        for table in [&weights.baseline, &weights.intervention] {
            table.relation(RelationKind::Workplace, agent.workplace_type.as_deref())?;
        }
    }
    Ok(())
}
