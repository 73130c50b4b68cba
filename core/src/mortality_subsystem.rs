//! CVD event testing.
//!
//! For each living agent in id order:
//!   1. in-band agents accrue a person-year (before the test, so a
//!      decedent contributes both a year and an event)
//!   2. the risk model sets `cv_chance`
//!   3. one Bernoulli trial: success removes the agent from the graph,
//!      failure ages it by a year
//!
//! Ids are collected before the pass; removals never disturb iteration.

use crate::{
    agent::Agent,
    demographics::DeathDemographics,
    error::SimResult,
    event::SimEvent,
    risk::RiskModel,
    rng::SubsystemRng,
    state::SimulationState,
    subsystem::SimSubsystem,
    types::{AgeBand, Tick},
};

pub struct MortalitySubsystem {
    risk: Box<dyn RiskModel>,
}

impl MortalitySubsystem {
    pub fn new(risk: Box<dyn RiskModel>) -> Self {
        Self { risk }
    }

    fn assess(&self, agent: &Agent) -> f64 {
        let chance = self.risk.cv_chance(agent);
        if chance.is_nan() { 0.0 } else { chance.clamp(0.0, 1.0) }
    }
}

impl SimSubsystem for MortalitySubsystem {
    fn name(&self) -> &'static str { "mortality" }

    /// Score every agent so the baseline analytics carry real risk.
    fn initialize(&mut self, state: &mut SimulationState) -> SimResult<()> {
        for id in state.population.ids() {
            let agent = state.population.agent(id)?;
            let chance = self.assess(agent);
            state.population.agent_mut(id)?.cv_chance = chance;
        }
        Ok(())
    }

    fn update(
        &mut self,
        tick: Tick,
        state: &mut SimulationState,
        _events_in: &[SimEvent],
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        let mut events = Vec::new();
        let mut demographics = DeathDemographics::default();
        let mut deceased = Vec::new();

        for id in state.population.ids() {
            let agent = state.population.agent_mut(id)?;
            let band = AgeBand::from_age(agent.age);
            if let Some(band) = band {
                state.incidence.add_person_year(agent.sex, band);
            }

            agent.cv_chance = self.assess(agent);

            if !rng.chance(agent.cv_chance) {
                agent.age_up();
                continue;
            }

            let removed = state.population.remove(id)?;
            if let Some(band) = band {
                state.incidence.record_event(removed.sex, band);
            }
            demographics.record(&removed);
            events.push(SimEvent::AgentDied {
                tick,
                agent_id:  removed.id,
                sex:       removed.sex,
                age:       removed.age,
                imd:       removed.imd,
                cv_chance: removed.cv_chance,
            });
            deceased.push(removed);
        }

        let deaths = deceased.len();
        state.deceased.entry(tick).or_default().extend(deceased);
        state.death_demographics.push(demographics);
        events.push(SimEvent::MortalityPassCompleted {
            tick,
            survivors: state.population.len(),
            deaths,
        });
        log::debug!(
            "Timestep {tick}: {deaths} CVD events ({} model), {} survivors",
            self.risk.name(),
            state.population.len()
        );
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        population::Population,
        risk::ConstantRisk,
        rng::{RngBank, SubsystemSlot},
        types::Sex,
    };

    fn run_once(population: Population, p: f64) -> (SimulationState, Vec<SimEvent>) {
        let mut state = SimulationState::new(population);
        let mut subsystem = MortalitySubsystem::new(Box::new(ConstantRisk(p)));
        let mut rng = RngBank::new(9).for_subsystem_at_tick(SubsystemSlot::Mortality, 0);
        let events = subsystem.update(0, &mut state, &[], &mut rng).unwrap();
        (state, events)
    }

    #[test]
    fn certain_death_removes_everyone_and_unlinks() {
        let mut pop = Population::new();
        let a = pop.insert(Agent::new(Sex::Male, 50, 2));
        let b = pop.insert(Agent::new(Sex::Female, 90, 3));
        pop.link_spouses(a, b).unwrap();

        let (state, events) = run_once(pop, 1.0);
        assert!(state.population.is_empty());
        assert_eq!(state.deceased[&0].len(), 2);
        assert_eq!(state.death_demographics[0].total, 2);
        assert_eq!(events.len(), 3);

        // The 90-year-old is outside the age bands and never counted.
        let band = AgeBand::from_age(50).unwrap();
        assert_eq!(state.incidence.person_years(Sex::Male, band), 1);
        assert_eq!(state.incidence.cvd_count(Sex::Male, band), 1);
        assert_eq!(state.incidence.total_person_years(Sex::Female), 0);
    }

    #[test]
    fn survivors_age_by_one_year() {
        let mut pop = Population::new();
        let a = pop.insert(Agent::new(Sex::Female, 84, 1));
        let (state, _) = run_once(pop, 0.0);
        let agent = state.population.agent(a).unwrap();
        assert_eq!(agent.age, 85);
        assert_eq!(agent.cv_chance, 0.0);
        assert_eq!(state.incidence.total_person_years(Sex::Female), 1);
        assert!(state.deceased[&0].is_empty());
    }

    #[test]
    fn initialize_scores_everyone_without_ageing() {
        let mut pop = Population::new();
        let a = pop.insert(Agent::new(Sex::Female, 40, 1));
        let b = pop.insert(Agent::new(Sex::Male, 60, 4));
        let mut state = SimulationState::new(pop);
        let mut subsystem = MortalitySubsystem::new(Box::new(ConstantRisk(0.25)));
        subsystem.initialize(&mut state).unwrap();

        for id in [a, b] {
            assert_eq!(state.population.agent(id).unwrap().cv_chance, 0.25);
        }
        assert_eq!(state.population.agent(a).unwrap().age, 40);
        assert_eq!(state.incidence.total_person_years(Sex::Female), 0);
        assert!(state.deceased.is_empty());
    }

    #[test]
    fn out_of_range_risk_is_clamped() {
        let mut pop = Population::new();
        let a = pop.insert(Agent::new(Sex::Female, 40, 1));
        let (state, _) = run_once(pop, -3.0);
        assert_eq!(state.population.agent(a).unwrap().cv_chance, 0.0);
    }
}
