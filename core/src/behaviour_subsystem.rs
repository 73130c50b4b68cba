//! Synchronized behaviour update.
//!
//! RULE: no agent's new level is visible to any other agent until the
//! whole population has been evaluated. `propose` reads the population
//! as it stood at the start of the timestep and only returns staged
//! levels; `commit` writes them back in one pass.

use crate::{
    agent::BehaviourLevels,
    error::SimResult,
    event::SimEvent,
    influence,
    population::Population,
    rng::SubsystemRng,
    state::SimulationState,
    subsystem::SimSubsystem,
    transition::TransitionRule,
    types::{AgentId, Behaviour, Tick},
    weights::InfluenceWeights,
};

/// An agent's levels for the next timestep, not yet applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StagedLevels {
    pub agent_id: AgentId,
    pub levels:   BehaviourLevels,
}

/// Evaluate every agent in id order against the current population.
pub fn propose(
    population: &Population,
    weights: &InfluenceWeights,
    rule: &dyn TransitionRule,
    rng: &mut SubsystemRng,
) -> SimResult<Vec<StagedLevels>> {
    let mut staged = Vec::with_capacity(population.len());
    for agent in population.iter() {
        let incoming = influence::aggregate(population, agent, weights)?;
        let mut levels = agent.levels;
        for behaviour in Behaviour::ALL {
            levels.set(behaviour, rule.next_level(agent, behaviour, incoming.get(behaviour), rng));
        }
        staged.push(StagedLevels { agent_id: agent.id, levels });
    }
    Ok(staged)
}

/// Apply staged levels. Returns how many agents changed at least one level.
pub fn commit(population: &mut Population, staged: Vec<StagedLevels>) -> SimResult<usize> {
    let mut changed = 0;
    for entry in staged {
        let agent = population.agent_mut(entry.agent_id)?;
        if agent.levels != entry.levels {
            agent.levels = entry.levels;
            changed += 1;
        }
    }
    Ok(changed)
}

pub struct BehaviourSubsystem {
    weights: InfluenceWeights,
    rule:    Box<dyn TransitionRule>,
}

impl BehaviourSubsystem {
    pub fn new(weights: InfluenceWeights, rule: Box<dyn TransitionRule>) -> Self {
        Self { weights, rule }
    }

    pub fn weights(&self) -> &InfluenceWeights {
        &self.weights
    }
}

impl SimSubsystem for BehaviourSubsystem {
    fn name(&self) -> &'static str { "behaviour" }

    fn update(
        &mut self,
        tick: Tick,
        state: &mut SimulationState,
        _events_in: &[SimEvent],
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        let staged = propose(&state.population, &self.weights, self.rule.as_ref(), rng)?;
        let agents = staged.len();
        let changed = commit(&mut state.population, staged)?;
        log::debug!(
            "Timestep {tick}: {} rule updated {agents} agents, {changed} changed",
            self.rule.name()
        );
        Ok(vec![SimEvent::LevelsCommitted { tick, agents, changed }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        agent::Agent,
        rng::{RngBank, SubsystemSlot},
        transition::StrongestInfluence,
        types::{Level, RelationKind, Sex},
        weights::RelationshipWeightTable,
    };

    fn friends_table() -> InfluenceWeights {
        let mut table = RelationshipWeightTable::uniform("baseline", 0.0, &["office"]);
        for level in Level::ALL {
            table
                .set_weight(RelationKind::Friendship, None, Behaviour::Smoking, level, 1.0)
                .unwrap();
        }
        InfluenceWeights::shared(table)
    }

    #[test]
    fn propose_does_not_touch_population() {
        let mut pop = Population::new();
        let a = pop.insert(Agent::new(Sex::Female, 30, 1));
        let b = pop.insert(
            Agent::new(Sex::Male, 30, 1).with_levels(BehaviourLevels::all(Level::High)),
        );
        pop.link_friends(a, b).unwrap();
        let before: Vec<_> = pop.iter().cloned().collect();

        let mut rng = RngBank::new(1).for_subsystem(SubsystemSlot::Behaviour);
        let staged = propose(&pop, &friends_table(), &StrongestInfluence, &mut rng).unwrap();
        let after: Vec<_> = pop.iter().cloned().collect();
        assert_eq!(before, after);

        assert_eq!(staged[0].levels.get(Behaviour::Smoking), Level::High);
        assert_eq!(staged[1].levels.get(Behaviour::Smoking), Level::Low);
    }

    #[test]
    fn commit_counts_changed_agents() {
        let mut pop = Population::new();
        let a = pop.insert(Agent::new(Sex::Female, 30, 1));
        let b = pop.insert(Agent::new(Sex::Female, 31, 1));
        let staged = vec![
            StagedLevels { agent_id: a, levels: BehaviourLevels::all(Level::Medium) },
            StagedLevels { agent_id: b, levels: BehaviourLevels::default() },
        ];
        assert_eq!(commit(&mut pop, staged).unwrap(), 1);
        assert_eq!(pop.agent(a).unwrap().level(Behaviour::Diet), Level::Medium);
    }
}
