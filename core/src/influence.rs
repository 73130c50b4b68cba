//! Social influence aggregation.
//!
//! For one agent, every neighbour contributes the weight its current
//! level carries in the agent's active table, into that level's bucket.
//! Relations are visited in the canonical order Spouse, Household,
//! Workplace, Friendship, and neighbours in ascending id, so the floating
//! point sums are reproducible.

use crate::{
    agent::Agent,
    error::SimResult,
    population::Population,
    types::{Behaviour, Level, RelationKind, BEHAVIOUR_COUNT, LEVEL_COUNT},
    weights::{BehaviourWeights, InfluenceWeights},
};
use serde::{Deserialize, Serialize};

/// Accumulated weight per behaviour and neighbour level.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IncomingInfluence([[f64; LEVEL_COUNT]; BEHAVIOUR_COUNT]);

impl IncomingInfluence {
    pub fn zeroed() -> Self {
        Self::default()
    }

    pub fn get(&self, behaviour: Behaviour) -> &[f64; LEVEL_COUNT] {
        &self.0[behaviour.index()]
    }

    pub fn level(&self, behaviour: Behaviour, level: Level) -> f64 {
        self.0[behaviour.index()][level.index()]
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().flatten().all(|w| *w == 0.0)
    }

    /// Add one neighbour's contribution for every behaviour.
    fn absorb(&mut self, weights: &BehaviourWeights, neighbour: &Agent) {
        for behaviour in Behaviour::ALL {
            let level = neighbour.level(behaviour);
            self.0[behaviour.index()][level.index()] += weights.get(behaviour, level);
        }
    }
}

/// Influence acting on `agent` from its current neighbours.
///
/// Reads only; nothing in the population changes.
pub fn aggregate(
    population: &Population,
    agent: &Agent,
    weights: &InfluenceWeights,
) -> SimResult<IncomingInfluence> {
    let table = weights.for_agent(agent);
    let mut influence = IncomingInfluence::zeroed();

    for relation in RelationKind::ALL {
        let neighbours = agent.neighbours(relation);
        if neighbours.is_empty() {
            continue;
        }
        let relation_weights = table.relation(relation, agent.workplace_type.as_deref())?;
        for neighbour_id in neighbours {
            let neighbour = population.neighbour(agent.id, neighbour_id, relation)?;
            influence.absorb(relation_weights, neighbour);
        }
    }

    Ok(influence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        agent::BehaviourLevels,
        error::SimError,
        types::Sex,
        weights::RelationshipWeightTable,
    };

    fn spouse_smoking_only() -> InfluenceWeights {
        let mut table = RelationshipWeightTable::uniform("baseline", 0.0, &["office"]);
        table
            .set_weight(RelationKind::Spouse, None, Behaviour::Smoking, Level::High, 1.0)
            .unwrap();
        InfluenceWeights::shared(table)
    }

    #[test]
    fn isolated_agent_receives_nothing() {
        let mut pop = Population::new();
        let a = pop.insert(Agent::new(Sex::Female, 40, 1));
        let weights = InfluenceWeights::shared(RelationshipWeightTable::uniform("b", 0.7, &["office"]));

        let influence = aggregate(&pop, pop.get(a).unwrap(), &weights).unwrap();
        assert!(influence.is_zero());
    }

    #[test]
    fn spouse_level_lands_in_its_bucket() {
        let mut pop = Population::new();
        let a = pop.insert(Agent::new(Sex::Female, 40, 1));
        let b = pop.insert(
            Agent::new(Sex::Male, 42, 1)
                .with_levels(BehaviourLevels::all(Level::Low).with(Behaviour::Smoking, Level::High)),
        );
        pop.link_spouses(a, b).unwrap();

        let influence = aggregate(&pop, pop.get(a).unwrap(), &spouse_smoking_only()).unwrap();
        assert_eq!(influence.get(Behaviour::Smoking), &[0.0, 0.0, 1.0]);
        assert_eq!(influence.get(Behaviour::Alcohol), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn contributions_sum_across_relations() {
        let mut pop = Population::new();
        let a = pop.insert(Agent::new(Sex::Female, 40, 1).with_workplace_type("office"));
        let hm = pop.insert(Agent::new(Sex::Male, 20, 1));
        let colleague = pop.insert(Agent::new(Sex::Male, 33, 1).with_workplace_type("office"));
        let friend = pop.insert(
            Agent::new(Sex::Female, 38, 1).with_levels(BehaviourLevels::all(Level::Medium)),
        );
        pop.link_household(a, hm).unwrap();
        pop.link_workplace(a, colleague).unwrap();
        pop.link_friends(a, friend).unwrap();

        let weights = InfluenceWeights::shared(RelationshipWeightTable::uniform("b", 0.25, &["office"]));
        let influence = aggregate(&pop, pop.get(a).unwrap(), &weights).unwrap();
        for behaviour in Behaviour::ALL {
            assert_eq!(influence.get(behaviour), &[0.5, 0.25, 0.0]);
        }
    }

    #[test]
    fn intervention_agents_use_intervention_table() {
        let mut pop = Population::new();
        let a = pop.insert(Agent::new(Sex::Female, 40, 1).with_intervention(true));
        let b = pop.insert(Agent::new(Sex::Male, 42, 1));
        pop.link_friends(a, b).unwrap();

        let weights = InfluenceWeights::new(
            RelationshipWeightTable::uniform("baseline", 0.9, &["office"]),
            RelationshipWeightTable::uniform("intervention", 0.1, &["office"]),
        );
        let influence = aggregate(&pop, pop.get(a).unwrap(), &weights).unwrap();
        assert_eq!(influence.level(Behaviour::Diet, Level::Low), 0.1);
        let influence_b = aggregate(&pop, pop.get(b).unwrap(), &weights).unwrap();
        assert_eq!(influence_b.level(Behaviour::Diet, Level::Low), 0.9);
    }

    #[test]
    fn colleague_without_workplace_type_is_missing_weight() {
        let mut pop = Population::new();
        let a = pop.insert(Agent::new(Sex::Female, 40, 1));
        let b = pop.insert(Agent::new(Sex::Male, 42, 1).with_workplace_type("office"));
        pop.link_workplace(a, b).unwrap();

        let weights = InfluenceWeights::shared(RelationshipWeightTable::uniform("b", 0.2, &["office"]));
        assert!(matches!(
            aggregate(&pop, pop.get(a).unwrap(), &weights),
            Err(SimError::MissingWeight { .. })
        ));
    }
}
