//! Agent registry holding the social graph.
//!
//! RULE: Only this module creates or removes relationship links.
//! Every link is written on both ends in one call, and removing an agent
//! deletes it from every incident relation in one call, so the graph can
//! never hold a one-sided or dangling reference.
//!
//! Iteration is always in ascending `AgentId` order.

use crate::{
    agent::Agent,
    error::{SimError, SimResult},
    types::{AgentId, RelationKind},
};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default)]
pub struct Population {
    agents:  BTreeMap<AgentId, Agent>,
    next_id: u32,
}

impl Population {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Add an agent, assigning it the next free id. Any links the record
    /// carries are discarded; use the `link_*` methods.
    pub fn insert(&mut self, mut agent: Agent) -> AgentId {
        let id = AgentId(self.next_id);
        self.next_id += 1;
        agent.id = id;
        agent.spouse = None;
        agent.household.clear();
        agent.workplace.clear();
        agent.friends.clear();
        self.agents.insert(id, agent);
        id
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.agents.contains_key(&id)
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    pub fn agent(&self, id: AgentId) -> SimResult<&Agent> {
        self.agents.get(&id).ok_or(SimError::UnknownAgent { agent: id })
    }

    pub fn agent_mut(&mut self, id: AgentId) -> SimResult<&mut Agent> {
        self.agents.get_mut(&id).ok_or(SimError::UnknownAgent { agent: id })
    }

    /// Ids of all living agents, in processing order.
    pub fn ids(&self) -> Vec<AgentId> {
        self.agents.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    /// Resolve a link from `from` to `to`. A link to an agent that is not
    /// in the registry means a removal missed a back-reference.
    pub fn neighbour(&self, from: AgentId, to: AgentId, relation: RelationKind) -> SimResult<&Agent> {
        self.agents.get(&to).ok_or(SimError::GraphIntegrity {
            agent:     from,
            neighbour: to,
            relation,
        })
    }

    // ── Linking ────────────────────────────────────────────────

    pub fn link_spouses(&mut self, a: AgentId, b: AgentId) -> SimResult<()> {
        self.check_pair(a, b, RelationKind::Spouse)?;
        for (x, y) in [(a, b), (b, a)] {
            if let Some(existing) = self.agent(x)?.spouse {
                if existing != y {
                    return Err(SimError::InvalidConfig(format!(
                        "{x} is already married to {existing}"
                    )));
                }
            }
        }
        self.agent_mut(a)?.spouse = Some(b);
        self.agent_mut(b)?.spouse = Some(a);
        Ok(())
    }

    pub fn link_household(&mut self, a: AgentId, b: AgentId) -> SimResult<()> {
        self.link_sets(a, b, RelationKind::Household)
    }

    pub fn link_workplace(&mut self, a: AgentId, b: AgentId) -> SimResult<()> {
        self.link_sets(a, b, RelationKind::Workplace)
    }

    pub fn link_friends(&mut self, a: AgentId, b: AgentId) -> SimResult<()> {
        self.link_sets(a, b, RelationKind::Friendship)
    }

    fn link_sets(&mut self, a: AgentId, b: AgentId, relation: RelationKind) -> SimResult<()> {
        self.check_pair(a, b, relation)?;
        for (x, y) in [(a, b), (b, a)] {
            if let Some(set) = relation_set_mut(self.agent_mut(x)?, relation) {
                set.insert(y);
            }
        }
        Ok(())
    }

    fn check_pair(&self, a: AgentId, b: AgentId, relation: RelationKind) -> SimResult<()> {
        if a == b {
            return Err(SimError::InvalidConfig(format!(
                "{a} cannot be linked to itself ({relation})"
            )));
        }
        self.agent(a)?;
        self.agent(b)?;
        Ok(())
    }

    // ── Removal ────────────────────────────────────────────────

    /// Remove an agent and unlink it from every neighbour.
    ///
    /// All back-references are verified before anything is mutated; a
    /// neighbour that does not link back is a graph-integrity error and
    /// leaves the registry untouched.
    pub fn remove(&mut self, id: AgentId) -> SimResult<Agent> {
        let agent = self.agent(id)?;
        for relation in RelationKind::ALL {
            for neighbour_id in agent.neighbours(relation) {
                let neighbour = self.neighbour(id, neighbour_id, relation)?;
                if !has_link(neighbour, relation, id) {
                    return Err(SimError::GraphIntegrity {
                        agent:     id,
                        neighbour: neighbour_id,
                        relation,
                    });
                }
            }
        }

        let agent = self
            .agents
            .remove(&id)
            .ok_or(SimError::UnknownAgent { agent: id })?;
        for relation in RelationKind::ALL {
            for neighbour_id in agent.neighbours(relation) {
                let neighbour = self.agent_mut(neighbour_id)?;
                unlink(neighbour, relation, id);
            }
        }
        log::trace!("removed {id} from population ({} remain)", self.agents.len());
        Ok(agent)
    }

    /// Check that every link in the graph is mirrored and points at a
    /// living agent.
    pub fn validate_symmetry(&self) -> SimResult<()> {
        for agent in self.agents.values() {
            for relation in RelationKind::ALL {
                for neighbour_id in agent.neighbours(relation) {
                    let neighbour = self.neighbour(agent.id, neighbour_id, relation)?;
                    if neighbour_id == agent.id || !has_link(neighbour, relation, agent.id) {
                        return Err(SimError::GraphIntegrity {
                            agent: agent.id,
                            neighbour: neighbour_id,
                            relation,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn break_back_reference(&mut self, owner: AgentId, dropped: AgentId, relation: RelationKind) {
        if let Some(agent) = self.agents.get_mut(&owner) {
            unlink(agent, relation, dropped);
        }
    }
}

fn relation_set_mut(agent: &mut Agent, relation: RelationKind) -> Option<&mut BTreeSet<AgentId>> {
    match relation {
        RelationKind::Spouse => None,
        RelationKind::Household => Some(&mut agent.household),
        RelationKind::Workplace => Some(&mut agent.workplace),
        RelationKind::Friendship => Some(&mut agent.friends),
    }
}

fn has_link(agent: &Agent, relation: RelationKind, other: AgentId) -> bool {
    match relation {
        RelationKind::Spouse => agent.spouse == Some(other),
        RelationKind::Household => agent.household.contains(&other),
        RelationKind::Workplace => agent.workplace.contains(&other),
        RelationKind::Friendship => agent.friends.contains(&other),
    }
}

fn unlink(agent: &mut Agent, relation: RelationKind, other: AgentId) {
    match relation {
        RelationKind::Spouse => {
            if agent.spouse == Some(other) {
                agent.spouse = None;
            }
        }
        _ => {
            if let Some(set) = relation_set_mut(agent, relation) {
                set.remove(&other);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sex;

    fn household_of_three() -> (Population, AgentId, AgentId, AgentId) {
        let mut pop = Population::new();
        let a = pop.insert(Agent::new(Sex::Female, 40, 2));
        let b = pop.insert(Agent::new(Sex::Male, 42, 2));
        let c = pop.insert(Agent::new(Sex::Female, 12, 2));
        pop.link_spouses(a, b).unwrap();
        pop.link_household(a, b).unwrap();
        pop.link_household(a, c).unwrap();
        pop.link_household(b, c).unwrap();
        pop.link_friends(a, c).unwrap();
        (pop, a, b, c)
    }

    #[test]
    fn links_are_symmetric() {
        let (pop, a, b, c) = household_of_three();
        assert_eq!(pop.get(a).unwrap().spouse, Some(b));
        assert_eq!(pop.get(b).unwrap().spouse, Some(a));
        assert!(pop.get(c).unwrap().household.contains(&a));
        assert!(pop.get(c).unwrap().friends.contains(&a));
        pop.validate_symmetry().unwrap();
    }

    #[test]
    fn remove_unlinks_every_relation() {
        let (mut pop, a, b, c) = household_of_three();
        let removed = pop.remove(a).unwrap();
        assert_eq!(removed.id, a);
        assert_eq!(pop.len(), 2);
        assert_eq!(pop.get(b).unwrap().spouse, None);
        assert!(!pop.get(b).unwrap().household.contains(&a));
        assert!(!pop.get(c).unwrap().household.contains(&a));
        assert!(!pop.get(c).unwrap().friends.contains(&a));
        pop.validate_symmetry().unwrap();

        pop.remove(b).unwrap();
        assert!(pop.get(c).unwrap().is_isolated());
    }

    #[test]
    fn remove_with_missing_back_reference_fails_untouched() {
        let (mut pop, a, _b, c) = household_of_three();
        pop.break_back_reference(c, a, RelationKind::Friendship);

        let err = pop.remove(a).unwrap_err();
        assert!(matches!(
            err,
            SimError::GraphIntegrity { relation: RelationKind::Friendship, .. }
        ));
        assert_eq!(pop.len(), 3, "a failed removal must not mutate the registry");
        assert!(pop.validate_symmetry().is_err());
    }

    #[test]
    fn self_links_and_second_spouses_are_rejected() {
        let (mut pop, a, _b, c) = household_of_three();
        assert!(pop.link_friends(a, a).is_err());
        assert!(pop.link_spouses(a, c).is_err());
    }

    #[test]
    fn ids_are_never_reused() {
        let (mut pop, a, _b, _c) = household_of_three();
        pop.remove(a).unwrap();
        let d = pop.insert(Agent::new(Sex::Male, 30, 1));
        assert_ne!(d, a);
        assert!(!pop.contains(a));
    }
}
