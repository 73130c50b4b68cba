//! The agent record.
//!
//! Agents never hold references to each other. Relationships are sets of
//! `AgentId`s resolved through the `Population` registry, which is the
//! only place links are created or removed.

use crate::types::{AgentId, Behaviour, Level, RelationKind, Sex, BEHAVIOUR_COUNT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Current level of each of the four behaviours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviourLevels([Level; BEHAVIOUR_COUNT]);

impl BehaviourLevels {
    pub fn new(smoking: Level, alcohol: Level, diet: Level, inactivity: Level) -> Self {
        Self([smoking, alcohol, diet, inactivity])
    }

    pub fn all(level: Level) -> Self {
        Self([level; BEHAVIOUR_COUNT])
    }

    pub fn get(&self, behaviour: Behaviour) -> Level {
        self.0[behaviour.index()]
    }

    pub fn set(&mut self, behaviour: Behaviour, level: Level) {
        self.0[behaviour.index()] = level;
    }

    pub fn with(mut self, behaviour: Behaviour, level: Level) -> Self {
        self.set(behaviour, level);
        self
    }
}

impl Default for BehaviourLevels {
    fn default() -> Self {
        Self::all(Level::Low)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id:             AgentId,
    pub sex:            Sex,
    pub age:            u32,
    /// Deprivation quintile, 1 (least) to 5 (most deprived).
    pub imd:            u8,
    pub levels:         BehaviourLevels,
    pub cv_chance:      f64,
    pub spouse:         Option<AgentId>,
    pub household:      BTreeSet<AgentId>,
    pub workplace:      BTreeSet<AgentId>,
    pub workplace_type: Option<String>,
    pub friends:        BTreeSet<AgentId>,
    /// Selects the intervention weight table for this agent's incoming influence.
    pub intervention:   bool,
}

impl Agent {
    /// An unlinked agent. The id is assigned when it joins a `Population`.
    pub fn new(sex: Sex, age: u32, imd: u8) -> Self {
        Self {
            id: AgentId(0),
            sex,
            age,
            imd,
            levels: BehaviourLevels::default(),
            cv_chance: 0.0,
            spouse: None,
            household: BTreeSet::new(),
            workplace: BTreeSet::new(),
            workplace_type: None,
            friends: BTreeSet::new(),
            intervention: false,
        }
    }

    pub fn with_levels(mut self, levels: BehaviourLevels) -> Self {
        self.levels = levels;
        self
    }

    pub fn with_workplace_type(mut self, workplace_type: impl Into<String>) -> Self {
        self.workplace_type = Some(workplace_type.into());
        self
    }

    pub fn with_intervention(mut self, intervention: bool) -> Self {
        self.intervention = intervention;
        self
    }

    pub fn level(&self, behaviour: Behaviour) -> Level {
        self.levels.get(behaviour)
    }

    /// One timestep survived.
    pub fn age_up(&mut self) {
        self.age += 1;
    }

    /// Neighbours of one relation kind, in ascending id order.
    pub fn neighbours(&self, relation: RelationKind) -> Vec<AgentId> {
        match relation {
            RelationKind::Spouse => self.spouse.into_iter().collect(),
            RelationKind::Household => self.household.iter().copied().collect(),
            RelationKind::Workplace => self.workplace.iter().copied().collect(),
            RelationKind::Friendship => self.friends.iter().copied().collect(),
        }
    }

    pub fn is_isolated(&self) -> bool {
        self.spouse.is_none()
            && self.household.is_empty()
            && self.workplace.is_empty()
            && self.friends.is_empty()
    }
}
