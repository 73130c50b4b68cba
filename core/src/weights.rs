//! Relationship influence weights.
//!
//! A table maps relation kind × behaviour × neighbour level to an
//! influence weight in [0, 1]. Tables are validated when built: a missing
//! key is a load-time error, never a silent zero at run time.

use crate::{
    agent::Agent,
    error::{SimError, SimResult},
    types::{Behaviour, Level, RelationKind, BEHAVIOUR_COUNT, LEVEL_COUNT},
};
use serde::Deserialize;
use std::collections::BTreeMap;

/// behaviour name → level ("0" | "1" | "2") → weight, as written on disk.
pub type RawBehaviourWeights = BTreeMap<String, BTreeMap<String, f64>>;

/// On-disk shape of one weight table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeightTableFile {
    #[serde(rename = "Spouse", default)]
    pub spouse: Option<RawBehaviourWeights>,
    #[serde(rename = "Household", default)]
    pub household: Option<RawBehaviourWeights>,
    #[serde(rename = "Friendship", default)]
    pub friendship: Option<RawBehaviourWeights>,
    /// workplace type → behaviour weights.
    #[serde(rename = "Workplace", default)]
    pub workplace: Option<BTreeMap<String, RawBehaviourWeights>>,
}

/// Weights for one relation: behaviour × neighbour level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BehaviourWeights([[f64; LEVEL_COUNT]; BEHAVIOUR_COUNT]);

impl BehaviourWeights {
    pub fn uniform(weight: f64) -> Self {
        Self([[weight; LEVEL_COUNT]; BEHAVIOUR_COUNT])
    }

    pub fn get(&self, behaviour: Behaviour, level: Level) -> f64 {
        self.0[behaviour.index()][level.index()]
    }

    fn set(&mut self, behaviour: Behaviour, level: Level, weight: f64) {
        self.0[behaviour.index()][level.index()] = weight;
    }

    fn from_raw(table: &str, prefix: &str, raw: &RawBehaviourWeights) -> SimResult<Self> {
        let mut weights = Self::uniform(0.0);
        for behaviour in Behaviour::ALL {
            let by_level = raw.get(behaviour.name()).ok_or_else(|| SimError::MissingWeight {
                table: table.to_string(),
                key:   format!("{prefix}/{behaviour}"),
            })?;
            for level in Level::ALL {
                let key = format!("{prefix}/{behaviour}/{level}");
                let value = by_level.get(&level.to_string()).copied().ok_or_else(|| {
                    SimError::MissingWeight {
                        table: table.to_string(),
                        key:   key.clone(),
                    }
                })?;
                check_weight(table, &key, value)?;
                weights.set(behaviour, level, value);
            }
        }
        Ok(weights)
    }
}

fn check_weight(table: &str, key: &str, value: f64) -> SimResult<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SimError::InvalidWeight {
            table: table.to_string(),
            key:   key.to_string(),
            value,
        })
    }
}

/// Immutable influence lookup for one cohort (baseline or intervention).
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipWeightTable {
    name:       String,
    spouse:     BehaviourWeights,
    household:  BehaviourWeights,
    friendship: BehaviourWeights,
    workplace:  BTreeMap<String, BehaviourWeights>,
}

impl RelationshipWeightTable {
    /// Validate an on-disk table. Every relation, behaviour and level
    /// must be present; at least one workplace type must be defined.
    pub fn from_file(name: &str, file: &WeightTableFile) -> SimResult<Self> {
        let missing = |relation: RelationKind| SimError::MissingWeight {
            table: name.to_string(),
            key:   relation.name().to_string(),
        };
        let spouse = file.spouse.as_ref().ok_or_else(|| missing(RelationKind::Spouse))?;
        let household = file.household.as_ref().ok_or_else(|| missing(RelationKind::Household))?;
        let friendship = file.friendship.as_ref().ok_or_else(|| missing(RelationKind::Friendship))?;
        let workplace_raw = file
            .workplace
            .as_ref()
            .filter(|w| !w.is_empty())
            .ok_or_else(|| missing(RelationKind::Workplace))?;

        let mut workplace = BTreeMap::new();
        for (workplace_type, raw) in workplace_raw {
            let prefix = format!("Workplace/{workplace_type}");
            workplace.insert(
                workplace_type.clone(),
                BehaviourWeights::from_raw(name, &prefix, raw)?,
            );
        }

        Ok(Self {
            name:       name.to_string(),
            spouse:     BehaviourWeights::from_raw(name, "Spouse", spouse)?,
            household:  BehaviourWeights::from_raw(name, "Household", household)?,
            friendship: BehaviourWeights::from_raw(name, "Friendship", friendship)?,
            workplace,
        })
    }

    /// Every entry set to `weight`, for the given workplace types.
    pub fn uniform(name: &str, weight: f64, workplace_types: &[&str]) -> Self {
        Self {
            name:       name.to_string(),
            spouse:     BehaviourWeights::uniform(weight),
            household:  BehaviourWeights::uniform(weight),
            friendship: BehaviourWeights::uniform(weight),
            workplace:  workplace_types
                .iter()
                .map(|t| (t.to_string(), BehaviourWeights::uniform(weight)))
                .collect(),
        }
    }

    /// Override a single entry before the table is handed to the engine.
    pub fn set_weight(
        &mut self,
        relation: RelationKind,
        workplace_type: Option<&str>,
        behaviour: Behaviour,
        level: Level,
        weight: f64,
    ) -> SimResult<()> {
        let key = entry_key(relation, workplace_type, behaviour, level);
        check_weight(&self.name, &key, weight)?;
        let table = match relation {
            RelationKind::Spouse => &mut self.spouse,
            RelationKind::Household => &mut self.household,
            RelationKind::Friendship => &mut self.friendship,
            RelationKind::Workplace => {
                let name = &self.name;
                workplace_type
                    .and_then(|t| self.workplace.get_mut(t))
                    .ok_or_else(|| SimError::MissingWeight { table: name.clone(), key })?
            }
        };
        table.set(behaviour, level, weight);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_workplace_type(&self, workplace_type: &str) -> bool {
        self.workplace.contains_key(workplace_type)
    }

    pub fn workplace_types(&self) -> impl Iterator<Item = &str> {
        self.workplace.keys().map(String::as_str)
    }

    /// Sub-table for one relation. Workplace lookups need the acting
    /// agent's workplace type; an unknown type is a missing-weight error.
    pub fn relation(
        &self,
        relation: RelationKind,
        workplace_type: Option<&str>,
    ) -> SimResult<&BehaviourWeights> {
        match relation {
            RelationKind::Spouse => Ok(&self.spouse),
            RelationKind::Household => Ok(&self.household),
            RelationKind::Friendship => Ok(&self.friendship),
            RelationKind::Workplace => workplace_type
                .and_then(|t| self.workplace.get(t))
                .ok_or_else(|| SimError::MissingWeight {
                    table: self.name.clone(),
                    key:   format!("Workplace/{}", workplace_type.unwrap_or("<none>")),
                }),
        }
    }
}

fn entry_key(
    relation: RelationKind,
    workplace_type: Option<&str>,
    behaviour: Behaviour,
    level: Level,
) -> String {
    match (relation, workplace_type) {
        (RelationKind::Workplace, Some(t)) => format!("Workplace/{t}/{behaviour}/{level}"),
        _ => format!("{relation}/{behaviour}/{level}"),
    }
}

/// The two tables a run uses.
#[derive(Debug, Clone)]
pub struct InfluenceWeights {
    pub baseline:     RelationshipWeightTable,
    pub intervention: RelationshipWeightTable,
}

impl InfluenceWeights {
    pub fn new(baseline: RelationshipWeightTable, intervention: RelationshipWeightTable) -> Self {
        Self { baseline, intervention }
    }

    /// Same table for both cohorts.
    pub fn shared(table: RelationshipWeightTable) -> Self {
        Self {
            intervention: table.clone(),
            baseline:     table,
        }
    }

    /// The table that applies when `agent` is the one being influenced.
    pub fn for_agent(&self, agent: &Agent) -> &RelationshipWeightTable {
        if agent.intervention {
            &self.intervention
        } else {
            &self.baseline
        }
    }
}
