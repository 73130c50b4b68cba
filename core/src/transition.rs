//! Behaviour transition rules.
//!
//! A rule turns one behaviour's incoming influence into the agent's next
//! level. Rules only *propose*: they see the agent as it was at the start
//! of the timestep and never write to it. The behaviour subsystem commits
//! the proposals once the whole population has been evaluated.

use crate::{
    agent::Agent,
    config::TransitionConfig,
    rng::SubsystemRng,
    types::{Behaviour, Level, LEVEL_COUNT},
};

pub trait TransitionRule: Send {
    fn name(&self) -> &'static str;

    /// The level `agent` should hold for `behaviour` next timestep, given
    /// the accumulated influence per neighbour level.
    fn next_level(
        &self,
        agent: &Agent,
        behaviour: Behaviour,
        influence: &[f64; LEVEL_COUNT],
        rng: &mut SubsystemRng,
    ) -> Level;
}

/// Influence-proportional adoption.
///
/// With total incoming weight `W`, the agent switches with probability
/// `W / (W + inertia)`; the new level is drawn with probability
/// proportional to each level's weight (possibly the current level).
#[derive(Debug, Clone)]
pub struct InfluenceAdoption {
    pub inertia: f64,
}

impl InfluenceAdoption {
    pub fn new(inertia: f64) -> Self {
        Self { inertia }
    }

    pub fn from_config(config: &TransitionConfig) -> Self {
        Self::new(config.inertia)
    }
}

impl TransitionRule for InfluenceAdoption {
    fn name(&self) -> &'static str { "influence_adoption" }

    fn next_level(
        &self,
        agent: &Agent,
        behaviour: Behaviour,
        influence: &[f64; LEVEL_COUNT],
        rng: &mut SubsystemRng,
    ) -> Level {
        let current = agent.level(behaviour);
        let total: f64 = influence.iter().sum();
        if total <= 0.0 {
            return current;
        }
        if !rng.chance(total / (total + self.inertia.max(0.0))) {
            return current;
        }
        rng.weighted_index(influence)
            .and_then(Level::from_index)
            .unwrap_or(current)
    }
}

/// Adopt the level with the strictly greatest incoming weight; keep the
/// current level on ties or when there is no influence. Draws nothing
/// from the RNG, which makes it the rule of choice for calibration
/// sanity checks.
#[derive(Debug, Clone, Default)]
pub struct StrongestInfluence;

impl TransitionRule for StrongestInfluence {
    fn name(&self) -> &'static str { "strongest_influence" }

    fn next_level(
        &self,
        agent: &Agent,
        behaviour: Behaviour,
        influence: &[f64; LEVEL_COUNT],
        _rng: &mut SubsystemRng,
    ) -> Level {
        let current = agent.level(behaviour);
        let mut best: Option<(Level, f64)> = None;
        let mut tied = false;
        for level in Level::ALL {
            let weight = influence[level.index()];
            match best {
                Some((_, w)) if weight > w => {
                    best = Some((level, weight));
                    tied = false;
                }
                Some((_, w)) if weight == w => tied = true,
                None => best = Some((level, weight)),
                _ => {}
            }
        }
        match best {
            Some((level, weight)) if weight > 0.0 && !tied => level,
            _ => current,
        }
    }
}
