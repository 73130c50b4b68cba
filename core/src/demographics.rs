use crate::{agent::Agent, types::Sex};
use serde::{Deserialize, Serialize};

/// Tally of the agents who died in one timestep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeathDemographics {
    pub male:    u64,
    pub female:  u64,
    /// Deaths per deprivation quintile 1..=5.
    pub by_imd:  [u64; 5],
    pub age_sum: u64,
    pub total:   u64,
}

impl DeathDemographics {
    pub fn record(&mut self, agent: &Agent) {
        match agent.sex {
            Sex::Male => self.male += 1,
            Sex::Female => self.female += 1,
        }
        match (agent.imd as usize).checked_sub(1).and_then(|i| self.by_imd.get_mut(i)) {
            Some(slot) => *slot += 1,
            None => log::warn!("{} has deprivation quintile {} outside 1..=5", agent.id, agent.imd),
        }
        self.age_sum += agent.age as u64;
        self.total += 1;
    }

    /// Mean age at death; undefined when nobody died.
    pub fn avg_age(&self) -> Option<f64> {
        (self.total > 0).then(|| self.age_sum as f64 / self.total as f64)
    }
}
