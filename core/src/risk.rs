//! CVD risk models.
//!
//! A risk model maps an agent's current state to its probability of a
//! cardiovascular event this timestep. The mortality subsystem calls it
//! once per living agent, after behaviour levels were committed.

use crate::{
    agent::Agent,
    config::RiskModelConfig,
    types::{Behaviour, Sex},
};

pub trait RiskModel: Send {
    fn name(&self) -> &'static str;

    /// Event probability for this timestep. Callers clamp to [0, 1].
    fn cv_chance(&self, agent: &Agent) -> f64;
}

/// Multiplicative lifestyle model:
/// `base[sex] × 2^((age − reference_age) / doubling_years)
///  × Π behaviour multipliers × deprivation multiplier`.
#[derive(Debug, Clone)]
pub struct LifestyleRiskModel {
    config: RiskModelConfig,
}

impl LifestyleRiskModel {
    pub fn from_config(config: &RiskModelConfig) -> Self {
        Self { config: config.clone() }
    }
}

impl RiskModel for LifestyleRiskModel {
    fn name(&self) -> &'static str { "lifestyle" }

    fn cv_chance(&self, agent: &Agent) -> f64 {
        let c = &self.config;
        let base = match agent.sex {
            Sex::Male => c.baseline_annual_risk.male,
            Sex::Female => c.baseline_annual_risk.female,
        };
        let years = agent.age as f64 - c.reference_age as f64;
        let age_factor = 2f64.powf(years / c.doubling_years);

        let behaviour_factor: f64 = Behaviour::ALL
            .iter()
            .map(|b| {
                c.behaviour_multipliers
                    .get(b)
                    .map(|m| m[agent.level(*b).index()])
                    .unwrap_or(1.0)
            })
            .product();

        let imd_factor = c
            .deprivation_multipliers
            .get((agent.imd as usize).saturating_sub(1))
            .copied()
            .unwrap_or(1.0);

        (base * age_factor * behaviour_factor * imd_factor).clamp(0.0, 1.0)
    }
}

/// Same probability for everyone.
#[derive(Debug, Clone, Copy)]
pub struct ConstantRisk(pub f64);

impl RiskModel for ConstantRisk {
    fn name(&self) -> &'static str { "constant" }

    fn cv_chance(&self, _agent: &Agent) -> f64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        agent::BehaviourLevels,
        config::SimConfig,
        types::Level,
    };

    #[test]
    fn risk_rises_with_age_and_behaviour() {
        let model = LifestyleRiskModel::from_config(&SimConfig::default_test().risk_model);
        let young = Agent::new(Sex::Male, 30, 1);
        let old = Agent::new(Sex::Male, 70, 1);
        assert!(model.cv_chance(&old) > model.cv_chance(&young));

        let smoker = young.clone().with_levels(BehaviourLevels::all(Level::Low).with(Behaviour::Smoking, Level::High));
        assert!(model.cv_chance(&smoker) > model.cv_chance(&young));
    }

    #[test]
    fn risk_is_a_probability() {
        let model = LifestyleRiskModel::from_config(&SimConfig::default_test().risk_model);
        let worst = Agent::new(Sex::Male, 200, 5).with_levels(BehaviourLevels::all(Level::High));
        let p = model.cv_chance(&worst);
        assert!((0.0..=1.0).contains(&p));
    }
}
