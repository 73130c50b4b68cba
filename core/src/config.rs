use crate::{
    error::{SimError, SimResult},
    types::Behaviour,
    weights::{InfluenceWeights, RelationshipWeightTable, WeightTableFile},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_POPULATION_SIZE: usize = 3500;
pub const DEFAULT_TIMESTEPS: u64 = 10;

// ── Network generation ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkplaceTypeConfig {
    pub name:   String,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    pub min_age: u32,
    pub max_age: u32,
    pub male_share: f64,
    /// Relative weight of deprivation quintiles 1..=5.
    pub imd_weights: [f64; 5],
    /// Initial share of levels 0/1/2 per behaviour.
    pub level_prevalence: BTreeMap<Behaviour, [f64; 3]>,
    /// Entry i is the weight of a household of size i + 1.
    pub household_size_weights: Vec<f64>,
    pub spouse_probability: f64,
    pub spouse_age_gap: u32,
    pub employment_rate: f64,
    pub retirement_age: u32,
    pub workplace_size: usize,
    pub workplace_types: Vec<WorkplaceTypeConfig>,
    /// Employees of these workplace types are in the intervention cohort.
    #[serde(default)]
    pub intervention_workplace_types: Vec<String>,
    pub friends_per_agent: usize,
}

impl PopulationConfig {
    pub fn validate(&self) -> SimResult<()> {
        let invalid = |msg: String| Err(SimError::InvalidConfig(msg));
        if self.min_age > self.max_age {
            return invalid(format!("min_age {} > max_age {}", self.min_age, self.max_age));
        }
        for (name, p) in [
            ("male_share", self.male_share),
            ("spouse_probability", self.spouse_probability),
            ("employment_rate", self.employment_rate),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return invalid(format!("{name} must be in [0, 1], got {p}"));
            }
        }
        if self.household_size_weights.iter().all(|w| *w <= 0.0) {
            return invalid("household_size_weights has no positive entry".into());
        }
        if self.workplace_size < 2 {
            return invalid("workplace_size must be at least 2".into());
        }
        if self.workplace_types.iter().all(|w| w.weight <= 0.0) {
            return invalid("workplace_types has no positive weight".into());
        }
        for behaviour in Behaviour::ALL {
            match self.level_prevalence.get(&behaviour) {
                Some(shares) if shares.iter().any(|s| *s > 0.0) => {}
                _ => return invalid(format!("level_prevalence missing for {behaviour}")),
            }
        }
        Ok(())
    }
}

// ── Risk model ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SexValues {
    #[serde(rename = "M")]
    pub male:   f64,
    #[serde(rename = "F")]
    pub female: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskModelConfig {
    /// Annual event probability at `reference_age` with every behaviour at level 0.
    pub baseline_annual_risk:    SexValues,
    pub reference_age:           u32,
    pub doubling_years:          f64,
    pub behaviour_multipliers:   BTreeMap<Behaviour, [f64; 3]>,
    /// Multipliers for deprivation quintiles 1..=5.
    pub deprivation_multipliers: [f64; 5],
}

impl RiskModelConfig {
    pub fn validate(&self) -> SimResult<()> {
        let invalid = |msg: String| Err(SimError::InvalidConfig(msg));
        if self.doubling_years.is_nan() || self.doubling_years <= 0.0 {
            return invalid(format!("doubling_years must be positive, got {}", self.doubling_years));
        }
        for (sex, p) in [("M", self.baseline_annual_risk.male), ("F", self.baseline_annual_risk.female)] {
            if !(0.0..=1.0).contains(&p) {
                return invalid(format!("baseline_annual_risk.{sex} must be in [0, 1], got {p}"));
            }
        }
        for (behaviour, multipliers) in &self.behaviour_multipliers {
            if multipliers.iter().any(|m| m.is_nan() || *m < 0.0) {
                return invalid(format!("behaviour_multipliers for {behaviour} must be non-negative"));
            }
        }
        if self.deprivation_multipliers.iter().any(|m| m.is_nan() || *m < 0.0) {
            return invalid("deprivation_multipliers must be non-negative".into());
        }
        Ok(())
    }
}

// ── Transition rule ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionConfig {
    /// Resistance to change; higher means fewer switches per unit of influence.
    pub inertia: f64,
}

// ── Top level ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Name of the parameter set, used in output file names.
    pub config_name:          String,
    pub baseline_weights:     RelationshipWeightTable,
    pub intervention_weights: RelationshipWeightTable,
    pub population:           PopulationConfig,
    pub risk_model:           RiskModelConfig,
    pub transition:           TransitionConfig,
}

fn read_json<T: DeserializeOwned>(dir: &Path, file: &str) -> anyhow::Result<T> {
    let path = dir.join(file);
    let content = std::fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
    serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Cannot parse {}: {e}", path.display()))
}

impl SimConfig {
    /// Load from a parameter folder.
    /// In tests, use SimConfig::default_test().
    pub fn load(param_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = param_dir.as_ref();

        let baseline_file: WeightTableFile = read_json(dir, "influence_weights.json")?;
        let baseline_weights = RelationshipWeightTable::from_file("baseline", &baseline_file)?;

        let intervention_file: WeightTableFile = read_json(dir, "intervention_weights.json")?;
        let intervention_weights =
            RelationshipWeightTable::from_file("intervention", &intervention_file)?;

        let population: PopulationConfig = read_json(dir, "population.json")?;
        population.validate()?;

        let risk_model: RiskModelConfig = read_json(dir, "risk_model.json")?;
        risk_model.validate()?;
        let transition: TransitionConfig = read_json(dir, "transition.json")?;

        let config_name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "params".into());

        let config = Self {
            config_name,
            baseline_weights,
            intervention_weights,
            population,
            risk_model,
            transition,
        };
        config.check_workplace_types()?;
        log::info!(
            "Loaded parameter set '{}' from {}",
            config.config_name,
            dir.display()
        );
        Ok(config)
    }

    pub fn influence_weights(&self) -> InfluenceWeights {
        InfluenceWeights::new(self.baseline_weights.clone(), self.intervention_weights.clone())
    }

    /// Every workplace type the generator can assign must have weights in
    /// both tables.
    fn check_workplace_types(&self) -> SimResult<()> {
        for wt in &self.population.workplace_types {
            for table in [&self.baseline_weights, &self.intervention_weights] {
                if !table.has_workplace_type(&wt.name) {
                    return Err(SimError::MissingWeight {
                        table: table.name().to_string(),
                        key:   format!("Workplace/{}", wt.name),
                    });
                }
            }
        }
        Ok(())
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        let workplace_types = ["office", "manual", "retail"];
        Self {
            config_name: "test".into(),
            baseline_weights: RelationshipWeightTable::uniform("baseline", 0.1, &workplace_types),
            intervention_weights: RelationshipWeightTable::uniform(
                "intervention",
                0.05,
                &workplace_types,
            ),
            population: PopulationConfig {
                min_age: 25,
                max_age: 84,
                male_share: 0.49,
                imd_weights: [1.0; 5],
                level_prevalence: [
                    (Behaviour::Smoking, [0.55, 0.25, 0.20]),
                    (Behaviour::Alcohol, [0.20, 0.55, 0.25]),
                    (Behaviour::Diet, [0.30, 0.40, 0.30]),
                    (Behaviour::Inactivity, [0.35, 0.35, 0.30]),
                ]
                .into(),
                household_size_weights: vec![0.30, 0.35, 0.15, 0.20],
                spouse_probability: 0.6,
                spouse_age_gap: 4,
                employment_rate: 0.75,
                retirement_age: 66,
                workplace_size: 8,
                workplace_types: workplace_types
                    .iter()
                    .map(|name| WorkplaceTypeConfig { name: name.to_string(), weight: 1.0 })
                    .collect(),
                intervention_workplace_types: vec!["office".into()],
                friends_per_agent: 3,
            },
            risk_model: RiskModelConfig {
                baseline_annual_risk: SexValues { male: 0.003, female: 0.0018 },
                reference_age: 25,
                doubling_years: 7.5,
                behaviour_multipliers: [
                    (Behaviour::Smoking, [1.0, 1.2, 1.8]),
                    (Behaviour::Alcohol, [1.0, 1.0, 1.3]),
                    (Behaviour::Diet, [1.0, 1.1, 1.3]),
                    (Behaviour::Inactivity, [1.0, 1.1, 1.4]),
                ]
                .into(),
                deprivation_multipliers: [0.85, 0.95, 1.0, 1.1, 1.25],
            },
            transition: TransitionConfig { inertia: 2.0 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_test_config_is_valid() {
        let config = SimConfig::default_test();
        config.population.validate().unwrap();
        config.risk_model.validate().unwrap();
        config.check_workplace_types().unwrap();
    }

    #[test]
    fn shipped_parameter_folder_loads() {
        let config = SimConfig::load(concat!(env!("CARGO_MANIFEST_DIR"), "/../data/default")).unwrap();
        assert_eq!(config.config_name, "default");
        for behaviour in Behaviour::ALL {
            assert!(config.population.level_prevalence.contains_key(&behaviour));
            assert!(config.risk_model.behaviour_multipliers.contains_key(&behaviour));
        }
        assert!(config.risk_model.baseline_annual_risk.male > 0.0);
        assert!(config.risk_model.baseline_annual_risk.female > 0.0);
    }

    #[test]
    fn zero_doubling_years_is_rejected() {
        let mut config = SimConfig::default_test();
        config.risk_model.doubling_years = 0.0;
        assert!(matches!(
            config.risk_model.validate(),
            Err(SimError::InvalidConfig(_))
        ));
    }

    #[test]
    fn negative_risk_multiplier_is_rejected() {
        let mut config = SimConfig::default_test();
        config.risk_model.deprivation_multipliers[2] = -0.5;
        assert!(config.risk_model.validate().is_err());

        let mut config = SimConfig::default_test();
        config.risk_model.behaviour_multipliers.insert(Behaviour::Diet, [1.0, -1.0, 1.2]);
        assert!(config.risk_model.validate().is_err());
    }

    #[test]
    fn missing_folder_reports_the_path() {
        let err = SimConfig::load("/definitely/not/here").unwrap_err();
        assert!(err.to_string().contains("influence_weights.json"), "{err}");
    }

    #[test]
    fn bad_probability_is_rejected() {
        let mut config = SimConfig::default_test();
        config.population.spouse_probability = 1.5;
        assert!(matches!(
            config.population.validate(),
            Err(SimError::InvalidConfig(_))
        ));
    }
}
