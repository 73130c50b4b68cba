//! Two married agents, smoking spreads along the spouse link only.

mod common;

use cvd_spread_core::{
    agent::{Agent, BehaviourLevels},
    config::SimConfig,
    engine::SimEngine,
    network,
    influence::aggregate,
    population::Population,
    risk::ConstantRisk,
    transition::StrongestInfluence,
    types::{AgeBand, Behaviour, Level, RelationKind, Sex},
};

#[test]
fn spouse_pair_single_timestep() {
    common::init_logging();
    let mut pop = Population::new();
    let a = pop.insert(Agent::new(Sex::Female, 40, 2));
    let b = pop.insert(
        Agent::new(Sex::Male, 52, 2)
            .with_levels(BehaviourLevels::all(Level::Low).with(Behaviour::Smoking, Level::High)),
    );
    pop.link_spouses(a, b).unwrap();

    let weights = common::single_row_weights(RelationKind::Spouse, Behaviour::Smoking, [0.0, 0.0, 1.0]);
    let influence = aggregate(&pop, pop.agent(a).unwrap(), &weights).unwrap();
    assert_eq!(influence.get(Behaviour::Smoking), &[0.0, 0.0, 1.0]);
    for other in [Behaviour::Alcohol, Behaviour::Diet, Behaviour::Inactivity] {
        assert_eq!(influence.get(other), &[0.0; 3]);
    }

    let mut engine = common::engine_with(
        "e2e-spouses",
        17,
        pop,
        weights,
        Box::new(StrongestInfluence),
        Box::new(ConstantRisk(0.0)),
    );
    engine.run_ticks(1).unwrap();

    let state = &engine.state;
    assert_eq!(state.population.len(), 2);
    assert_eq!(state.population_sizes, vec![2]);
    assert_eq!(state.total_deaths(), 0);
    assert_eq!(state.population.agent(a).unwrap().level(Behaviour::Smoking), Level::High);

    let band_a = AgeBand::from_age(40).unwrap();
    let band_b = AgeBand::from_age(52).unwrap();
    assert_eq!(state.incidence.person_years(Sex::Female, band_a), 1);
    assert_eq!(state.incidence.person_years(Sex::Male, band_b), 1);
    assert_eq!(state.incidence.total_person_years(Sex::Female), 1);
    assert_eq!(state.incidence.total_person_years(Sex::Male), 1);

    // Baseline plus one timestep.
    assert_eq!(state.analytics.len(), 2);
    assert_eq!(state.analytics[0].timestep, -1);
    assert_eq!(state.death_demographics.len(), 2);

    let report = engine.finalize("e2e", true).unwrap();
    assert_eq!(report.timesteps, 1);
    assert_eq!(report.final_population, 2);
    assert_eq!(report.incidence.total.f_years, 1);
    assert_eq!(report.deaths.avg_age(), None);
    let metrics = report.behaviour_metrics.unwrap();
    assert_eq!(metrics.get("Proportion of lvl 2 smoking"), Some(1.0));
}

#[test]
fn shipped_parameters_drive_a_full_run() {
    common::init_logging();
    let config = SimConfig::load(concat!(env!("CARGO_MANIFEST_DIR"), "/../data/default")).unwrap();
    let population = network::generate_seeded(&config.population, 300, 5).unwrap();
    let store = common::test_store("e2e-default", 5);
    let mut engine = SimEngine::build("e2e-default".into(), 5, store, &config, population).unwrap();

    engine.initialize().unwrap();
    let baseline = &engine.state.analytics[0];
    assert_eq!(baseline.timestep, -1);
    let avg = baseline.avg_cv_chance.unwrap();
    assert!(avg > 0.0 && avg < 1.0, "baseline mean risk {avg}");
    for agent in engine.state.population.iter() {
        assert!(agent.cv_chance > 0.0, "{} scored zero", agent.id);
    }

    engine.run_ticks(3).unwrap();
    engine.state.population.validate_symmetry().unwrap();
    let report = engine.finalize("default", true).unwrap();
    assert_eq!(report.timesteps, 3);
    assert_eq!(report.initial_population, 300);
    assert_eq!(report.final_population + report.total_deaths, 300);
    assert!(report.behaviour_metrics.is_some());
}

#[test]
fn spouse_pair_baseline_carries_model_risk() {
    let mut pop = Population::new();
    let a = pop.insert(Agent::new(Sex::Female, 40, 2));
    let b = pop.insert(Agent::new(Sex::Male, 52, 2));
    pop.link_spouses(a, b).unwrap();
    let weights = common::single_row_weights(RelationKind::Spouse, Behaviour::Smoking, [0.0, 0.0, 1.0]);
    let mut engine = common::engine_with(
        "e2e-baseline-risk",
        3,
        pop,
        weights,
        Box::new(StrongestInfluence),
        Box::new(ConstantRisk(0.125)),
    );
    engine.initialize().unwrap();
    assert_eq!(engine.state.analytics[0].avg_cv_chance, Some(0.125));
    assert_eq!(engine.state.population.agent(a).unwrap().age, 40);
    assert_eq!(engine.state.incidence.total_person_years(Sex::Female), 0);
}
