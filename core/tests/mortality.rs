//! Conservation and graph integrity across mortality passes.

mod common;

use cvd_spread_core::{
    config::SimConfig,
    network,
    risk::ConstantRisk,
    transition::InfluenceAdoption,
    types::RelationKind,
};
use std::collections::BTreeSet;

#[test]
fn population_is_conserved_and_graph_stays_symmetric() {
    let config = SimConfig::default_test();
    let population = network::generate_seeded(&config.population, 250, 77).unwrap();
    let initial = population.len();

    let mut engine = common::engine_with(
        "mortality-conservation",
        77,
        population,
        config.influence_weights(),
        Box::new(InfluenceAdoption::from_config(&config.transition)),
        Box::new(ConstantRisk(0.2)),
    );
    engine.initialize().unwrap();

    let mut seen_dead = BTreeSet::new();
    for t in 0..8u64 {
        let before = engine.state.population.len();
        engine.tick().unwrap();
        let died = engine.state.deceased.get(&t).map(Vec::len).unwrap_or(0);
        assert_eq!(engine.state.population.len(), before - died, "timestep {t}");

        engine.state.population.validate_symmetry().unwrap();
        for agent in engine.state.deceased[&t].iter() {
            assert!(seen_dead.insert(agent.id), "{} died twice", agent.id);
            assert!(!engine.state.population.contains(agent.id));
        }
        for agent in engine.state.population.iter() {
            for relation in RelationKind::ALL {
                for neighbour in agent.neighbours(relation) {
                    assert!(!seen_dead.contains(&neighbour), "{} still linked to dead {neighbour}", agent.id);
                }
            }
        }
    }

    assert!(!seen_dead.is_empty());
    assert_eq!(engine.state.population.len() + engine.state.total_deaths(), initial);
    assert_eq!(engine.state.population_sizes.len(), 8);
    assert_eq!(engine.state.population_sizes[0], initial);
}

#[test]
fn certain_death_empties_population_and_analytics_become_undefined() {
    let config = SimConfig::default_test();
    let population = network::generate_seeded(&config.population, 60, 4).unwrap();

    let mut engine = common::engine_with(
        "mortality-wipeout",
        4,
        population,
        config.influence_weights(),
        Box::new(InfluenceAdoption::from_config(&config.transition)),
        Box::new(ConstantRisk(1.0)),
    );
    engine.run_ticks(2).unwrap();

    assert!(engine.state.population.is_empty());
    assert_eq!(engine.state.total_deaths(), 60);
    assert!(engine.state.deceased[&1].is_empty());
    let latest = engine.state.latest_analytics().unwrap();
    assert_eq!(latest.population, 0);
    assert_eq!(latest.avg_cv_chance, None);

    let report = engine.finalize("wipeout", true).unwrap();
    assert_eq!(report.deaths.total, 60);
    assert!(report.deaths.avg_age().is_some());
    assert_eq!(report.behaviour_metrics.unwrap().get("Average CVD risk"), None);
}
