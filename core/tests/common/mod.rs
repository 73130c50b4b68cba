//! Shared helpers for the integration tests.
#![allow(dead_code)]

use cvd_spread_core::{
    engine::SimEngine,
    population::Population,
    risk::RiskModel,
    store::SimStore,
    transition::TransitionRule,
    types::{Behaviour, Level, RelationKind},
    weights::{InfluenceWeights, RelationshipWeightTable},
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn test_store(run_id: &str, seed: u64) -> SimStore {
    let store = SimStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store.insert_run(run_id, seed, "0.1.0-test").expect("insert run");
    store
}

/// All-zero table except one relation/behaviour row.
pub fn single_row_weights(relation: RelationKind, behaviour: Behaviour, row: [f64; 3]) -> InfluenceWeights {
    let mut table = RelationshipWeightTable::uniform("baseline", 0.0, &["office"]);
    for level in Level::ALL {
        table
            .set_weight(relation, None, behaviour, level, row[level.index()])
            .expect("valid weight");
    }
    InfluenceWeights::shared(table)
}

pub fn engine_with(
    run_id: &str,
    seed: u64,
    population: Population,
    weights: InfluenceWeights,
    rule: Box<dyn TransitionRule>,
    risk: Box<dyn RiskModel>,
) -> SimEngine {
    SimEngine::with_models(
        run_id.to_string(),
        seed,
        test_store(run_id, seed),
        population,
        weights,
        rule,
        risk,
    )
    .expect("engine")
}
