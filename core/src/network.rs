//! Synthetic population and social network generator.
//!
//! Builds a linked `Population` from a `PopulationConfig` in four passes:
//!   1. households (optionally headed by a married couple)
//!   2. workplaces, for working-age agents
//!   3. friendships
//!
//! Every draw goes through the `Network` RNG stream, so the same seed and
//! config always produce the same graph.

use crate::{
    agent::{Agent, BehaviourLevels},
    config::PopulationConfig,
    error::{SimError, SimResult},
    population::Population,
    rng::{RngBank, SubsystemRng, SubsystemSlot},
    types::{AgentId, Behaviour, Level, Sex},
};

/// Generate a population of exactly `size` agents.
pub fn generate(config: &PopulationConfig, size: usize, rng: &mut SubsystemRng) -> SimResult<Population> {
    config.validate()?;
    let mut population = Population::new();

    while population.len() < size {
        let remaining = size - population.len();
        build_household(config, remaining, &mut population, rng)?;
    }
    assign_workplaces(config, &mut population, rng)?;
    assign_friends(config, &mut population, rng)?;

    log::info!(
        "Generated population of {} agents ({} in intervention workplaces)",
        population.len(),
        population.iter().filter(|a| a.intervention).count()
    );
    Ok(population)
}

/// Convenience wrapper drawing from the network stream of `seed`.
pub fn generate_seeded(config: &PopulationConfig, size: usize, seed: u64) -> SimResult<Population> {
    let mut rng = RngBank::new(seed).for_subsystem(SubsystemSlot::Network);
    generate(config, size, &mut rng)
}

fn build_household(
    config: &PopulationConfig,
    remaining: usize,
    population: &mut Population,
    rng: &mut SubsystemRng,
) -> SimResult<()> {
    let household_size = rng
        .weighted_index(&config.household_size_weights)
        .map(|i| i + 1)
        .unwrap_or(1)
        .min(remaining);

    let imd = draw_imd(config, rng);
    let head = random_agent(config, imd, rng);
    let (head_sex, head_age) = (head.sex, head.age);
    let head_id = population.insert(head);
    let mut members = vec![head_id];

    if household_size >= 2 && rng.chance(config.spouse_probability) {
        let mut spouse = random_agent(config, imd, rng);
        spouse.sex = head_sex.opposite();
        spouse.age = spouse_age(config, head_age, rng);
        let spouse_id = population.insert(spouse);
        population.link_spouses(head_id, spouse_id)?;
        members.push(spouse_id);
    }

    while members.len() < household_size {
        members.push(population.insert(random_agent(config, imd, rng)));
    }

    for (i, a) in members.iter().enumerate() {
        for b in &members[i + 1..] {
            population.link_household(*a, *b)?;
        }
    }
    Ok(())
}

fn assign_workplaces(
    config: &PopulationConfig,
    population: &mut Population,
    rng: &mut SubsystemRng,
) -> SimResult<()> {
    let mut employed: Vec<AgentId> = Vec::new();
    for agent in population.iter() {
        if agent.age < config.retirement_age && rng.chance(config.employment_rate) {
            employed.push(agent.id);
        }
    }
    shuffle(&mut employed, rng);

    let type_weights: Vec<f64> = config.workplace_types.iter().map(|w| w.weight).collect();
    let mut workplaces = 0usize;
    for group in employed.chunks(config.workplace_size) {
        let index = rng.weighted_index(&type_weights).ok_or_else(|| {
            SimError::InvalidConfig("workplace_types has no positive weight".into())
        })?;
        let workplace_type = &config.workplace_types[index].name;
        let intervention = config.intervention_workplace_types.contains(workplace_type);

        for id in group {
            let agent = population.agent_mut(*id)?;
            agent.workplace_type = Some(workplace_type.clone());
            agent.intervention = intervention;
        }
        for (i, a) in group.iter().enumerate() {
            for b in &group[i + 1..] {
                population.link_workplace(*a, *b)?;
            }
        }
        workplaces += 1;
    }
    log::debug!("{} employed agents across {workplaces} workplaces", employed.len());
    Ok(())
}

fn assign_friends(
    config: &PopulationConfig,
    population: &mut Population,
    rng: &mut SubsystemRng,
) -> SimResult<()> {
    let ids = population.ids();
    if ids.len() < 2 {
        return Ok(());
    }
    for id in &ids {
        for _ in 0..config.friends_per_agent {
            let other = ids[rng.next_u64_below(ids.len() as u64) as usize];
            if other != *id {
                population.link_friends(*id, other)?;
            }
        }
    }
    Ok(())
}

fn random_agent(config: &PopulationConfig, imd: u8, rng: &mut SubsystemRng) -> Agent {
    let sex = if rng.chance(config.male_share) { Sex::Male } else { Sex::Female };
    let span = (config.max_age - config.min_age) as u64 + 1;
    let age = config.min_age + rng.next_u64_below(span) as u32;

    let mut levels = BehaviourLevels::default();
    for behaviour in Behaviour::ALL {
        let level = config
            .level_prevalence
            .get(&behaviour)
            .and_then(|shares| rng.weighted_index(shares))
            .and_then(Level::from_index)
            .unwrap_or(Level::Low);
        levels.set(behaviour, level);
    }
    Agent::new(sex, age, imd).with_levels(levels)
}

fn draw_imd(config: &PopulationConfig, rng: &mut SubsystemRng) -> u8 {
    rng.weighted_index(&config.imd_weights).map(|i| i as u8 + 1).unwrap_or(3)
}

fn spouse_age(config: &PopulationConfig, head_age: u32, rng: &mut SubsystemRng) -> u32 {
    let gap = config.spouse_age_gap as i64;
    let offset = rng.next_u64_below((2 * gap + 1) as u64) as i64 - gap;
    (head_age as i64 + offset).clamp(config.min_age as i64, config.max_age as i64) as u32
}

/// Fisher–Yates, drawing from the network stream.
fn shuffle<T>(items: &mut [T], rng: &mut SubsystemRng) {
    for i in (1..items.len()).rev() {
        let j = rng.next_u64_below(i as u64 + 1) as usize;
        items.swap(i, j);
    }
}
