//! End-of-run behaviour correlation report.
//!
//! Conditional proportions of an agent's own behaviour given what its
//! housemates, spouse or friends do, over the final living population.
//! Each comparison splits the agents into two exposure groups and reports
//! the share of each outcome within each group, so every block is four
//! numbers. A group with no members gives `None`.

use crate::{
    agent::Agent,
    error::SimResult,
    population::Population,
    types::{Behaviour, Level, RelationKind},
};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedMetric {
    pub name:  String,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviourMetrics {
    pub metrics: Vec<NamedMetric>,
}

/// 2×2 counts: `[exposed][outcome]`.
#[derive(Debug, Clone, Copy, Default)]
struct Contingency {
    counts: [[u64; 2]; 2],
}

impl Contingency {
    fn add(&mut self, exposed: bool, outcome: bool) {
        self.counts[exposed as usize][outcome as usize] += 1;
    }

    fn share(&self, exposed: bool, outcome: bool) -> Option<f64> {
        let row = self.counts[exposed as usize];
        let total = row[0] + row[1];
        (total > 0).then(|| row[outcome as usize] as f64 / total as f64)
    }
}

/// Which level a set of contacts exposes an agent to. Level 1 takes
/// precedence over level 2 when both are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SmokingExposure {
    Level1,
    Level2,
}

fn smoking_exposure(contacts: &[&Agent]) -> Option<SmokingExposure> {
    let has = |level| contacts.iter().any(|c| c.level(Behaviour::Smoking) == level);
    if has(Level::Medium) {
        Some(SmokingExposure::Level1)
    } else if has(Level::High) {
        Some(SmokingExposure::Level2)
    } else {
        None
    }
}

fn contacts<'p>(population: &'p Population, agent: &Agent, relation: RelationKind) -> SimResult<Vec<&'p Agent>> {
    agent
        .neighbours(relation)
        .into_iter()
        .map(|id| population.neighbour(agent.id, id, relation))
        .collect()
}

impl BehaviourMetrics {
    /// Compute the full report. `avg_cv_chance` is the final timestep's mean.
    pub fn collect(population: &Population, avg_cv_chance: Option<f64>) -> SimResult<Self> {
        let mut alcohol_household = Contingency::default();
        let mut alcohol_spouse = Contingency::default();
        let mut smoking_household = Contingency::default();
        let mut smoking_spouse = Contingency::default();
        let mut smoking_friends = Contingency::default();
        let mut inactivity_spouse = Contingency::default();
        let mut inactivity_friends = Contingency::default();
        let mut level2 = [0u64; 4];

        for agent in population.iter() {
            for (slot, behaviour) in [
                Behaviour::Smoking,
                Behaviour::Inactivity,
                Behaviour::Alcohol,
                Behaviour::Diet,
            ]
            .into_iter()
            .enumerate()
            {
                if agent.level(behaviour) == Level::High {
                    level2[slot] += 1;
                }
            }

            let household = contacts(population, agent, RelationKind::Household)?;
            let spouse = contacts(population, agent, RelationKind::Spouse)?;
            let friends = contacts(population, agent, RelationKind::Friendship)?;

            // Alcohol: drinker means any level above 0.
            let drinks = agent.level(Behaviour::Alcohol) != Level::Low;
            let heavy = |c: &&Agent| c.level(Behaviour::Alcohol) == Level::High;
            alcohol_household.add(household.iter().any(heavy), drinks);
            if let Some(s) = spouse.first() {
                alcohol_spouse.add(heavy(s), drinks);
            }

            // Smoking: only smokers (level 1 or 2) with a smoking contact count.
            let own = agent.level(Behaviour::Smoking);
            if own != Level::Low {
                let heavy_smoker = own == Level::High;
                for (table, group) in [
                    (&mut smoking_household, &household),
                    (&mut smoking_spouse, &spouse),
                    (&mut smoking_friends, &friends),
                ] {
                    if let Some(exposure) = smoking_exposure(group) {
                        table.add(exposure == SmokingExposure::Level2, heavy_smoker);
                    }
                }
            }

            // Inactivity: inactive means level 2.
            let inactive = agent.level(Behaviour::Inactivity) == Level::High;
            let idle = |c: &&Agent| c.level(Behaviour::Inactivity) == Level::High;
            if let Some(s) = spouse.first() {
                inactivity_spouse.add(idle(s), inactive);
            }
            inactivity_friends.add(friends.iter().any(idle), inactive);
        }

        let n = population.len();
        let share = |count: u64| (n > 0).then(|| count as f64 / n as f64);
        let mut metrics = vec![
            metric("Population", Some(n as f64)),
            metric("Average CVD risk", avg_cv_chance),
            metric("Proportion of lvl 2 smoking", share(level2[0])),
            metric("Proportion of lvl 2 inactivity", share(level2[1])),
            metric("Proportion of lvl 2 alcohol", share(level2[2])),
            metric("Proportion of lvl 2 diet", share(level2[3])),
        ];

        let drink = ("lvl1 or lvl2 alcohol", "lvl0 alcohol");
        push_block(&mut metrics, &alcohol_household, drink, ("lvl2 housemates", "lvl0 or lvl1 housemates"), OUTCOME_FIRST);
        push_block(&mut metrics, &alcohol_spouse, drink, ("lvl2 spouse", "lvl0 or lvl1 spouse"), OUTCOME_FIRST);

        // Smoking blocks are "exposed" at level 2 and "unexposed" at level 1.
        let smoke = ("lvl2 smoking", "lvl1 smoking");
        push_block(&mut metrics, &smoking_household, smoke, ("lvl2 housemates", "lvl1 housemates"), LOW_EXPOSURE_FIRST);
        push_block(&mut metrics, &smoking_spouse, smoke, ("lvl2 spouse", "lvl1 spouse"), LOW_EXPOSURE_FIRST);
        push_block(&mut metrics, &smoking_friends, smoke, ("lvl2 friend", "lvl1 friend"), LOW_EXPOSURE_FIRST);

        let activity = ("lvl2 activity", "lvl0 or lv1 activity");
        push_block(&mut metrics, &inactivity_spouse, activity, ("lvl2 spouse", "lvl0 or lvl1 spouse"), LOW_EXPOSURE_FIRST);
        push_block(&mut metrics, &inactivity_friends, activity, ("lvl2 friend", "lvl0 or lvl1 friend"), LOW_EXPOSURE_FIRST);

        if metrics.iter().any(|m| m.value.is_none()) {
            log::warn!(
                "{} behaviour metrics undefined (empty exposure group)",
                metrics.iter().filter(|m| m.value.is_none()).count()
            );
        }
        Ok(Self { metrics })
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.metrics.iter().find(|m| m.name == name).and_then(|m| m.value)
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// `name:value` lines; undefined values are written as `NaN`.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for m in &self.metrics {
            match m.value {
                Some(v) => { let _ = writeln!(out, "{}:{v}", m.name); }
                None => { let _ = writeln!(out, "{}:NaN", m.name); }
            }
        }
        out
    }
}

fn metric(name: &str, value: Option<f64>) -> NamedMetric {
    NamedMetric { name: name.to_string(), value }
}

/// Emission order of a block's four `(exposed, outcome)` cells.
type BlockOrder = [(bool, bool); 4];

const OUTCOME_FIRST: BlockOrder = [(true, true), (false, true), (true, false), (false, false)];
const LOW_EXPOSURE_FIRST: BlockOrder = [(false, false), (false, true), (true, false), (true, true)];

/// Four shares of one contingency table, each named
/// `Proportion of {outcome} with {exposure}`. The share is taken within
/// the exposure group.
fn push_block(
    metrics: &mut Vec<NamedMetric>,
    table: &Contingency,
    (outcome_yes, outcome_no): (&str, &str),
    (exposed, unexposed): (&str, &str),
    order: BlockOrder,
) {
    for (is_exposed, outcome) in order {
        let label = if outcome { outcome_yes } else { outcome_no };
        let group = if is_exposed { exposed } else { unexposed };
        metrics.push(metric(
            &format!("Proportion of {label} with {group}"),
            table.share(is_exposed, outcome),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{agent::BehaviourLevels, types::Sex};

    fn person(smoking: Level, alcohol: Level, inactivity: Level) -> Agent {
        Agent::new(Sex::Female, 40, 2).with_levels(BehaviourLevels::new(
            smoking,
            alcohol,
            Level::Low,
            inactivity,
        ))
    }

    #[test]
    fn report_has_thirty_four_entries() {
        let metrics = BehaviourMetrics::collect(&Population::new(), None).unwrap();
        assert_eq!(metrics.len(), 34);
        assert_eq!(metrics.get("Population"), Some(0.0));
        assert_eq!(metrics.get("Average CVD risk"), None);
    }

    #[test]
    fn spouse_alcohol_exposure() {
        let mut pop = Population::new();
        let a = pop.insert(person(Level::Low, Level::Medium, Level::Low));
        let b = pop.insert(person(Level::Low, Level::High, Level::Low));
        pop.link_spouses(a, b).unwrap();

        let metrics = BehaviourMetrics::collect(&pop, Some(0.1)).unwrap();
        // a drinks and has a heavy-drinking spouse.
        assert_eq!(metrics.get("Proportion of lvl1 or lvl2 alcohol with lvl2 spouse"), Some(1.0));
        // b drinks and its spouse is not at level 2.
        assert_eq!(metrics.get("Proportion of lvl1 or lvl2 alcohol with lvl0 or lvl1 spouse"), Some(1.0));
        assert_eq!(metrics.get("Proportion of lvl 2 alcohol"), Some(0.5));
    }

    #[test]
    fn level_one_smoking_exposure_takes_precedence() {
        let mut pop = Population::new();
        let a = pop.insert(person(Level::High, Level::Low, Level::Low));
        let b = pop.insert(person(Level::Medium, Level::Low, Level::Low));
        let c = pop.insert(person(Level::High, Level::Low, Level::Low));
        pop.link_friends(a, b).unwrap();
        pop.link_friends(a, c).unwrap();

        let metrics = BehaviourMetrics::collect(&pop, None).unwrap();
        // a has friends at both levels, so counts as level-1 exposed.
        assert_eq!(metrics.get("Proportion of lvl2 smoking with lvl1 friend"), Some(1.0));
        // b and c each see only a (level 2); b is lvl1, c is lvl2.
        assert_eq!(metrics.get("Proportion of lvl2 smoking with lvl2 friend"), Some(0.5));
        assert_eq!(metrics.get("Proportion of lvl2 smoking with lvl2 spouse"), None);
    }

    #[test]
    fn labels_follow_the_published_report_order() {
        let metrics = BehaviourMetrics::collect(&Population::new(), None).unwrap();
        let names: Vec<&str> = metrics.metrics.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names[2], "Proportion of lvl 2 smoking");
        assert_eq!(names[6], "Proportion of lvl1 or lvl2 alcohol with lvl2 housemates");
        assert_eq!(names[9], "Proportion of lvl0 alcohol with lvl0 or lvl1 housemates");
        assert_eq!(names[14], "Proportion of lvl1 smoking with lvl1 housemates");
        assert_eq!(names[17], "Proportion of lvl2 smoking with lvl2 housemates");
        assert_eq!(names[26], "Proportion of lvl0 or lv1 activity with lvl0 or lvl1 spouse");
        assert_eq!(names[33], "Proportion of lvl2 activity with lvl2 friend");
        let unique: std::collections::BTreeSet<_> = names.iter().collect();
        assert_eq!(unique.len(), 34);
    }

    #[test]
    fn spouse_inactivity_share_is_within_exposure_group() {
        let mut pop = Population::new();
        let a = pop.insert(person(Level::Low, Level::Low, Level::High));
        let b = pop.insert(person(Level::Low, Level::Low, Level::Low));
        pop.link_spouses(a, b).unwrap();

        let metrics = BehaviourMetrics::collect(&pop, None).unwrap();
        // b is active with an inactive spouse; a is inactive with an active one.
        assert_eq!(metrics.get("Proportion of lvl0 or lv1 activity with lvl2 spouse"), Some(1.0));
        assert_eq!(metrics.get("Proportion of lvl2 activity with lvl2 spouse"), Some(0.0));
        assert_eq!(metrics.get("Proportion of lvl2 activity with lvl0 or lvl1 spouse"), Some(1.0));
    }

    #[test]
    fn text_report_marks_undefined_as_nan() {
        let metrics = BehaviourMetrics::collect(&Population::new(), None).unwrap();
        let text = metrics.to_text();
        assert!(text.starts_with("Population:0\n"));
        assert!(text.contains("Average CVD risk:NaN"));
        assert_eq!(text.lines().count(), 34);
    }
}
