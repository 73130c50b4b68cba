//! Deterministic random number generation.
//!
//! RULE: Nothing in the simulation may call any platform RNG.
//! All randomness flows through SubsystemRng instances derived
//! from the single master seed given to the engine.
//!
//! Each subsystem gets its own RNG stream per timestep, seeded from
//! (master_seed, subsystem slot, timestep). This means:
//!   - Adding a new subsystem never changes existing subsystems' streams.
//!   - Each subsystem's stream is fully reproducible in isolation.
//!   - Re-running a single timestep from a snapshot replays the same draws.

use crate::types::Tick;
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// A named, deterministic RNG for a single subsystem.
pub struct SubsystemRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl SubsystemRng {
    /// Create a subsystem RNG from the master seed and a stable
    /// subsystem index. The index must never change once assigned.
    pub fn new(master_seed: u64, subsystem_index: u64) -> Self {
        let derived_seed = master_seed ^ (subsystem_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Bernoulli trial: returns true with probability p.
    /// p <= 0 never succeeds; p >= 1 always does.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Pick an index with probability proportional to `weights`.
    /// Returns None when every weight is zero.
    pub fn weighted_index(&mut self, weights: &[f64]) -> Option<usize> {
        let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
        if total <= 0.0 {
            return None;
        }
        let roll = self.next_f64() * total;
        let mut cumulative = 0.0;
        let mut last_positive = None;
        for (i, w) in weights.iter().enumerate() {
            if *w <= 0.0 {
                continue;
            }
            cumulative += w;
            last_positive = Some(i);
            if roll < cumulative {
                return Some(i);
            }
        }
        last_positive
    }
}

/// All subsystem RNGs for a single run, indexed by stable slot.
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    pub fn for_subsystem(&self, slot: SubsystemSlot) -> SubsystemRng {
        SubsystemRng::new(self.master_seed, slot as u64).with_name(slot.name())
    }

    /// Stream for `slot` at a given timestep. Distinct timesteps never
    /// share a stream.
    pub fn for_subsystem_at_tick(&self, slot: SubsystemSlot, tick: Tick) -> SubsystemRng {
        let tick_seed = self
            .master_seed
            .wrapping_add(tick.wrapping_add(1).wrapping_mul(0xbf58_476d_1ce4_e5b9));
        SubsystemRng::new(tick_seed, slot as u64).with_name(slot.name())
    }
}

/// Stable subsystem slot assignments.
/// NEVER reorder or remove entries; only append.
/// Reordering changes every subsystem's seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum SubsystemSlot {
    Network = 0,
    Behaviour = 1,
    Mortality = 2,
    Metrics = 3,
}

impl SubsystemSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Behaviour => "behaviour",
            Self::Mortality => "mortality",
            Self::Metrics => "metrics",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streams_are_reproducible() {
        let bank_a = RngBank::new(12345);
        let bank_b = RngBank::new(12345);
        let mut a = bank_a.for_subsystem_at_tick(SubsystemSlot::Mortality, 3);
        let mut b = bank_b.for_subsystem_at_tick(SubsystemSlot::Mortality, 3);
        for _ in 0..32 {
            assert_eq!(a.next_f64().to_bits(), b.next_f64().to_bits());
        }
    }

    #[test]
    fn ticks_and_slots_get_distinct_streams() {
        let bank = RngBank::new(7);
        let t0 = bank.for_subsystem_at_tick(SubsystemSlot::Mortality, 0).next_f64();
        let t1 = bank.for_subsystem_at_tick(SubsystemSlot::Mortality, 1).next_f64();
        let other = bank.for_subsystem_at_tick(SubsystemSlot::Behaviour, 0).next_f64();
        assert_ne!(t0, t1);
        assert_ne!(t0, other);
    }

    #[test]
    fn chance_respects_certain_outcomes() {
        let mut rng = RngBank::new(1).for_subsystem(SubsystemSlot::Mortality);
        for _ in 0..1000 {
            assert!(!rng.chance(0.0));
            assert!(rng.chance(1.0));
        }
    }

    #[test]
    fn weighted_index_skips_zero_weights() {
        let mut rng = RngBank::new(99).for_subsystem(SubsystemSlot::Network);
        assert_eq!(rng.weighted_index(&[0.0, 0.0, 0.0]), None);
        for _ in 0..200 {
            assert_eq!(rng.weighted_index(&[0.0, 0.0, 0.5]), Some(2));
        }
    }
}
