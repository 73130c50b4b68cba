//! Subsystem trait.
//!
//! RULE: Every timestep step implements SimSubsystem.
//! The engine calls update() on each registered subsystem
//! in registration order, every timestep.
//! Execution order is fixed and documented in engine.rs.

use crate::{
    error::SimResult,
    event::SimEvent,
    rng::SubsystemRng,
    state::SimulationState,
    types::Tick,
};

/// The contract every subsystem must fulfill.
pub trait SimSubsystem: Send {
    /// Unique stable name for this subsystem.
    fn name(&self) -> &'static str;

    /// Called once per timestep by the engine.
    ///
    /// - `tick`:      the current timestep index (0-based)
    /// - `state`:     the run's mutable state
    /// - `events_in`: events emitted by earlier subsystems this timestep
    /// - `rng`:       this subsystem's deterministic RNG for this timestep
    ///
    /// Returns the new events to add to the timestep's event log.
    fn update(
        &mut self,
        tick: Tick,
        state: &mut SimulationState,
        events_in: &[SimEvent],
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>>;

    /// Called once before the baseline is recorded. Draws no randomness.
    fn initialize(&mut self, _state: &mut SimulationState) -> SimResult<()> {
        Ok(())
    }
}
