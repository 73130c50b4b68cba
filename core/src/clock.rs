//! Run clock: owns the run phase and the timestep counter.
//!
//! Phases only move forward:
//! `Initializing → Running { completed } → Finalizing → Done`.

use crate::{
    error::{SimError, SimResult},
    types::{RunId, Tick},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum RunPhase {
    Initializing,
    Running { completed: Tick },
    Finalizing { completed: Tick },
    Done { completed: Tick },
}

impl RunPhase {
    pub fn name(&self) -> &'static str {
        match self {
            RunPhase::Initializing => "initializing",
            RunPhase::Running { .. } => "running",
            RunPhase::Finalizing { .. } => "finalizing",
            RunPhase::Done { .. } => "done",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimClock {
    pub run_id: RunId,
    pub phase:  RunPhase,
}

impl SimClock {
    pub fn new(run_id: RunId) -> Self {
        Self { run_id, phase: RunPhase::Initializing }
    }

    /// Initializing → Running.
    pub fn begin(&mut self) -> SimResult<()> {
        if !self.is_initializing() {
            return Err(violation("initializing", self.phase));
        }
        self.phase = RunPhase::Running { completed: 0 };
        Ok(())
    }

    /// Claim the next timestep. Returns its 0-based index.
    pub fn advance(&mut self) -> SimResult<Tick> {
        match self.phase {
            RunPhase::Running { completed } => {
                self.phase = RunPhase::Running { completed: completed + 1 };
                Ok(completed)
            }
            other => Err(violation("running", other)),
        }
    }

    /// Running → Finalizing.
    pub fn finalize(&mut self) -> SimResult<()> {
        match self.phase {
            RunPhase::Running { completed } => {
                self.phase = RunPhase::Finalizing { completed };
                Ok(())
            }
            other => Err(violation("running", other)),
        }
    }

    /// Finalizing → Done.
    pub fn finish(&mut self) -> SimResult<()> {
        match self.phase {
            RunPhase::Finalizing { completed } => {
                self.phase = RunPhase::Done { completed };
                Ok(())
            }
            other => Err(violation("finalizing", other)),
        }
    }

    pub fn is_initializing(&self) -> bool {
        self.phase == RunPhase::Initializing
    }

    pub fn is_done(&self) -> bool {
        matches!(self.phase, RunPhase::Done { .. })
    }

    /// Timesteps claimed so far; frozen once the run leaves Running.
    pub fn completed(&self) -> Tick {
        match self.phase {
            RunPhase::Initializing => 0,
            RunPhase::Running { completed }
            | RunPhase::Finalizing { completed }
            | RunPhase::Done { completed } => completed,
        }
    }
}

fn violation(expected: &'static str, actual: RunPhase) -> SimError {
    SimError::PhaseViolation { expected, actual: actual.name().to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_move_forward() {
        let mut clock = SimClock::new("r".into());
        clock.begin().unwrap();
        assert_eq!(clock.advance().unwrap(), 0);
        assert_eq!(clock.advance().unwrap(), 1);
        assert_eq!(clock.completed(), 2);
        clock.finalize().unwrap();
        clock.finish().unwrap();
        assert!(clock.is_done());
        assert_eq!(clock.completed(), 2);
    }

    #[test]
    fn advancing_before_begin_is_a_violation() {
        let mut clock = SimClock::new("r".into());
        assert!(matches!(
            clock.advance(),
            Err(SimError::PhaseViolation { expected: "running", .. })
        ));
    }

    #[test]
    fn no_going_back_after_finalize() {
        let mut clock = SimClock::new("r".into());
        clock.begin().unwrap();
        clock.finalize().unwrap();
        assert!(clock.advance().is_err());
        assert!(clock.begin().is_err());
        assert!(clock.finalize().is_err());
    }
}
