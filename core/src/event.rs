//! The event bus for all inter-subsystem communication.
//!
//! RULE: Subsystems communicate ONLY through events and the shared
//! `SimulationState`. A subsystem never calls another subsystem directly.

use crate::types::{AgentId, RunId, Sex, Tick};
use serde::{Deserialize, Serialize};

/// Every event emitted during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    // ── Engine events ──────────────────────────────
    TickStarted {
        tick: Tick,
    },
    TickCompleted {
        tick: Tick,
    },
    RunInitialized {
        run_id:     RunId,
        seed:       u64,
        population: usize,
    },
    RunFinalized {
        run_id:       RunId,
        timesteps:    Tick,
        survivors:    usize,
        total_deaths: usize,
    },

    // ── Behaviour events ───────────────────────────
    LevelsCommitted {
        tick:    Tick,
        agents:  usize,
        changed: usize,
    },

    // ── Mortality events ───────────────────────────
    AgentDied {
        tick:      Tick,
        agent_id:  AgentId,
        sex:       Sex,
        age:       u32,
        imd:       u8,
        cv_chance: f64,
    },
    MortalityPassCompleted {
        tick:      Tick,
        survivors: usize,
        deaths:    usize,
    },

    // ── Metrics events ─────────────────────────────
    AnalyticsRecorded {
        tick:          Tick,
        population:    usize,
        avg_cv_chance: Option<f64>,
    },
}

impl SimEvent {
    /// Stable name for the event_type column in event_log.
    pub fn type_name(&self) -> &'static str {
        match self {
            SimEvent::TickStarted { .. }            => "tick_started",
            SimEvent::TickCompleted { .. }          => "tick_completed",
            SimEvent::RunInitialized { .. }         => "run_initialized",
            SimEvent::RunFinalized { .. }           => "run_finalized",
            SimEvent::LevelsCommitted { .. }        => "levels_committed",
            SimEvent::AgentDied { .. }              => "agent_died",
            SimEvent::MortalityPassCompleted { .. } => "mortality_pass_completed",
            SimEvent::AnalyticsRecorded { .. }      => "analytics_recorded",
        }
    }
}

/// The event log entry as persisted to SQLite.
///
/// `tick` is the timestep index; engine events outside any timestep use
/// `BASELINE_TIMESTEP` (initialization) or the completed count (finalization).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id:         Option<i64>,
    pub run_id:     RunId,
    pub tick:       i64,
    pub subsystem:  String,
    pub event_type: String,
    pub payload:    String, // JSON-serialized SimEvent
}

impl EventLogEntry {
    pub fn new(run_id: &str, tick: i64, subsystem: &str, event: &SimEvent) -> serde_json::Result<Self> {
        Ok(Self {
            id:         None,
            run_id:     run_id.to_string(),
            tick,
            subsystem:  subsystem.to_string(),
            event_type: event.type_name().to_string(),
            payload:    serde_json::to_string(event)?,
        })
    }
}
