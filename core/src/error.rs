use crate::types::{AgentId, RelationKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A relationship link without its mirror, or a link to an agent that
    /// is no longer in the registry. The relationship graph is corrupt.
    #[error("Graph integrity violated: {agent} -> {neighbour} ({relation}) has no matching back-reference")]
    GraphIntegrity {
        agent:     AgentId,
        neighbour: AgentId,
        relation:  RelationKind,
    },

    #[error("Unknown agent {agent}")]
    UnknownAgent { agent: AgentId },

    #[error("Weight table '{table}' has no entry for {key}")]
    MissingWeight { table: String, key: String },

    #[error("Weight table '{table}' entry {key} = {value} is outside [0, 1]")]
    InvalidWeight { table: String, key: String, value: f64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Run phase violation: expected {expected}, run is {actual}")]
    PhaseViolation { expected: &'static str, actual: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;
