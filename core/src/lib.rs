//! Agent-based simulation of lifestyle behaviour spread through a social
//! network and the CVD incidence it produces.

pub mod agent;
pub mod behaviour_metrics;
pub mod behaviour_subsystem;
pub mod clock;
pub mod config;
pub mod demographics;
pub mod engine;
pub mod error;
pub mod event;
pub mod incidence;
pub mod influence;
pub mod metrics_subsystem;
pub mod mortality_subsystem;
pub mod network;
pub mod population;
pub mod report;
pub mod risk;
pub mod rng;
pub mod snapshot;
pub mod state;
pub mod store;
pub mod subsystem;
pub mod transition;
pub mod types;
pub mod weights;
