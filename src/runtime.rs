//! Runtime glue that wires configs, collaborator interfaces, application hooks,
//! shutdown triggers, telemetry, and runner orchestration.

pub mod collaborators;
pub mod config;
pub mod protocol;
pub mod runner;
pub mod shutdown;
pub mod telemetry;
