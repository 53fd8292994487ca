//! Orchestrator - partition, dispatch, merge
//!
//! Implements the fan-out/fan-in over worker processes.
//!
//! See `engine.rs` for full implementation.

pub mod engine;


// Re-export main types for convenience
pub use engine::{orchestrate, OrchestrationError, Orchestrator, OrchestratorConfig};
