//! Application layer for the Narrative Orchestration context.

pub mod orchestrator;
pub mod views;
