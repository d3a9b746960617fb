//! Adapto — Narrative Orchestration bounded context.
//!
//! Responsible for the scene catalog, the per-session play-through state,
//! puzzle gating, and the orchestrator that decides which scene comes next and
//! which progress side effects a transition carries.

pub mod application;
pub mod domain;
