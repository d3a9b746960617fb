//! Domain layer for the Narrative Orchestration context.

pub mod catalog;
pub mod commands;
pub mod events;
pub mod history;
pub mod puzzle;
pub mod scene;
pub mod session;
