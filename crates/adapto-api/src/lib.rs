//! Adapto API — library root.
//!
//! Exposes modules for use by integration tests and the binary entry point.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;
