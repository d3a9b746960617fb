//! Application layer for the Progress context.

pub mod store;
