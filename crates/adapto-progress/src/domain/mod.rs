//! Domain layer for the Progress context.

pub mod layout;
pub mod record;
