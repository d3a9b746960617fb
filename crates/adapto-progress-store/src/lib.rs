//! Adapto — `PostgreSQL` progress storage.

pub mod pg_progress_repository;

use sqlx::migrate::Migrator;

/// Embedded schema migrations, applied at server startup.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");
