//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A scene id is not present in the scene catalog.
    #[error("unknown scene: {0}")]
    UnknownScene(String),

    /// A validation error in domain logic or player input.
    #[error("validation error: {0}")]
    Validation(String),

    /// A submission arrived while another one is still waiting on content.
    #[error("a submission is already in flight for session {session_id}")]
    SubmissionInFlight {
        /// The session that is busy.
        session_id: Uuid,
    },

    /// A pending result belongs to a session generation that no longer exists.
    #[error(
        "stale session: result issued for generation {issued_generation}, current generation is {current_generation}"
    )]
    StaleSession {
        /// Generation the work was issued for.
        issued_generation: u64,
        /// Generation of the session when the work completed.
        current_generation: u64,
    },

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}
