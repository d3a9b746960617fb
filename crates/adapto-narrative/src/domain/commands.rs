//! Commands for the Narrative Orchestration context.

use adapto_core::command::Command;
use uuid::Uuid;

/// Command to act in the current scene: pick a choice, answer a puzzle, or
/// submit free text.
#[derive(Debug, Clone)]
pub struct SubmitChoice {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Choice text, 1-based choice number, puzzle answer, or free text.
    pub input: String,
    /// Detection to add for this action, overriding the catalog's amount.
    pub detection: Option<u32>,
}

impl Command for SubmitChoice {
    fn command_type(&self) -> &'static str {
        "narrative.submit_choice"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to restart the play-through, clearing the session and all progress.
#[derive(Debug, Clone)]
pub struct RestartGame {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
}

impl Command for RestartGame {
    fn command_type(&self) -> &'static str {
        "narrative.restart_game"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
