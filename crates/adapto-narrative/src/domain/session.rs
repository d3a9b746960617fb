//! In-memory state of one play-through.

use std::collections::BTreeSet;

use adapto_core::clock::Clock;
use adapto_core::error::DomainError;
use adapto_core::event::EventMetadata;
use adapto_core::generator::GeneratedChoice;
use uuid::Uuid;

use super::events::{NarrativeEvent, NarrativeEventKind};
use super::history::ChoiceRecord;
use super::puzzle::PuzzleAttempt;

/// Content shown in place of the current scene's defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentOverlay {
    /// Dialogue replacing the scene's default dialogue.
    pub dialogue: String,
    /// Choices replacing the scene's default choices.
    pub choices: Option<Vec<GeneratedChoice>>,
}

/// Where the player is right now. Not persisted.
///
/// `generation` increases on every reset. Work started against one
/// generation must not be applied to another.
#[derive(Debug)]
pub struct SessionState {
    pub(crate) session_id: Uuid,
    pub(crate) generation: u64,
    pub(crate) current_scene: String,
    pub(crate) choice_history: Vec<ChoiceRecord>,
    pub(crate) awaiting_content: bool,
    pub(crate) last_error: Option<String>,
    pub(crate) puzzle_attempt: Option<PuzzleAttempt>,
    pub(crate) overlay: Option<ContentOverlay>,
    pub(crate) visited: BTreeSet<String>,
    sequence: i64,
}

impl SessionState {
    /// Creates a session positioned at `start_scene`.
    #[must_use]
    pub fn new(session_id: Uuid, start_scene: &str) -> Self {
        Self {
            session_id,
            generation: 0,
            current_scene: start_scene.to_owned(),
            choice_history: Vec::new(),
            awaiting_content: false,
            last_error: None,
            puzzle_attempt: None,
            overlay: None,
            visited: BTreeSet::from([start_scene.to_owned()]),
            sequence: 0,
        }
    }

    /// Session identifier.
    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Current generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Current scene id.
    #[must_use]
    pub fn current_scene(&self) -> &str {
        &self.current_scene
    }

    /// Every recorded choice, oldest first.
    #[must_use]
    pub fn choice_history(&self) -> &[ChoiceRecord] {
        &self.choice_history
    }

    /// Whether a content request is outstanding.
    #[must_use]
    pub fn is_awaiting_content(&self) -> bool {
        self.awaiting_content
    }

    /// Reason the last transition fell back to static content.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Scenes entered during this play-through.
    #[must_use]
    pub fn visited(&self) -> &BTreeSet<String> {
        &self.visited
    }

    /// Puzzle attempt state for the current scene, if it is a puzzle.
    #[must_use]
    pub fn puzzle_attempt(&self) -> Option<&PuzzleAttempt> {
        self.puzzle_attempt.as_ref()
    }

    /// Marks a content request as outstanding and returns the generation it
    /// belongs to.
    pub(crate) fn begin_content_request(&mut self) -> u64 {
        self.awaiting_content = true;
        self.generation
    }

    /// Closes a content request issued for `issued_generation`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::StaleSession` if the session was reset since the
    /// request was issued. The session is left as the reset made it.
    pub(crate) fn finish_content_request(&mut self, issued_generation: u64) -> Result<(), DomainError> {
        if issued_generation != self.generation {
            return Err(DomainError::StaleSession {
                issued_generation,
                current_generation: self.generation,
            });
        }
        self.awaiting_content = false;
        Ok(())
    }

    /// Moves to `scene_id`, dropping per-scene state.
    pub(crate) fn enter_scene(&mut self, scene_id: &str) {
        self.current_scene = scene_id.to_owned();
        self.visited.insert(scene_id.to_owned());
        self.puzzle_attempt = None;
        self.overlay = None;
    }

    /// Returns the session to `start_scene` with an empty history and bumps
    /// the generation so outstanding work is discarded.
    pub(crate) fn reset(&mut self, start_scene: &str) {
        self.generation += 1;
        self.current_scene = start_scene.to_owned();
        self.choice_history.clear();
        self.awaiting_content = false;
        self.last_error = None;
        self.puzzle_attempt = None;
        self.overlay = None;
        self.visited.clear();
        self.visited.insert(start_scene.to_owned());
    }

    /// Returns the next sequence number for a new event.
    fn next_sequence_number(&mut self) -> i64 {
        self.sequence += 1;
        self.sequence
    }

    /// Wraps a payload in an event envelope for this session.
    pub(crate) fn event(
        &mut self,
        kind: NarrativeEventKind,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> NarrativeEvent {
        NarrativeEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: kind.event_type().to_owned(),
                session_id: self.session_id,
                sequence_number: self.next_sequence_number(),
                correlation_id,
                occurred_at: clock.now(),
            },
            kind,
        }
    }
}
