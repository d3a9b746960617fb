//! Domain events for the Narrative Orchestration context.

use adapto_core::event::{DomainEvent, EventMetadata};
use serde::{Deserialize, Serialize};

use super::scene::ChoiceKind;

/// Event type for [`SceneEntered`].
pub const SCENE_ENTERED_EVENT_TYPE: &str = "narrative.scene_entered";
/// Event type for [`ChoiceRecorded`].
pub const CHOICE_RECORDED_EVENT_TYPE: &str = "narrative.choice_recorded";
/// Event type for [`PuzzleAttempted`].
pub const PUZZLE_ATTEMPTED_EVENT_TYPE: &str = "narrative.puzzle_attempted";
/// Event type for [`DetectionIncreased`].
pub const DETECTION_INCREASED_EVENT_TYPE: &str = "narrative.detection_increased";
/// Event type for [`PathCompleted`].
pub const PATH_COMPLETED_EVENT_TYPE: &str = "narrative.path_completed";
/// Event type for [`PlayerDetected`].
pub const PLAYER_DETECTED_EVENT_TYPE: &str = "narrative.player_detected";
/// Event type for [`ContentFallbackUsed`].
pub const CONTENT_FALLBACK_USED_EVENT_TYPE: &str = "narrative.content_fallback_used";

/// Emitted when the session moves to a different scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneEntered {
    /// Scene left.
    pub from_scene: String,
    /// Scene entered.
    pub to_scene: String,
}

/// Emitted when a choice or free-text response is added to the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceRecorded {
    /// Scene the choice was made in.
    pub scene_id: String,
    /// Text recorded.
    pub text: String,
    /// Intent tag.
    pub kind: ChoiceKind,
}

/// Emitted for every evaluated puzzle answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleAttempted {
    /// Puzzle scene.
    pub scene_id: String,
    /// `correct`, `retry`, or `failed_exhausted`.
    pub outcome: String,
    /// Wrong answers so far.
    pub attempts_used: u32,
}

/// Emitted when the detection meter goes up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionIncreased {
    /// Amount actually added after clamping.
    pub amount: u32,
    /// New value of the meter.
    pub detection_count: u32,
}

/// Emitted when an investigation path is completed for the first time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathCompleted {
    /// Path name.
    pub path: String,
}

/// Emitted when the detection meter reaches its limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerDetected {
    /// Scene the player was caught in.
    pub scene_id: String,
    /// Where the transition would otherwise have gone.
    pub intended_scene: String,
    /// Value of the meter.
    pub detection_count: u32,
}

/// Emitted when generated content was unavailable and static content was used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentFallbackUsed {
    /// Scene the player acted in.
    pub scene_id: String,
    /// Why the generator's result was not used.
    pub reason: String,
}

/// Event payload variants for the Narrative Orchestration context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NarrativeEventKind {
    /// The session moved to a different scene.
    SceneEntered(SceneEntered),
    /// A choice was recorded.
    ChoiceRecorded(ChoiceRecorded),
    /// A puzzle answer was evaluated.
    PuzzleAttempted(PuzzleAttempted),
    /// The detection meter went up.
    DetectionIncreased(DetectionIncreased),
    /// A path was completed.
    PathCompleted(PathCompleted),
    /// The player was caught.
    PlayerDetected(PlayerDetected),
    /// Static content replaced generated content.
    ContentFallbackUsed(ContentFallbackUsed),
}

impl NarrativeEventKind {
    /// The event type name for this payload.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SceneEntered(_) => SCENE_ENTERED_EVENT_TYPE,
            Self::ChoiceRecorded(_) => CHOICE_RECORDED_EVENT_TYPE,
            Self::PuzzleAttempted(_) => PUZZLE_ATTEMPTED_EVENT_TYPE,
            Self::DetectionIncreased(_) => DETECTION_INCREASED_EVENT_TYPE,
            Self::PathCompleted(_) => PATH_COMPLETED_EVENT_TYPE,
            Self::PlayerDetected(_) => PLAYER_DETECTED_EVENT_TYPE,
            Self::ContentFallbackUsed(_) => CONTENT_FALLBACK_USED_EVENT_TYPE,
        }
    }
}

/// Domain event envelope for the Narrative Orchestration context.
#[derive(Debug, Clone, Serialize)]
pub struct NarrativeEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: NarrativeEventKind,
}

impl DomainEvent for NarrativeEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
