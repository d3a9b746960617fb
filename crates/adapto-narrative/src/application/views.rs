//! Read-only projections for the presentation layer.

use adapto_progress::application::store::ProgressStore;
use serde::Serialize;

use crate::domain::catalog::SceneCatalog;
use crate::domain::puzzle::normalize;
use crate::domain::scene::{ChoiceKind, SceneDefinition};
use crate::domain::session::{ContentOverlay, SessionState};

/// A choice as it is currently offered, after generated content and gating
/// have been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OfferedChoice {
    pub(crate) text: String,
    pub(crate) description: String,
    pub(crate) kind: ChoiceKind,
    pub(crate) destination: Option<String>,
    pub(crate) detection: Option<u32>,
}

/// Comparison key for choice text: leading arrow dropped, then normalized.
pub(crate) fn choice_key(text: &str) -> String {
    normalize(text.trim_start().trim_start_matches('→'))
}

/// The choices the player can pick from in `scene` right now.
///
/// Generated choices replace the authored ones; a generated choice whose text
/// matches an authored one keeps the authored tag and destination. Choices
/// leading into a gated scene are hidden until the core is unlocked.
pub(crate) fn offered_choices(
    catalog: &SceneCatalog,
    scene: &SceneDefinition,
    overlay: Option<&ContentOverlay>,
    core_unlocked: bool,
) -> Vec<OfferedChoice> {
    let authored = |text: &str| {
        let key = choice_key(text);
        scene
            .choices
            .iter()
            .find(|choice| choice_key(&choice.text) == key)
    };

    let generated = overlay
        .and_then(|overlay| overlay.choices.as_ref())
        .filter(|choices| scene.is_choice_scene() && !choices.is_empty());

    let offered: Vec<OfferedChoice> = match generated {
        Some(choices) => choices
            .iter()
            .map(|choice| match authored(&choice.text) {
                Some(known) => OfferedChoice {
                    text: choice.text.clone(),
                    description: choice.description.clone(),
                    kind: known.kind,
                    destination: scene.choice_destination(known).map(str::to_owned),
                    detection: known.detection,
                },
                None => OfferedChoice {
                    text: choice.text.clone(),
                    description: choice.description.clone(),
                    kind: ChoiceKind::Neutral,
                    destination: None,
                    detection: None,
                },
            })
            .collect(),
        None => scene
            .choices
            .iter()
            .map(|choice| OfferedChoice {
                text: choice.text.clone(),
                description: choice.description.clone(),
                kind: choice.kind,
                destination: scene.choice_destination(choice).map(str::to_owned),
                detection: choice.detection,
            })
            .collect(),
    };

    offered
        .into_iter()
        .filter(|choice| {
            core_unlocked
                || !choice
                    .destination
                    .as_deref()
                    .and_then(|id| catalog.get(id))
                    .is_some_and(|target| target.gated)
        })
        .collect()
}

/// A choice in the scene view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceView {
    /// 1-based position, accepted as a submission.
    pub number: usize,
    /// Label.
    pub text: String,
    /// Short explanation.
    pub description: String,
}

/// The detection meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DetectionView {
    /// Current value.
    pub count: u32,
    /// Ceiling.
    pub limit: u32,
}

/// Everything the presentation layer needs to render the current scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneView {
    /// Scene id.
    pub scene_id: String,
    /// Title.
    pub title: String,
    /// Background asset reference.
    pub background: Option<String>,
    /// Dialogue, generated when available.
    pub dialogue: String,
    /// Whether the player picks from `choices`.
    pub is_choice_scene: bool,
    /// Choices on offer.
    pub choices: Vec<ChoiceView>,
    /// Puzzle input label.
    pub puzzle_prompt: Option<String>,
    /// Free-text input label.
    pub prompt: Option<String>,
    /// Wrong answers still allowed, for puzzle scenes.
    pub attempts_remaining: Option<u32>,
    /// Whether a content request is outstanding.
    pub is_loading: bool,
    /// Whether the play-through is over.
    pub is_terminal: bool,
    /// Why the last transition used static content.
    pub last_error: Option<String>,
    /// Detection meter.
    pub detection: DetectionView,
    /// Whether every required path is complete.
    pub core_unlocked: bool,
    /// Scenes entered so far.
    pub visited: Vec<String>,
}

/// Projects the session onto its current scene.
#[must_use]
pub fn project(catalog: &SceneCatalog, session: &SessionState, progress: &ProgressStore) -> SceneView {
    let scene = catalog.scene_or_fallback(session.current_scene());
    let record = progress.snapshot();
    let rules = progress.rules();
    let core_unlocked = record.core_unlocked(rules);
    let overlay = session.overlay.as_ref();

    let choices = if scene.is_choice_scene() {
        offered_choices(catalog, scene, overlay, core_unlocked)
            .into_iter()
            .enumerate()
            .map(|(index, choice)| ChoiceView {
                number: index + 1,
                text: choice.text,
                description: choice.description,
            })
            .collect()
    } else {
        Vec::new()
    };

    let attempts_remaining = scene.puzzle.as_ref().map(|puzzle| {
        session
            .puzzle_attempt()
            .filter(|attempt| attempt.scene_id == scene.id)
            .map_or(puzzle.max_attempts, |attempt| attempt.attempts_remaining())
    });

    SceneView {
        scene_id: scene.id.clone(),
        title: scene.title.clone(),
        background: scene.background.clone(),
        dialogue: overlay.map_or_else(
            || scene.dialogue.trim_end().to_owned(),
            |overlay| overlay.dialogue.clone(),
        ),
        is_choice_scene: scene.is_choice_scene(),
        choices,
        puzzle_prompt: scene.puzzle_prompt().map(str::to_owned),
        prompt: scene.prompt.clone(),
        attempts_remaining,
        is_loading: session.is_awaiting_content(),
        is_terminal: scene.terminal,
        last_error: session.last_error().map(str::to_owned),
        detection: DetectionView {
            count: record.detection_count(),
            limit: rules.detection_limit,
        },
        core_unlocked,
        visited: session.visited().iter().cloned().collect(),
    }
}

/// A scene definition as exposed to clients. Puzzle answers are withheld.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneSummary {
    /// Scene id.
    pub id: String,
    /// Title.
    pub title: String,
    /// Background asset reference.
    pub background: Option<String>,
    /// Default dialogue.
    pub dialogue: String,
    /// Whether the player picks from `choices`.
    pub is_choice_scene: bool,
    /// Authored choices.
    pub choices: Vec<ChoiceView>,
    /// Puzzle input label.
    pub puzzle_prompt: Option<String>,
    /// Free-text input label.
    pub prompt: Option<String>,
    /// Whether transitions consult the content generator.
    pub dynamic: bool,
    /// Whether entering raises detection.
    pub risk: bool,
    /// Whether entering requires core access.
    pub gated: bool,
    /// Whether the play-through ends here.
    pub terminal: bool,
}

impl From<&SceneDefinition> for SceneSummary {
    fn from(scene: &SceneDefinition) -> Self {
        Self {
            id: scene.id.clone(),
            title: scene.title.clone(),
            background: scene.background.clone(),
            dialogue: scene.dialogue.trim_end().to_owned(),
            is_choice_scene: scene.is_choice_scene(),
            choices: scene
                .choices
                .iter()
                .enumerate()
                .map(|(index, choice)| ChoiceView {
                    number: index + 1,
                    text: choice.text.clone(),
                    description: choice.description.clone(),
                })
                .collect(),
            puzzle_prompt: scene.puzzle_prompt().map(str::to_owned),
            prompt: scene.prompt.clone(),
            dynamic: scene.dynamic,
            risk: scene.risk,
            gated: scene.gated,
            terminal: scene.terminal,
        }
    }
}
