//! Declarative scene definitions.

use serde::{Deserialize, Serialize};

/// Intent tag carried by a choice. Drives trust/suspicion scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceKind {
    /// Goes along with the system.
    Compliant,
    /// No particular stance.
    #[default]
    Neutral,
    /// Asks questions or investigates.
    Inquisitive,
    /// Resists the system outright.
    Defiant,
}

impl ChoiceKind {
    /// Stable name used in events and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compliant => "compliant",
            Self::Neutral => "neutral",
            Self::Inquisitive => "inquisitive",
            Self::Defiant => "defiant",
        }
    }
}

/// One enumerated option in a choice scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChoiceDefinition {
    /// Label shown to the player and matched against submissions.
    pub text: String,
    /// Short explanation shown under the label.
    #[serde(default)]
    pub description: String,
    /// Intent tag.
    #[serde(default)]
    pub kind: ChoiceKind,
    /// Destination; falls back to the scene's `next`.
    #[serde(default)]
    pub next: Option<String>,
    /// Detection added when this choice is taken.
    #[serde(default)]
    pub detection: Option<u32>,
}

/// How submitted answers are compared with the accepted ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerMatch {
    /// The normalized submission contains an accepted answer.
    #[default]
    Contains,
    /// The normalized submission equals an accepted answer.
    Exact,
}

fn default_max_attempts() -> u32 {
    3
}

/// A bounded-attempt correctness check attached to a scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PuzzleDefinition {
    /// Label shown above the answer input.
    pub prompt: String,
    /// Canonical answers.
    pub accepted_answers: Vec<String>,
    /// Wrong answers allowed before the puzzle is failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Comparison mode.
    #[serde(default)]
    pub matching: AnswerMatch,
    /// Scene entered on a correct answer.
    pub success: String,
    /// Scene entered once attempts are exhausted.
    pub failure: String,
    /// Path marked complete on a correct answer.
    #[serde(default)]
    pub completes_path: Option<String>,
    /// Detection added once attempts are exhausted.
    #[serde(default)]
    pub detection_on_failure: u32,
}

/// A single scene as authored in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneDefinition {
    /// Unique key.
    pub id: String,
    /// Display label.
    pub title: String,
    /// Background asset reference.
    #[serde(default)]
    pub background: Option<String>,
    /// Default narrative text.
    pub dialogue: String,
    /// Enumerated options, for choice scenes.
    #[serde(default)]
    pub choices: Vec<ChoiceDefinition>,
    /// Puzzle, for puzzle scenes.
    #[serde(default)]
    pub puzzle: Option<PuzzleDefinition>,
    /// Free-text prompt, for reflection scenes.
    #[serde(default)]
    pub prompt: Option<String>,
    /// Default destination.
    #[serde(default)]
    pub next: Option<String>,
    /// Whether transitions out of this scene consult the content generator.
    #[serde(default)]
    pub dynamic: bool,
    /// Whether entering this scene raises detection.
    #[serde(default)]
    pub risk: bool,
    /// Whether entering requires core access.
    #[serde(default)]
    pub gated: bool,
    /// Whether the play-through ends here.
    #[serde(default)]
    pub terminal: bool,
}

/// The single way a scene accepts player input.
#[derive(Debug, Clone, Copy)]
pub enum Interaction<'a> {
    /// The play-through ends here.
    Terminal,
    /// Pick one of the enumerated options.
    Choices(&'a [ChoiceDefinition]),
    /// Answer a puzzle.
    Puzzle(&'a PuzzleDefinition),
    /// Type anything, then continue to `next`.
    FreeText {
        /// Label above the input.
        prompt: &'a str,
        /// Destination.
        next: &'a str,
    },
}

impl SceneDefinition {
    /// Whether the player picks from enumerated options.
    #[must_use]
    pub fn is_choice_scene(&self) -> bool {
        !self.choices.is_empty()
    }

    /// Prompt shown above the answer input, when this is a puzzle scene.
    #[must_use]
    pub fn puzzle_prompt(&self) -> Option<&str> {
        self.puzzle.as_ref().map(|puzzle| puzzle.prompt.as_str())
    }

    /// Destination of a choice taken in this scene.
    #[must_use]
    pub fn choice_destination<'a>(&'a self, choice: &'a ChoiceDefinition) -> Option<&'a str> {
        choice.next.as_deref().or(self.next.as_deref())
    }

    /// How this scene accepts input. Only meaningful on a validated catalog,
    /// where exactly one mode is declared per non-terminal scene.
    #[must_use]
    pub fn interaction(&self) -> Interaction<'_> {
        if self.terminal {
            return Interaction::Terminal;
        }
        if let Some(puzzle) = &self.puzzle {
            return Interaction::Puzzle(puzzle);
        }
        if let (Some(prompt), Some(next)) = (&self.prompt, &self.next)
            && self.choices.is_empty()
        {
            return Interaction::FreeText { prompt, next };
        }
        Interaction::Choices(&self.choices)
    }
}
