//! Puzzle gating: bounded-attempt answer checks.
//!
//! Matching is deliberately forgiving. Submissions and accepted answers are
//! normalized (lowercased, trimmed, inner whitespace collapsed) and, in the
//! default mode, a submission is correct if it contains any accepted answer.

use adapto_core::error::DomainError;
use serde::Serialize;

use super::catalog::SceneCatalog;
use super::scene::{AnswerMatch, PuzzleDefinition};

/// Lifecycle of a single puzzle visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    /// Still accepting answers.
    Pending,
    /// Solved.
    Correct,
    /// Out of attempts.
    FailedExhausted,
}

/// Attempt bookkeeping for one visit to a puzzle scene. Discarded when the
/// player leaves the scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PuzzleAttempt {
    /// Puzzle scene this attempt belongs to.
    pub scene_id: String,
    /// Wrong answers submitted so far.
    pub attempts_used: u32,
    /// Wrong answers allowed.
    pub max_attempts: u32,
    /// Current status.
    pub status: AttemptStatus,
}

impl PuzzleAttempt {
    /// Starts a fresh visit.
    #[must_use]
    pub fn new(scene_id: &str, max_attempts: u32) -> Self {
        Self {
            scene_id: scene_id.to_owned(),
            attempts_used: 0,
            max_attempts,
            status: AttemptStatus::Pending,
        }
    }

    /// Wrong answers still allowed.
    #[must_use]
    pub fn attempts_remaining(&self) -> u32 {
        self.max_attempts.saturating_sub(self.attempts_used)
    }
}

/// Result of evaluating one answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PuzzleOutcome {
    /// The answer was accepted.
    Correct {
        /// Wrong answers submitted before this one.
        attempts_used: u32,
    },
    /// Wrong, but attempts remain.
    Retry {
        /// Wrong answers so far.
        attempts_used: u32,
        /// Wrong answers still allowed.
        attempts_remaining: u32,
    },
    /// Wrong, and that was the last allowed attempt.
    FailedExhausted {
        /// Wrong answers submitted.
        attempts_used: u32,
    },
}

impl PuzzleOutcome {
    /// Stable name used in events and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Correct { .. } => "correct",
            Self::Retry { .. } => "retry",
            Self::FailedExhausted { .. } => "failed_exhausted",
        }
    }
}

/// Lowercases, trims, and collapses whitespace.
#[must_use]
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Whether `answer` satisfies the puzzle.
#[must_use]
pub fn answer_matches(puzzle: &PuzzleDefinition, answer: &str) -> bool {
    let submitted = normalize(answer);
    if submitted.is_empty() {
        return false;
    }
    puzzle
        .accepted_answers
        .iter()
        .map(|accepted| normalize(accepted))
        .filter(|accepted| !accepted.is_empty())
        .any(|accepted| match puzzle.matching {
            AnswerMatch::Contains => submitted.contains(&accepted),
            AnswerMatch::Exact => submitted == accepted,
        })
}

/// Evaluates answers against the puzzles in a catalog.
#[derive(Debug, Clone, Copy)]
pub struct PuzzleGate<'a> {
    catalog: &'a SceneCatalog,
}

impl<'a> PuzzleGate<'a> {
    /// Creates a gate over `catalog`.
    #[must_use]
    pub fn new(catalog: &'a SceneCatalog) -> Self {
        Self { catalog }
    }

    /// Evaluates one answer and updates the attempt state.
    ///
    /// Only wrong answers consume an attempt. The attempt is exhausted on the
    /// wrong answer that brings `attempts_used` up to `max_attempts`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnknownScene` if the scene does not exist, and
    /// `DomainError::Validation` if the scene has no puzzle, the attempt
    /// belongs to a different scene or is already resolved, or the answer is
    /// blank. The attempt is untouched on error.
    pub fn evaluate(
        &self,
        scene_id: &str,
        submitted_answer: &str,
        attempt: &mut PuzzleAttempt,
    ) -> Result<PuzzleOutcome, DomainError> {
        let scene = self.catalog.load_scene(scene_id)?;
        let Some(puzzle) = &scene.puzzle else {
            return Err(DomainError::Validation(format!(
                "scene {scene_id} has no puzzle"
            )));
        };
        if attempt.scene_id != scene_id {
            return Err(DomainError::Validation(format!(
                "attempt for scene {} cannot answer scene {scene_id}",
                attempt.scene_id
            )));
        }
        if attempt.status != AttemptStatus::Pending {
            return Err(DomainError::Validation(format!(
                "puzzle in scene {scene_id} is already resolved"
            )));
        }
        if submitted_answer.trim().is_empty() {
            return Err(DomainError::Validation("answer must not be blank".to_owned()));
        }

        if answer_matches(puzzle, submitted_answer) {
            attempt.status = AttemptStatus::Correct;
            return Ok(PuzzleOutcome::Correct {
                attempts_used: attempt.attempts_used,
            });
        }

        attempt.attempts_used += 1;
        if attempt.attempts_used >= attempt.max_attempts {
            attempt.status = AttemptStatus::FailedExhausted;
            Ok(PuzzleOutcome::FailedExhausted {
                attempts_used: attempt.attempts_used,
            })
        } else {
            Ok(PuzzleOutcome::Retry {
                attempts_used: attempt.attempts_used,
                attempts_remaining: attempt.attempts_remaining(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> SceneCatalog {
        SceneCatalog::builtin().unwrap()
    }

    #[test]
    fn test_three_wrong_answers_exhaust_on_the_third() {
        // Arrange
        let catalog = catalog();
        let gate = PuzzleGate::new(&catalog);
        let mut attempt = PuzzleAttempt::new("echo_node", 3);

        // Act
        let first = gate.evaluate("echo_node", "yesterday", &mut attempt).unwrap();
        let second = gate.evaluate("echo_node", "tomorrow", &mut attempt).unwrap();
        let third = gate.evaluate("echo_node", "never", &mut attempt).unwrap();

        // Assert
        assert_eq!(
            first,
            PuzzleOutcome::Retry {
                attempts_used: 1,
                attempts_remaining: 2
            }
        );
        assert_eq!(
            second,
            PuzzleOutcome::Retry {
                attempts_used: 2,
                attempts_remaining: 1
            }
        );
        assert_eq!(third, PuzzleOutcome::FailedExhausted { attempts_used: 3 });
        assert_eq!(attempt.status, AttemptStatus::FailedExhausted);
    }

    #[test]
    fn test_correct_on_second_attempt_does_not_consume_an_attempt() {
        // Arrange
        let catalog = catalog();
        let gate = PuzzleGate::new(&catalog);
        let mut attempt = PuzzleAttempt::new("echo_node", 3);

        // Act
        gate.evaluate("echo_node", "no idea", &mut attempt).unwrap();
        let outcome = gate
            .evaluate("echo_node", "2157.03.15.14:23:47", &mut attempt)
            .unwrap();

        // Assert
        assert_eq!(outcome, PuzzleOutcome::Correct { attempts_used: 1 });
        assert_eq!(attempt.attempts_used, 1);
        assert_eq!(attempt.status, AttemptStatus::Correct);
    }

    #[test]
    fn test_case_varied_answer_is_accepted() {
        let catalog = catalog();
        let gate = PuzzleGate::new(&catalog);
        let mut attempt = PuzzleAttempt::new("echo_node", 3);

        let outcome = gate.evaluate("echo_node", "March 15 2157", &mut attempt).unwrap();

        assert_eq!(outcome, PuzzleOutcome::Correct { attempts_used: 0 });
    }

    #[test]
    fn test_contains_matching_tolerates_surrounding_text() {
        let catalog = catalog();
        let gate = PuzzleGate::new(&catalog);
        let mut attempt = PuzzleAttempt::new("echo_node", 3);

        let outcome = gate
            .evaluate("echo_node", "  I think it was   MARCH 15   2157?  ", &mut attempt)
            .unwrap();

        assert_eq!(outcome, PuzzleOutcome::Correct { attempts_used: 0 });
    }

    #[test]
    fn test_exact_matching_rejects_answers_that_merely_contain_the_letter() {
        // Arrange
        let catalog = catalog();
        let gate = PuzzleGate::new(&catalog);
        let mut attempt = PuzzleAttempt::new("glitch_path_1", 1);

        // Act
        let outcome = gate.evaluate("glitch_path_1", "abc", &mut attempt).unwrap();

        // Assert
        assert_eq!(outcome, PuzzleOutcome::FailedExhausted { attempts_used: 1 });
    }

    #[test]
    fn test_exact_matching_accepts_letter_in_any_case() {
        let catalog = catalog();
        let gate = PuzzleGate::new(&catalog);
        let mut attempt = PuzzleAttempt::new("glitch_path_1", 1);

        let outcome = gate.evaluate("glitch_path_1", " C ", &mut attempt).unwrap();

        assert_eq!(outcome, PuzzleOutcome::Correct { attempts_used: 0 });
    }

    #[test]
    fn test_blank_answer_is_rejected_without_consuming_an_attempt() {
        let catalog = catalog();
        let gate = PuzzleGate::new(&catalog);
        let mut attempt = PuzzleAttempt::new("echo_node", 3);

        let result = gate.evaluate("echo_node", "   ", &mut attempt);

        match result.unwrap_err() {
            DomainError::Validation(msg) => assert_eq!(msg, "answer must not be blank"),
            other => panic!("expected Validation, got {other:?}"),
        }
        assert_eq!(attempt.attempts_used, 0);
    }

    #[test]
    fn test_resolved_attempt_rejects_further_answers() {
        let catalog = catalog();
        let gate = PuzzleGate::new(&catalog);
        let mut attempt = PuzzleAttempt::new("echo_node", 3);
        gate.evaluate("echo_node", "march 15 2157", &mut attempt).unwrap();

        let result = gate.evaluate("echo_node", "march 15 2157", &mut attempt);

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_scene_without_puzzle_is_rejected() {
        let catalog = catalog();
        let gate = PuzzleGate::new(&catalog);
        let mut attempt = PuzzleAttempt::new("intro", 3);

        let result = gate.evaluate("intro", "anything", &mut attempt);

        match result.unwrap_err() {
            DomainError::Validation(msg) => assert_eq!(msg, "scene intro has no puzzle"),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_scene_is_reported() {
        let catalog = catalog();
        let gate = PuzzleGate::new(&catalog);
        let mut attempt = PuzzleAttempt::new("vault_9", 3);

        let result = gate.evaluate("vault_9", "anything", &mut attempt);

        assert!(matches!(result, Err(DomainError::UnknownScene(_))));
    }

    #[test]
    fn test_normalize_collapses_whitespace_and_case() {
        assert_eq!(normalize("  March\t15 \n 2157 "), "march 15 2157");
    }
}
