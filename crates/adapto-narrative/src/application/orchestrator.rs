//! The narrative orchestrator: the single authority for what scene comes next.
//!
//! A submission is handled in up to three steps. The input is resolved against
//! the current scene while the session lock is held. For dynamic scenes the
//! lock is then released while the content generator runs, with the session
//! marked as awaiting content and the request tagged with the session
//! generation. Finally the lock is retaken, the generation is checked, and
//! the transition is committed: progress side effects first, then the forced
//! detected terminal, then gating, then the session update.
//!
//! Content generation never blocks progression. Timeouts, transport failures
//! and malformed replies all fall back to the static transition table with a
//! "connection lost" line in front of the destination's dialogue.
//!
//! Submissions and restarts run on their own tasks. A caller that stops
//! waiting does not cut them short, so the awaiting flag is always cleared
//! and a restart always lands in memory once it has landed in storage.

use std::sync::Arc;
use std::time::Duration;

use adapto_core::clock::Clock;
use adapto_core::command::Command;
use adapto_core::error::DomainError;
use adapto_core::event::DomainEvent;
use adapto_core::generator::{ContentError, ContentGenerator, ContentRequest, GeneratedContent};
use adapto_progress::application::store::{ProgressChange, ProgressEffects, ProgressStore};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{Instrument, debug, info, instrument, warn};
use uuid::Uuid;

use crate::application::views::{self, OfferedChoice, SceneView, choice_key, offered_choices};
use crate::domain::catalog::SceneCatalog;
use crate::domain::commands::{RestartGame, SubmitChoice};
use crate::domain::events::{
    ChoiceRecorded, ContentFallbackUsed, DetectionIncreased, NarrativeEvent, NarrativeEventKind,
    PathCompleted, PlayerDetected, PuzzleAttempted, SceneEntered,
};
use crate::domain::history::{ChoiceRecord, disposition};
use crate::domain::puzzle::{AttemptStatus, PuzzleAttempt, PuzzleGate, PuzzleOutcome};
use crate::domain::scene::{ChoiceKind, Interaction, PuzzleDefinition, SceneDefinition};
use crate::domain::session::{ContentOverlay, SessionState};

/// Default bound on a single content generator call.
pub const DEFAULT_CONTENT_TIMEOUT: Duration = Duration::from_secs(8);

/// In-universe line shown when generated content is unavailable.
pub const CONNECTION_LOST_LINE: &str =
    "[CONNECTION LOST] ADAPTO's voice dissolves into static. Local memory takes over.";

/// Tunables for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Bound on a single content generator call.
    pub content_timeout: Duration,
    /// Line prefixed to static dialogue when generation fails.
    pub connection_lost_line: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            content_timeout: DEFAULT_CONTENT_TIMEOUT,
            connection_lost_line: CONNECTION_LOST_LINE.to_owned(),
        }
    }
}

/// Where the dialogue shown after a transition came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSource {
    /// Authored catalog content.
    Static,
    /// The content generator.
    Generated,
    /// Authored content behind a "connection lost" line.
    Fallback,
}

/// The outcome of one submission.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionResult {
    /// Scene the player acted in.
    pub from_scene: String,
    /// Scene the player is in now.
    pub to_scene: String,
    /// Where the new dialogue came from.
    pub content_source: ContentSource,
    /// Puzzle evaluation, for puzzle scenes.
    pub puzzle: Option<PuzzleOutcome>,
    /// Detection meter after the transition.
    pub detection_count: u32,
    /// Whether the player has been caught.
    pub detected: bool,
    /// Events produced by the transition, in order.
    pub events: Vec<NarrativeEvent>,
}

/// A resolved non-puzzle submission.
#[derive(Debug, Clone)]
struct Move {
    record: ChoiceRecord,
    destination: Option<String>,
    detection: Option<u32>,
}

enum Resolved<'a> {
    Move(Move),
    Puzzle(&'a PuzzleDefinition),
}

enum ContentOutcome {
    Static,
    Generated(ContentOverlay),
    Failed(String),
}

/// Everything decided about a transition before gating and detection are
/// applied.
struct Pending {
    from: String,
    intended: String,
    record: Option<ChoiceRecord>,
    puzzle: Option<PuzzleOutcome>,
    completed_path: Option<String>,
    content: ContentOutcome,
}

/// Drives one player's play-through.
pub struct NarrativeOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    catalog: Arc<SceneCatalog>,
    progress: ProgressStore,
    generator: Arc<dyn ContentGenerator>,
    clock: Arc<dyn Clock>,
    config: OrchestratorConfig,
    session: Mutex<SessionState>,
}

impl std::fmt::Debug for NarrativeOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrativeOrchestrator")
            .field("progress", &self.inner.progress)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl NarrativeOrchestrator {
    /// Opens a play-through on top of a loaded progress store.
    ///
    /// A player whose stored record is already detected starts in the
    /// detected terminal.
    #[must_use]
    pub fn open(
        catalog: Arc<SceneCatalog>,
        progress: ProgressStore,
        generator: Arc<dyn ContentGenerator>,
        clock: Arc<dyn Clock>,
        config: OrchestratorConfig,
    ) -> Self {
        let start = if progress.is_detected() {
            catalog.detected_scene()
        } else {
            catalog.start_scene()
        };
        let session = SessionState::new(Uuid::new_v4(), start);
        debug!(
            player_id = %progress.player_id(),
            session_id = %session.session_id(),
            scene_id = start,
            "play-through opened"
        );
        Self {
            inner: Arc::new(Inner {
                catalog,
                progress,
                generator,
                clock,
                config,
                session: Mutex::new(session),
            }),
        }
    }

    /// The scene catalog.
    #[must_use]
    pub fn catalog(&self) -> &SceneCatalog {
        &self.inner.catalog
    }

    /// The player's progress.
    #[must_use]
    pub fn progress(&self) -> &ProgressStore {
        &self.inner.progress
    }

    /// Looks up a scene definition.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnknownScene` if the id is not in the catalog.
    /// Callers fall back to [`SceneCatalog::fallback_scene`].
    pub fn load_scene(&self, scene_id: &str) -> Result<&SceneDefinition, DomainError> {
        self.inner.catalog.load_scene(scene_id)
    }

    /// The static successor of `current`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnknownScene` if `current` is not in the catalog.
    pub fn compute_next_scene(&self, current: &str) -> Result<String, DomainError> {
        self.inner.catalog.compute_next_scene(current)
    }

    /// Whether a content request is outstanding.
    pub async fn is_awaiting_content(&self) -> bool {
        self.inner.session.lock().await.is_awaiting_content()
    }

    /// Id of the scene the player is in.
    pub async fn current_scene(&self) -> String {
        self.inner.session.lock().await.current_scene().to_owned()
    }

    /// Every recorded choice, oldest first.
    pub async fn choice_history(&self) -> Vec<ChoiceRecord> {
        self.inner.session.lock().await.choice_history().to_vec()
    }

    /// Read-only projection of the current scene.
    pub async fn scene_view(&self) -> SceneView {
        let session = self.inner.session.lock().await;
        views::project(&self.inner.catalog, &session, &self.inner.progress)
    }

    /// Acts in the current scene.
    ///
    /// Runs on its own task: dropping the returned future abandons the
    /// result, not the submission.
    ///
    /// # Errors
    ///
    /// - `DomainError::SubmissionInFlight` if another submission is waiting on
    ///   content. Nothing changes.
    /// - `DomainError::StaleSession` if the session was restarted while this
    ///   submission waited on content. The result is discarded.
    /// - `DomainError::Validation` for input the scene does not accept.
    /// - `DomainError::Infrastructure` if progress cannot be saved. The
    ///   session stays where it was.
    #[instrument(
        skip(self, command),
        fields(
            player_id = %self.inner.progress.player_id(),
            command_type = command.command_type(),
            correlation_id = %command.correlation_id()
        )
    )]
    pub async fn submit_choice(
        &self,
        command: &SubmitChoice,
    ) -> Result<TransitionResult, DomainError> {
        let inner = Arc::clone(&self.inner);
        let command = command.clone();
        run_detached(async move { inner.submit_choice(&command).await }).await
    }

    /// Restarts the play-through: progress is cleared, the session returns to
    /// the start scene, and any outstanding content request becomes stale.
    ///
    /// Runs on its own task, like [`Self::submit_choice`].
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if progress cannot be saved; the
    /// session is left untouched in that case.
    #[instrument(
        skip(self, command),
        fields(
            player_id = %self.inner.progress.player_id(),
            command_type = command.command_type(),
            correlation_id = %command.correlation_id()
        )
    )]
    pub async fn restart(&self, command: &RestartGame) -> Result<(), DomainError> {
        let inner = Arc::clone(&self.inner);
        run_detached(async move { inner.restart().await }).await
    }
}

/// Runs an orchestrator operation to completion on its own task.
async fn run_detached<T, F>(operation: F) -> Result<T, DomainError>
where
    T: Send + 'static,
    F: Future<Output = Result<T, DomainError>> + Send + 'static,
{
    tokio::spawn(operation.in_current_span())
        .await
        .map_err(|e| DomainError::Infrastructure(format!("narrative task failed: {e}")))?
}

impl Inner {
    async fn submit_choice(&self, command: &SubmitChoice) -> Result<TransitionResult, DomainError> {
        let mut session = self.session.lock().await;
        if session.is_awaiting_content() {
            return Err(DomainError::SubmissionInFlight {
                session_id: session.session_id(),
            });
        }

        let scene = self.catalog.load_scene(session.current_scene())?;
        let mv = match self.resolve(&session, scene, &command.input)? {
            Resolved::Puzzle(puzzle) => {
                return self.commit_puzzle(&mut session, scene, puzzle, command).await;
            }
            Resolved::Move(mv) => mv,
        };

        let content = if scene.dynamic && !self.detection_inevitable(&mv, command) {
            let request = self.content_request(&session, scene, &mv)?;
            let issued = session.begin_content_request();
            drop(session);

            let outcome = self.generate(&request).await;

            session = self.session.lock().await;
            if let Err(stale) = session.finish_content_request(issued) {
                debug!(error = %stale, "discarding content for a restarted session");
                return Err(stale);
            }
            Some(outcome)
        } else {
            None
        };

        self.commit_move(&mut session, scene, mv, content, command)
            .await
    }

    async fn restart(&self) -> Result<(), DomainError> {
        let mut session = self.session.lock().await;
        self.progress.reset().await?;
        session.reset(self.catalog.start_scene());
        info!(generation = session.generation(), "play-through restarted");
        Ok(())
    }

    fn resolve<'a>(
        &self,
        session: &SessionState,
        scene: &'a SceneDefinition,
        input: &str,
    ) -> Result<Resolved<'a>, DomainError> {
        match scene.interaction() {
            Interaction::Terminal => Err(DomainError::Validation(format!(
                "scene {} is terminal; restart to play again",
                scene.id
            ))),
            Interaction::Puzzle(puzzle) => Ok(Resolved::Puzzle(puzzle)),
            Interaction::FreeText { next, .. } => {
                let text = input.trim();
                if text.is_empty() {
                    return Err(DomainError::Validation(
                        "response must not be blank".to_owned(),
                    ));
                }
                Ok(Resolved::Move(Move {
                    record: ChoiceRecord {
                        scene_id: scene.id.clone(),
                        text: text.to_owned(),
                        kind: ChoiceKind::Neutral,
                    },
                    destination: Some(next.to_owned()),
                    detection: None,
                }))
            }
            Interaction::Choices(_) => {
                let offered = offered_choices(
                    &self.catalog,
                    scene,
                    session.overlay.as_ref(),
                    self.progress.can_access_core(),
                );
                let choice = pick(&offered, input).ok_or_else(|| {
                    DomainError::Validation(format!(
                        "{:?} is not one of the choices offered in scene {}",
                        input.trim(),
                        scene.id
                    ))
                })?;
                Ok(Resolved::Move(Move {
                    record: ChoiceRecord {
                        scene_id: scene.id.clone(),
                        text: choice.text.clone(),
                        kind: choice.kind,
                    },
                    destination: choice.destination.clone(),
                    detection: choice.detection,
                }))
            }
        }
    }

    /// Whether the amount already known for this move will hit the limit, in
    /// which case generated content would be thrown away anyway.
    fn detection_inevitable(&self, mv: &Move, command: &SubmitChoice) -> bool {
        let known = command.detection.or(mv.detection).unwrap_or(0);
        self.progress.detection_count().saturating_add(known)
            >= self.progress.rules().detection_limit
    }

    fn content_request(
        &self,
        session: &SessionState,
        scene: &SceneDefinition,
        mv: &Move,
    ) -> Result<ContentRequest, DomainError> {
        let next_scene = match &mv.destination {
            Some(destination) => destination.clone(),
            None => self.catalog.compute_next_scene(&scene.id)?,
        };
        let mut history = session.choice_history().to_vec();
        history.push(mv.record.clone());
        let scores = disposition(&history);

        Ok(ContentRequest {
            scene: scene.id.clone(),
            user_choice: Some(mv.record.text.clone()),
            previous_choices: session
                .choice_history()
                .iter()
                .map(|record| record.text.clone())
                .collect(),
            next_scene,
            trust_level: scores.trust,
            suspicion_level: scores.suspicion,
        })
    }

    /// Calls the generator on its own task, bounded by the content timeout. A
    /// generator that panics is reported as unavailable.
    async fn generate(&self, request: &ContentRequest) -> Result<GeneratedContent, ContentError> {
        let timeout = self.config.content_timeout;
        let generator = Arc::clone(&self.generator);
        let request = request.clone();
        let call = tokio::spawn(
            async move { generator.generate(&request).await }.in_current_span(),
        );
        let abort = call.abort_handle();

        let content = match tokio::time::timeout(timeout, call).await {
            Err(_) => {
                abort.abort();
                return Err(ContentError::Timeout(timeout));
            }
            Ok(Err(join)) => {
                return Err(ContentError::Unavailable(format!(
                    "content generator task failed: {join}"
                )));
            }
            Ok(Ok(result)) => result?,
        };
        if content.dialogue.trim().is_empty() {
            return Err(ContentError::Malformed("dialogue is blank".to_owned()));
        }
        Ok(content)
    }

    async fn commit_move(
        &self,
        session: &mut SessionState,
        scene: &SceneDefinition,
        mv: Move,
        content: Option<Result<GeneratedContent, ContentError>>,
        command: &SubmitChoice,
    ) -> Result<TransitionResult, DomainError> {
        let mut intended = match &mv.destination {
            Some(destination) => destination.clone(),
            None => self.catalog.compute_next_scene(&scene.id)?,
        };

        let content = match content {
            None => ContentOutcome::Static,
            Some(Ok(generated)) => {
                if let Some(target) = generated
                    .next_scene
                    .as_deref()
                    .map(str::trim)
                    .filter(|target| !target.is_empty())
                {
                    match self.catalog.load_scene(target) {
                        Ok(_) => intended = target.to_owned(),
                        Err(error) => {
                            warn!(
                                %error,
                                fallback_scene = self.catalog.fallback_scene(),
                                "content override names an unknown scene"
                            );
                            self.catalog.fallback_scene().clone_into(&mut intended);
                        }
                    }
                }
                ContentOutcome::Generated(ContentOverlay {
                    dialogue: generated.dialogue,
                    choices: generated.choices,
                })
            }
            Some(Err(error)) => {
                warn!(scene_id = %scene.id, %error, "content generation failed, using static fallback");
                ContentOutcome::Failed(error.to_string())
            }
        };

        let amount = command
            .detection
            .or(mv.detection)
            .unwrap_or_else(|| self.entry_detection(&scene.id, &intended));
        let change = self
            .progress
            .apply(&ProgressEffects {
                detection: amount,
                complete_path: None,
            })
            .await?;

        Ok(self.finish(
            session,
            Pending {
                from: scene.id.clone(),
                intended,
                record: Some(mv.record),
                puzzle: None,
                completed_path: None,
                content,
            },
            change,
            command.correlation_id,
        ))
    }

    async fn commit_puzzle(
        &self,
        session: &mut SessionState,
        scene: &SceneDefinition,
        puzzle: &PuzzleDefinition,
        command: &SubmitChoice,
    ) -> Result<TransitionResult, DomainError> {
        let mut attempt = session
            .puzzle_attempt()
            .filter(|attempt| {
                attempt.scene_id == scene.id && attempt.status == AttemptStatus::Pending
            })
            .cloned()
            .unwrap_or_else(|| PuzzleAttempt::new(&scene.id, puzzle.max_attempts));

        let outcome = PuzzleGate::new(&self.catalog).evaluate(&scene.id, &command.input, &mut attempt)?;
        debug!(scene_id = %scene.id, outcome = outcome.as_str(), "puzzle answer evaluated");

        let (intended, completes, failure_detection) = match outcome {
            PuzzleOutcome::Correct { .. } => {
                (puzzle.success.clone(), puzzle.completes_path.clone(), 0)
            }
            PuzzleOutcome::Retry { .. } => (scene.id.clone(), None, 0),
            PuzzleOutcome::FailedExhausted { .. } => {
                (puzzle.failure.clone(), None, puzzle.detection_on_failure)
            }
        };

        let amount = command
            .detection
            .unwrap_or_else(|| self.entry_detection(&scene.id, &intended))
            .saturating_add(failure_detection);
        let change = self
            .progress
            .apply(&ProgressEffects {
                detection: amount,
                complete_path: completes.clone(),
            })
            .await?;

        session.puzzle_attempt = Some(attempt);

        Ok(self.finish(
            session,
            Pending {
                from: scene.id.clone(),
                intended,
                record: None,
                puzzle: Some(outcome),
                completed_path: completes.filter(|_| change.path_newly_completed),
                content: ContentOutcome::Static,
            },
            change,
            command.correlation_id,
        ))
    }

    /// Detection for entering `to` from `from` when nothing else specifies it.
    fn entry_detection(&self, from: &str, to: &str) -> u32 {
        let enters_risk = from != to && self.catalog.get(to).is_some_and(|scene| scene.risk);
        u32::from(enters_risk)
    }

    /// Applies gating and the detected override, updates the session, and
    /// assembles the events. Progress has already been saved.
    #[allow(clippy::too_many_lines)]
    fn finish(
        &self,
        session: &mut SessionState,
        pending: Pending,
        change: ProgressChange,
        correlation_id: Uuid,
    ) -> TransitionResult {
        let clock = self.clock.as_ref();
        let Pending {
            from,
            intended,
            record,
            puzzle,
            completed_path,
            content,
        } = pending;
        let mut events = Vec::new();

        if let Some(record) = record {
            events.push(session.event(
                NarrativeEventKind::ChoiceRecorded(ChoiceRecorded {
                    scene_id: record.scene_id.clone(),
                    text: record.text.clone(),
                    kind: record.kind,
                }),
                correlation_id,
                clock,
            ));
            session.choice_history.push(record);
        }

        if let Some(outcome) = puzzle {
            let attempts_used = match outcome {
                PuzzleOutcome::Correct { attempts_used }
                | PuzzleOutcome::Retry { attempts_used, .. }
                | PuzzleOutcome::FailedExhausted { attempts_used } => attempts_used,
            };
            events.push(session.event(
                NarrativeEventKind::PuzzleAttempted(PuzzleAttempted {
                    scene_id: from.clone(),
                    outcome: outcome.as_str().to_owned(),
                    attempts_used,
                }),
                correlation_id,
                clock,
            ));
        }

        if change.detection_count > change.previous_detection {
            events.push(session.event(
                NarrativeEventKind::DetectionIncreased(DetectionIncreased {
                    amount: change.detection_count - change.previous_detection,
                    detection_count: change.detection_count,
                }),
                correlation_id,
                clock,
            ));
        }

        if let Some(path) = completed_path {
            info!(path = %path, "investigation path completed");
            events.push(session.event(
                NarrativeEventKind::PathCompleted(PathCompleted { path }),
                correlation_id,
                clock,
            ));
        }

        let destination = if change.detected {
            info!(
                scene_id = %from,
                intended_scene = %intended,
                detection_count = change.detection_count,
                "player detected"
            );
            events.push(session.event(
                NarrativeEventKind::PlayerDetected(PlayerDetected {
                    scene_id: from.clone(),
                    intended_scene: intended.clone(),
                    detection_count: change.detection_count,
                }),
                correlation_id,
                clock,
            ));
            self.catalog.detected_scene().to_owned()
        } else if self.catalog.get(&intended).is_some_and(|scene| scene.gated)
            && !self.progress.can_access_core()
        {
            info!(scene_id = %intended, hub_scene = self.catalog.hub_scene(), "gated scene locked, redirecting");
            self.catalog.hub_scene().to_owned()
        } else {
            intended.clone()
        };
        let redirected = destination != intended;

        if destination == from {
            if puzzle.is_none() {
                session.overlay = None;
            }
        } else {
            session.enter_scene(&destination);
            events.push(session.event(
                NarrativeEventKind::SceneEntered(SceneEntered {
                    from_scene: from.clone(),
                    to_scene: destination.clone(),
                }),
                correlation_id,
                clock,
            ));
        }

        let content_source = match content {
            ContentOutcome::Static => {
                session.last_error = None;
                ContentSource::Static
            }
            ContentOutcome::Generated(overlay) => {
                session.last_error = None;
                if redirected {
                    ContentSource::Static
                } else {
                    session.overlay = Some(overlay);
                    ContentSource::Generated
                }
            }
            ContentOutcome::Failed(reason) => {
                if !redirected {
                    let dialogue = self.catalog.scene_or_fallback(&destination).dialogue.trim_end();
                    session.overlay = Some(ContentOverlay {
                        dialogue: format!("{}\n\n{dialogue}", self.config.connection_lost_line),
                        choices: None,
                    });
                }
                events.push(session.event(
                    NarrativeEventKind::ContentFallbackUsed(ContentFallbackUsed {
                        scene_id: from.clone(),
                        reason: reason.clone(),
                    }),
                    correlation_id,
                    clock,
                ));
                session.last_error = Some(reason);
                ContentSource::Fallback
            }
        };

        for event in &events {
            debug!(
                event_type = event.event_type(),
                sequence_number = event.metadata().sequence_number,
                "narrative event"
            );
        }
        info!(
            from_scene = %from,
            to_scene = %destination,
            detection_count = change.detection_count,
            "transition committed"
        );

        TransitionResult {
            from_scene: from,
            to_scene: destination,
            content_source,
            puzzle,
            detection_count: change.detection_count,
            detected: change.detected,
            events,
        }
    }
}

/// Finds the offered choice matching `input` by text or by 1-based number.
fn pick<'a>(offered: &'a [OfferedChoice], input: &str) -> Option<&'a OfferedChoice> {
    let key = choice_key(input);
    if key.is_empty() {
        return None;
    }
    offered
        .iter()
        .find(|choice| choice_key(&choice.text) == key)
        .or_else(|| {
            input
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|number| number.checked_sub(1))
                .and_then(|index| offered.get(index))
        })
}
