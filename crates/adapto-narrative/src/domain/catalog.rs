//! The scene catalog: one authoritative, validated table of scenes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use adapto_core::error::DomainError;
use adapto_progress::domain::record::ProgressRules;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::scene::{Interaction, SceneDefinition};

const BUILTIN_CATALOG: &str = include_str!("../../content/scenes.yaml");

/// Errors raised while loading a scene catalog. All of them are fatal at
/// startup.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog file could not be read.
    #[error("failed to read scene catalog {path}: {source}")]
    Io {
        /// File that was read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The catalog is not valid YAML for the catalog schema.
    #[error("failed to parse scene catalog: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Two scenes share an id.
    #[error("duplicate scene id: {0}")]
    DuplicateScene(String),

    /// A reference names a scene that does not exist.
    #[error("{origin} references unknown scene {target}")]
    DanglingReference {
        /// Where the reference was found.
        origin: String,
        /// The missing scene id.
        target: String,
    },

    /// A scene breaks a structural rule.
    #[error("scene {scene}: {reason}")]
    InvalidScene {
        /// Offending scene.
        scene: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A required path is not completed by any puzzle.
    #[error("required path {0} is not completed by any puzzle")]
    UnreachablePath(String),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogDocument {
    start_scene: String,
    fallback_scene: String,
    detected_scene: String,
    hub_scene: String,
    #[serde(default)]
    required_paths: Vec<String>,
    scenes: Vec<SceneDefinition>,
}

/// Immutable lookup of scene definitions, loaded once at startup.
#[derive(Debug)]
pub struct SceneCatalog {
    scenes: Vec<SceneDefinition>,
    index: HashMap<String, usize>,
    start_scene: String,
    fallback_scene: String,
    detected_scene: String,
    hub_scene: String,
    required_paths: Vec<String>,
    version_hash: String,
}

impl SceneCatalog {
    /// The catalog shipped with the crate.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the bundled catalog is invalid.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_yaml_str(BUILTIN_CATALOG)
    }

    /// Reads and validates a catalog file.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Io` if the file cannot be read, or any
    /// validation error from [`SceneCatalog::from_yaml_str`].
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let source = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&source)
    }

    /// Parses and validates a catalog.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the YAML does not match the schema or breaks
    /// any structural rule.
    pub fn from_yaml_str(source: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument = serde_yaml::from_str(source)?;

        let mut index = HashMap::with_capacity(document.scenes.len());
        for (position, scene) in document.scenes.iter().enumerate() {
            if index.insert(scene.id.clone(), position).is_some() {
                return Err(CatalogError::DuplicateScene(scene.id.clone()));
            }
        }

        let catalog = Self {
            scenes: document.scenes,
            index,
            start_scene: document.start_scene,
            fallback_scene: document.fallback_scene,
            detected_scene: document.detected_scene,
            hub_scene: document.hub_scene,
            required_paths: document.required_paths,
            version_hash: format!("{:x}", Sha256::digest(source.as_bytes())),
        };
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        for (field, target) in [
            ("start_scene", &self.start_scene),
            ("fallback_scene", &self.fallback_scene),
            ("detected_scene", &self.detected_scene),
            ("hub_scene", &self.hub_scene),
        ] {
            self.require(field, target)?;
        }

        if !self.scene(&self.detected_scene).terminal {
            return Err(invalid(&self.detected_scene, "the detected scene must be terminal"));
        }
        if self.scene(&self.hub_scene).gated {
            return Err(invalid(&self.hub_scene, "the hub scene must not be gated"));
        }
        if self.scene(&self.fallback_scene).terminal {
            return Err(invalid(&self.fallback_scene, "the fallback scene must not be terminal"));
        }

        for scene in &self.scenes {
            self.validate_scene(scene)?;
        }

        for path in &self.required_paths {
            let completed_somewhere = self.scenes.iter().any(|scene| {
                scene
                    .puzzle
                    .as_ref()
                    .is_some_and(|puzzle| puzzle.completes_path.as_deref() == Some(path))
            });
            if !completed_somewhere {
                return Err(CatalogError::UnreachablePath(path.clone()));
            }
        }
        Ok(())
    }

    fn validate_scene(&self, scene: &SceneDefinition) -> Result<(), CatalogError> {
        let modes = usize::from(!scene.choices.is_empty())
            + usize::from(scene.puzzle.is_some())
            + usize::from(scene.prompt.is_some());

        if scene.terminal {
            if modes != 0 {
                return Err(invalid(&scene.id, "a terminal scene accepts no input"));
            }
            return Ok(());
        }
        if modes != 1 {
            return Err(invalid(
                &scene.id,
                "declare exactly one of choices, puzzle, or prompt",
            ));
        }

        if let Some(next) = &scene.next {
            self.require(&format!("scene {}", scene.id), next)?;
        }

        match scene.interaction() {
            Interaction::Terminal | Interaction::FreeText { .. } => {}
            Interaction::Choices(choices) => {
                for choice in choices {
                    if choice.text.trim().is_empty() {
                        return Err(invalid(&scene.id, "choice text must not be blank"));
                    }
                    let Some(target) = scene.choice_destination(choice) else {
                        return Err(invalid(
                            &scene.id,
                            &format!("choice {:?} has no destination", choice.text),
                        ));
                    };
                    self.require(&format!("choice {:?} in scene {}", choice.text, scene.id), target)?;
                }
            }
            Interaction::Puzzle(puzzle) => {
                if scene.dynamic {
                    return Err(invalid(&scene.id, "a puzzle scene cannot be dynamic"));
                }
                if puzzle.max_attempts == 0 {
                    return Err(invalid(&scene.id, "max_attempts must be at least 1"));
                }
                if puzzle.accepted_answers.iter().all(|answer| answer.trim().is_empty()) {
                    return Err(invalid(&scene.id, "a puzzle needs at least one accepted answer"));
                }
                let origin = format!("puzzle in scene {}", scene.id);
                self.require(&origin, &puzzle.success)?;
                self.require(&origin, &puzzle.failure)?;
            }
        }

        if scene.prompt.is_some() && scene.next.is_none() {
            return Err(invalid(&scene.id, "a free-text scene needs a next scene"));
        }
        Ok(())
    }

    fn require(&self, origin: &str, target: &str) -> Result<(), CatalogError> {
        if self.index.contains_key(target) {
            Ok(())
        } else {
            Err(CatalogError::DanglingReference {
                origin: origin.to_owned(),
                target: target.to_owned(),
            })
        }
    }

    /// Scene by id. Only called for ids already checked against the index.
    fn scene(&self, id: &str) -> &SceneDefinition {
        let position = self.index.get(id).copied().unwrap_or_default();
        &self.scenes[position]
    }

    /// Looks up a scene.
    #[must_use]
    pub fn get(&self, scene_id: &str) -> Option<&SceneDefinition> {
        self.index.get(scene_id).map(|&position| &self.scenes[position])
    }

    /// Looks up a scene, failing for unknown ids.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnknownScene` if the id is not in the catalog.
    pub fn load_scene(&self, scene_id: &str) -> Result<&SceneDefinition, DomainError> {
        self.get(scene_id)
            .ok_or_else(|| DomainError::UnknownScene(scene_id.to_owned()))
    }

    /// Looks up a scene, substituting the fallback scene for unknown ids.
    #[must_use]
    pub fn scene_or_fallback(&self, scene_id: &str) -> &SceneDefinition {
        self.get(scene_id)
            .unwrap_or_else(|| self.scene(&self.fallback_scene))
    }

    /// The static successor of a scene.
    ///
    /// Uses the scene's default `next`, then its first choice's destination,
    /// then its puzzle's success scene. A terminal scene is its own successor.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnknownScene` if `current` is not in the catalog.
    pub fn compute_next_scene(&self, current: &str) -> Result<String, DomainError> {
        let scene = self.load_scene(current)?;
        if scene.terminal {
            return Ok(scene.id.clone());
        }
        let next = scene
            .next
            .as_deref()
            .or_else(|| {
                scene
                    .choices
                    .first()
                    .and_then(|choice| scene.choice_destination(choice))
            })
            .or_else(|| scene.puzzle.as_ref().map(|puzzle| puzzle.success.as_str()))
            .unwrap_or(&scene.id);
        Ok(next.to_owned())
    }

    /// All scenes in authored order.
    pub fn scenes(&self) -> impl Iterator<Item = &SceneDefinition> {
        self.scenes.iter()
    }

    /// Number of scenes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    /// Whether the catalog has no scenes. Never true for a validated catalog.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Scene every play-through starts in.
    #[must_use]
    pub fn start_scene(&self) -> &str {
        &self.start_scene
    }

    /// Substitute for unknown scene ids.
    #[must_use]
    pub fn fallback_scene(&self) -> &str {
        &self.fallback_scene
    }

    /// Terminal scene entered when the player is caught.
    #[must_use]
    pub fn detected_scene(&self) -> &str {
        &self.detected_scene
    }

    /// Scene locked gated destinations redirect to.
    #[must_use]
    pub fn hub_scene(&self) -> &str {
        &self.hub_scene
    }

    /// Paths that must be complete to unlock the core.
    #[must_use]
    pub fn required_paths(&self) -> &[String] {
        &self.required_paths
    }

    /// Progress rules implied by this catalog.
    #[must_use]
    pub fn progress_rules(&self) -> ProgressRules {
        ProgressRules::new(self.required_paths.iter().cloned())
    }

    /// SHA-256 of the catalog source, hex encoded.
    #[must_use]
    pub fn version_hash(&self) -> &str {
        &self.version_hash
    }
}

fn invalid(scene: &str, reason: &str) -> CatalogError {
    CatalogError::InvalidScene {
        scene: scene.to_owned(),
        reason: reason.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r"
start_scene: a
fallback_scene: a
detected_scene: caught
hub_scene: a
required_paths: [p]
scenes:
  - id: a
    title: A
    dialogue: first
    choices:
      - text: go
        next: b
  - id: b
    title: B
    dialogue: second
    puzzle:
      prompt: answer
      accepted_answers: [open]
      success: a
      failure: caught
      completes_path: p
  - id: caught
    title: Caught
    dialogue: over
    terminal: true
";

    #[test]
    fn test_builtin_catalog_is_valid() {
        // Act
        let catalog = SceneCatalog::builtin().unwrap();

        // Assert
        assert_eq!(catalog.start_scene(), "intro");
        assert_eq!(catalog.detected_scene(), "detected");
        assert_eq!(catalog.hub_scene(), "investigation_hub");
        assert_eq!(catalog.required_paths(), ["echo_node", "glitch_path"]);
        assert!(catalog.get("core").unwrap().gated);
        assert_eq!(catalog.version_hash().len(), 64);
    }

    #[test]
    fn test_load_scene_reports_unknown_scene() {
        let catalog = SceneCatalog::builtin().unwrap();

        match catalog.load_scene("nowhere") {
            Err(DomainError::UnknownScene(id)) => assert_eq!(id, "nowhere"),
            other => panic!("expected UnknownScene, got {other:?}"),
        }
    }

    #[test]
    fn test_scene_or_fallback_substitutes_fallback_scene() {
        let catalog = SceneCatalog::builtin().unwrap();

        let scene = catalog.scene_or_fallback("nowhere");

        assert_eq!(scene.id, "awaken");
    }

    #[test]
    fn test_compute_next_scene_follows_static_table() {
        let catalog = SceneCatalog::builtin().unwrap();

        assert_eq!(catalog.compute_next_scene("intro").unwrap(), "awaken");
        assert_eq!(catalog.compute_next_scene("core").unwrap(), "ending");
        assert_eq!(catalog.compute_next_scene("echo_node").unwrap(), "echo_node_complete");
        assert_eq!(catalog.compute_next_scene("detected").unwrap(), "detected");
    }

    #[test]
    fn test_version_hash_tracks_source() {
        let first = SceneCatalog::from_yaml_str(MINIMAL).unwrap();
        let second = SceneCatalog::from_yaml_str(&format!("{MINIMAL}\n# comment\n")).unwrap();

        assert_ne!(first.version_hash(), second.version_hash());
    }

    #[test]
    fn test_rejects_duplicate_scene_ids() {
        let source = MINIMAL.replace("id: b", "id: a");

        match SceneCatalog::from_yaml_str(&source) {
            Err(CatalogError::DuplicateScene(id)) => assert_eq!(id, "a"),
            other => panic!("expected DuplicateScene, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_dangling_choice_reference() {
        let source = MINIMAL.replace("next: b", "next: missing");

        match SceneCatalog::from_yaml_str(&source) {
            Err(CatalogError::DanglingReference { target, .. }) => assert_eq!(target, "missing"),
            other => panic!("expected DanglingReference, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_dangling_puzzle_failure() {
        let source = MINIMAL.replace("failure: caught", "failure: gone");

        match SceneCatalog::from_yaml_str(&source) {
            Err(CatalogError::DanglingReference { origin, target }) => {
                assert_eq!(origin, "puzzle in scene b");
                assert_eq!(target, "gone");
            }
            other => panic!("expected DanglingReference, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_non_terminal_detected_scene() {
        let source = MINIMAL.replace("    terminal: true\n", "    next: a\n    prompt: why\n");

        match SceneCatalog::from_yaml_str(&source) {
            Err(CatalogError::InvalidScene { scene, .. }) => assert_eq!(scene, "caught"),
            other => panic!("expected InvalidScene, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_dynamic_puzzle_scene() {
        let source = MINIMAL.replace("    dialogue: second\n", "    dialogue: second\n    dynamic: true\n");

        match SceneCatalog::from_yaml_str(&source) {
            Err(CatalogError::InvalidScene { scene, reason }) => {
                assert_eq!(scene, "b");
                assert_eq!(reason, "a puzzle scene cannot be dynamic");
            }
            other => panic!("expected InvalidScene, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_puzzle_without_answers() {
        let source = MINIMAL.replace("accepted_answers: [open]", "accepted_answers: [\"  \"]");

        match SceneCatalog::from_yaml_str(&source) {
            Err(CatalogError::InvalidScene { scene, .. }) => assert_eq!(scene, "b"),
            other => panic!("expected InvalidScene, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_scene_with_two_interaction_modes() {
        let source = MINIMAL.replace("    dialogue: first\n", "    dialogue: first\n    prompt: say\n");

        match SceneCatalog::from_yaml_str(&source) {
            Err(CatalogError::InvalidScene { scene, .. }) => assert_eq!(scene, "a"),
            other => panic!("expected InvalidScene, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_required_path_no_puzzle_completes() {
        let source = MINIMAL.replace("required_paths: [p]", "required_paths: [p, q]");

        match SceneCatalog::from_yaml_str(&source) {
            Err(CatalogError::UnreachablePath(path)) => assert_eq!(path, "q"),
            other => panic!("expected UnreachablePath, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let source = MINIMAL.replace("    dialogue: first\n", "    dialogue: first\n    colour: red\n");

        match SceneCatalog::from_yaml_str(&source) {
            Err(CatalogError::Parse(_)) => {}
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[test]
    fn test_progress_rules_follow_required_paths() {
        let catalog = SceneCatalog::from_yaml_str(MINIMAL).unwrap();

        let rules = catalog.progress_rules();

        assert_eq!(rules.required_paths, vec!["p".to_owned()]);
        assert_eq!(rules.detection_limit, 5);
    }
}
