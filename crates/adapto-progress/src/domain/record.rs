//! Progress record and the rules it is evaluated against.

use std::collections::BTreeMap;

/// Number of detections after which the player is caught.
pub const DETECTION_LIMIT: u32 = 5;

/// Fixed rules a progress record is evaluated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressRules {
    /// Ceiling of the detection meter.
    pub detection_limit: u32,
    /// Paths that must all be complete before the core unlocks.
    pub required_paths: Vec<String>,
}

impl ProgressRules {
    /// Rules with the standard detection limit and the given required paths.
    pub fn new<I, S>(required_paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            detection_limit: DETECTION_LIMIT,
            required_paths: required_paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Overrides the detection limit.
    #[must_use]
    pub fn with_detection_limit(mut self, detection_limit: u32) -> Self {
        self.detection_limit = detection_limit;
        self
    }
}

/// A player's durable progress.
///
/// Core access is never stored here; it is derived from the completion flags
/// every time it is asked for.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressRecord {
    path_completion: BTreeMap<String, bool>,
    detection_count: u32,
}

impl ProgressRecord {
    /// The record a brand new player starts with: every required path
    /// incomplete and no detections.
    #[must_use]
    pub fn initial(rules: &ProgressRules) -> Self {
        Self {
            path_completion: rules
                .required_paths
                .iter()
                .map(|path| (path.clone(), false))
                .collect(),
            detection_count: 0,
        }
    }

    pub(crate) fn from_parts(
        rules: &ProgressRules,
        flags: BTreeMap<String, bool>,
        detection_count: u32,
    ) -> Self {
        let mut record = Self::initial(rules);
        record.path_completion.extend(flags);
        record.detection_count = detection_count.min(rules.detection_limit);
        record
    }

    /// Current value of the detection meter.
    #[must_use]
    pub fn detection_count(&self) -> u32 {
        self.detection_count
    }

    /// Every known path and whether it is complete.
    #[must_use]
    pub fn path_completion(&self) -> &BTreeMap<String, bool> {
        &self.path_completion
    }

    /// Whether the named path has been completed.
    #[must_use]
    pub fn is_path_complete(&self, path: &str) -> bool {
        self.path_completion.get(path).copied().unwrap_or(false)
    }

    /// Whether the detection meter has reached its ceiling.
    #[must_use]
    pub fn is_detected(&self, rules: &ProgressRules) -> bool {
        self.detection_count >= rules.detection_limit
    }

    /// Whether every required path is complete.
    #[must_use]
    pub fn core_unlocked(&self, rules: &ProgressRules) -> bool {
        rules
            .required_paths
            .iter()
            .all(|path| self.is_path_complete(path))
    }

    /// Adds to the detection meter, clamped to the limit. Returns the new count.
    pub(crate) fn add_detection(&mut self, amount: u32, rules: &ProgressRules) -> u32 {
        self.detection_count = self
            .detection_count
            .saturating_add(amount)
            .min(rules.detection_limit);
        self.detection_count
    }

    /// Marks a path complete. Returns `true` if it was not complete before.
    pub(crate) fn complete_path(&mut self, path: &str) -> bool {
        let previous = self.path_completion.insert(path.to_owned(), true);
        previous != Some(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> ProgressRules {
        ProgressRules::new(["echo_node", "glitch_path"])
    }

    #[test]
    fn test_initial_record_has_every_required_path_incomplete() {
        let record = ProgressRecord::initial(&rules());

        assert_eq!(record.detection_count(), 0);
        assert_eq!(record.path_completion().len(), 2);
        assert!(!record.is_path_complete("echo_node"));
        assert!(!record.is_path_complete("glitch_path"));
    }

    #[test]
    fn test_add_detection_never_exceeds_limit() {
        // Arrange
        let rules = rules();

        for amount in [0, 1, 2, 4, 5, 6, 100, u32::MAX] {
            let mut record = ProgressRecord::initial(&rules);
            record.add_detection(3, &rules);

            // Act
            let count = record.add_detection(amount, &rules);

            // Assert
            assert!(count <= DETECTION_LIMIT, "amount {amount} produced {count}");
            assert_eq!(count, (3 + u64::from(amount)).min(5) as u32);
        }
    }

    #[test]
    fn test_is_detected_exactly_at_limit() {
        let rules = rules();
        let mut record = ProgressRecord::initial(&rules);

        record.add_detection(4, &rules);
        assert!(!record.is_detected(&rules));

        record.add_detection(1, &rules);
        assert!(record.is_detected(&rules));
    }

    #[test]
    fn test_core_unlocks_only_when_every_required_path_is_complete() {
        // Arrange
        let rules = rules();
        let mut record = ProgressRecord::initial(&rules);

        // Act
        record.complete_path("echo_node");

        // Assert
        assert!(!record.core_unlocked(&rules));

        // Act
        record.complete_path("glitch_path");

        // Assert
        assert!(record.core_unlocked(&rules));
    }

    #[test]
    fn test_optional_path_does_not_affect_core_access() {
        let rules = rules();
        let mut record = ProgressRecord::initial(&rules);

        let newly = record.complete_path("signal_vault");

        assert!(newly);
        assert!(record.is_path_complete("signal_vault"));
        assert!(!record.core_unlocked(&rules));
    }

    #[test]
    fn test_complete_path_reports_whether_it_was_new() {
        let rules = rules();
        let mut record = ProgressRecord::initial(&rules);

        assert!(record.complete_path("echo_node"));
        assert!(!record.complete_path("echo_node"));
    }
}
