//! Persisted layout of a progress record and its load-time validation.
//!
//! The stored document has the shape
//! `{pathCompletionFlags: {name: bool}, detectionCount: int, coreUnlocked: bool}`.
//! `coreUnlocked` is written for readers of the raw document but never read
//! back: it is always recomputed from the flags.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::record::{ProgressRecord, ProgressRules};

/// Serialized form of a progress record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedProgress {
    /// Completion flag per path.
    pub path_completion_flags: BTreeMap<String, bool>,
    /// Detection meter.
    pub detection_count: i64,
    /// Derived core access, informational only.
    pub core_unlocked: bool,
}

impl PersistedProgress {
    /// Builds the persisted layout of a record.
    #[must_use]
    pub fn from_record(record: &ProgressRecord, rules: &ProgressRules) -> Self {
        Self {
            path_completion_flags: record.path_completion().clone(),
            detection_count: i64::from(record.detection_count()),
            core_unlocked: record.core_unlocked(rules),
        }
    }

    /// Encodes the layout as a JSON document.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json::Error` if the layout cannot be serialized.
    pub fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Stored progress that cannot be trusted as-is.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CorruptedProgress {
    /// The document is not a progress record at all.
    #[error("stored progress could not be decoded: {0}")]
    Undecodable(String),

    /// The detection meter is outside its valid range.
    #[error("stored detection count {count} is outside [0, {limit}]")]
    DetectionOutOfRange {
        /// The stored value.
        count: i64,
        /// The configured ceiling.
        limit: u32,
    },

    /// The detection meter is not an integer.
    #[error("stored detection count {0} is not an integer")]
    DetectionNotInteger(String),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredLayout {
    #[serde(default)]
    path_completion_flags: BTreeMap<String, bool>,
    #[serde(default)]
    detection_count: Option<serde_json::Value>,
}

/// Decodes a stored document into a record.
///
/// Never fails: an undecodable document yields the initial record, and an
/// out-of-range or non-integer detection count is coerced to 0 while the
/// flags are kept.
/// Whatever had to be coerced is reported alongside the record.
#[must_use]
pub fn decode(
    payload: &serde_json::Value,
    rules: &ProgressRules,
) -> (ProgressRecord, Option<CorruptedProgress>) {
    let stored = match StoredLayout::deserialize(payload) {
        Ok(stored) => stored,
        Err(e) => {
            return (
                ProgressRecord::initial(rules),
                Some(CorruptedProgress::Undecodable(e.to_string())),
            );
        }
    };

    let count = match stored.detection_count {
        None | Some(serde_json::Value::Null) => 0,
        // Integers beyond i64 are out of range either way.
        Some(value) => match value.as_i64().or_else(|| value.as_u64().map(|_| i64::MAX)) {
            Some(count) => count,
            None => {
                return (
                    ProgressRecord::from_parts(rules, stored.path_completion_flags, 0),
                    Some(CorruptedProgress::DetectionNotInteger(value.to_string())),
                );
            }
        },
    };

    match u32::try_from(count) {
        Ok(count) if count <= rules.detection_limit => (
            ProgressRecord::from_parts(rules, stored.path_completion_flags, count),
            None,
        ),
        _ => (
            ProgressRecord::from_parts(rules, stored.path_completion_flags, 0),
            Some(CorruptedProgress::DetectionOutOfRange {
                count,
                limit: rules.detection_limit,
            }),
        ),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn rules() -> ProgressRules {
        ProgressRules::new(["echo_node", "glitch_path"])
    }

    #[test]
    fn test_decode_reads_valid_document() {
        // Arrange
        let payload = json!({
            "pathCompletionFlags": {"echo_node": true, "glitch_path": false},
            "detectionCount": 3,
            "coreUnlocked": false
        });

        // Act
        let (record, issue) = decode(&payload, &rules());

        // Assert
        assert!(issue.is_none());
        assert_eq!(record.detection_count(), 3);
        assert!(record.is_path_complete("echo_node"));
        assert!(!record.is_path_complete("glitch_path"));
    }

    #[test]
    fn test_decode_coerces_detection_above_limit_to_zero() {
        let payload = json!({
            "pathCompletionFlags": {"echo_node": true},
            "detectionCount": 9
        });

        let (record, issue) = decode(&payload, &rules());

        assert_eq!(record.detection_count(), 0);
        assert!(record.is_path_complete("echo_node"));
        assert_eq!(
            issue,
            Some(CorruptedProgress::DetectionOutOfRange { count: 9, limit: 5 })
        );
    }

    #[test]
    fn test_decode_coerces_negative_detection_to_zero() {
        let payload = json!({"detectionCount": -2});

        let (record, issue) = decode(&payload, &rules());

        assert_eq!(record.detection_count(), 0);
        match issue {
            Some(CorruptedProgress::DetectionOutOfRange { count, .. }) => assert_eq!(count, -2),
            other => panic!("expected DetectionOutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_coerces_fractional_detection_but_keeps_flags() {
        // Arrange
        let payload = json!({
            "pathCompletionFlags": {"echo_node": true, "glitch_path": true},
            "detectionCount": 3.5
        });

        // Act
        let (record, issue) = decode(&payload, &rules());

        // Assert
        assert_eq!(record.detection_count(), 0);
        assert!(record.core_unlocked(&rules()));
        assert_eq!(
            issue,
            Some(CorruptedProgress::DetectionNotInteger("3.5".to_owned()))
        );
    }

    #[test]
    fn test_decode_coerces_string_detection_but_keeps_flags() {
        let payload = json!({
            "pathCompletionFlags": {"echo_node": true},
            "detectionCount": "2"
        });

        let (record, issue) = decode(&payload, &rules());

        assert_eq!(record.detection_count(), 0);
        assert!(record.is_path_complete("echo_node"));
        assert_eq!(
            issue,
            Some(CorruptedProgress::DetectionNotInteger("\"2\"".to_owned()))
        );
    }

    #[test]
    fn test_decode_ignores_stored_core_unlocked() {
        let payload = json!({
            "pathCompletionFlags": {"echo_node": true, "glitch_path": false},
            "detectionCount": 0,
            "coreUnlocked": true
        });

        let (record, issue) = decode(&payload, &rules());

        assert!(issue.is_none());
        assert!(!record.core_unlocked(&rules()));
    }

    #[test]
    fn test_decode_falls_back_to_initial_record_for_garbage() {
        let payload = json!("not a record");

        let (record, issue) = decode(&payload, &rules());

        assert_eq!(record, ProgressRecord::initial(&rules()));
        match issue {
            Some(CorruptedProgress::Undecodable(_)) => {}
            other => panic!("expected Undecodable, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_fills_missing_required_paths() {
        let payload = json!({"detectionCount": 1});

        let (record, issue) = decode(&payload, &rules());

        assert!(issue.is_none());
        assert_eq!(record.path_completion().len(), 2);
    }

    #[test]
    fn test_to_payload_writes_camel_case_layout_with_derived_core_flag() {
        // Arrange
        let rules = rules();
        let (record, _) = decode(
            &json!({"pathCompletionFlags": {"echo_node": true, "glitch_path": true}, "detectionCount": 2}),
            &rules,
        );

        // Act
        let payload = PersistedProgress::from_record(&record, &rules)
            .to_payload()
            .unwrap();

        // Assert
        assert_eq!(
            payload,
            json!({
                "pathCompletionFlags": {"echo_node": true, "glitch_path": true},
                "detectionCount": 2,
                "coreUnlocked": true
            })
        );
    }
}
