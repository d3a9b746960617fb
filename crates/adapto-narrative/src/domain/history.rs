//! Choice history and the trust/suspicion scores derived from it.

use serde::{Deserialize, Serialize};

use super::scene::ChoiceKind;

const BASE_TRUST: f64 = 0.5;
const BASE_SUSPICION: f64 = 0.2;

/// One submitted choice, in the order it was made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceRecord {
    /// Scene the choice was made in.
    pub scene_id: String,
    /// Text the player submitted, as offered.
    pub text: String,
    /// Intent tag of the choice.
    pub kind: ChoiceKind,
}

/// How the system currently regards the player. Both values are in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Disposition {
    /// Trust level.
    pub trust: f64,
    /// Suspicion level.
    pub suspicion: f64,
}

fn deltas(kind: ChoiceKind) -> (f64, f64) {
    match kind {
        ChoiceKind::Compliant => (0.10, -0.10),
        ChoiceKind::Neutral => (0.0, 0.0),
        ChoiceKind::Inquisitive => (-0.15, 0.20),
        ChoiceKind::Defiant => (-0.15, 0.30),
    }
}

/// Scores the whole history.
#[must_use]
pub fn disposition(history: &[ChoiceRecord]) -> Disposition {
    let (trust, suspicion) = history.iter().fold(
        (BASE_TRUST, BASE_SUSPICION),
        |(trust, suspicion), record| {
            let (dt, ds) = deltas(record.kind);
            (trust + dt, suspicion + ds)
        },
    );
    Disposition {
        trust: trust.clamp(0.0, 1.0),
        suspicion: suspicion.clamp(0.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: ChoiceKind) -> ChoiceRecord {
        ChoiceRecord {
            scene_id: "trust".to_owned(),
            text: "→ Something".to_owned(),
            kind,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_empty_history_scores_baseline() {
        let scores = disposition(&[]);

        assert!(close(scores.trust, 0.5));
        assert!(close(scores.suspicion, 0.2));
    }

    #[test]
    fn test_mixed_history_accumulates_deltas() {
        // Arrange
        let history = [
            record(ChoiceKind::Compliant),
            record(ChoiceKind::Inquisitive),
            record(ChoiceKind::Neutral),
        ];

        // Act
        let scores = disposition(&history);

        // Assert
        assert!(close(scores.trust, 0.45), "trust was {}", scores.trust);
        assert!(close(scores.suspicion, 0.30), "suspicion was {}", scores.suspicion);
    }

    #[test]
    fn test_scores_are_clamped() {
        let defiant = vec![record(ChoiceKind::Defiant); 10];

        let scores = disposition(&defiant);

        assert!(close(scores.trust, 0.0));
        assert!(close(scores.suspicion, 1.0));
    }
}
