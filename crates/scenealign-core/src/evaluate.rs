//! The oracle's verdict on one scene state against the target.
//!
//! An `EvaluationResult` exists only fully formed: the constructor rejects a
//! non-finite similarity, and anything the oracle transport could not shape
//! into score-plus-adjustment never reaches this type (it surfaces as
//! `EvaluationError::Malformed` instead).

use serde::{Deserialize, Serialize};

use crate::error::EvaluationError;
use crate::transform::{Rotation, Vec3};

/// A relative correction proposed by the oracle and applied by the mutator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    /// Position delta in scene units.
    pub position_delta: Vec3,

    /// Rotation delta in degrees, when the oracle proposed one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation_delta: Option<Rotation>,

    /// The oracle's confidence in this correction, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl Adjustment {
    /// The no-op adjustment.
    pub fn zero() -> Self {
        Adjustment {
            position_delta: Vec3::ZERO,
            rotation_delta: None,
            confidence: None,
        }
    }

    /// Position-only adjustment.
    pub fn translate(x: f64, y: f64, z: f64) -> Self {
        Adjustment {
            position_delta: Vec3::new(x, y, z),
            rotation_delta: None,
            confidence: None,
        }
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation_delta = Some(rotation);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// A well-formed oracle verdict: similarity score plus proposed adjustment.
///
/// Fields are private so a result can only be built through [`new`], which
/// enforces the finite-score invariant.
///
/// [`new`]: EvaluationResult::new
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    similarity: f64,
    adjustment: Adjustment,
    #[serde(skip_serializing_if = "Option::is_none")]
    rationale: Option<String>,
}

impl EvaluationResult {
    /// Build a verdict. Out-of-range similarity is tolerated (a misbehaving
    /// oracle may score 1.2 or -0.1); non-finite similarity is malformed.
    pub fn new(similarity: f64, adjustment: Adjustment) -> Result<Self, EvaluationError> {
        if !similarity.is_finite() {
            return Err(EvaluationError::Malformed {
                reason: format!("non-finite similarity: {similarity}"),
            });
        }
        Ok(EvaluationResult {
            similarity,
            adjustment,
            rationale: None,
        })
    }

    /// Attach the oracle's free-text assessment. Logged, never parsed for
    /// control decisions.
    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }

    /// The score exactly as the oracle reported it.
    pub fn similarity(&self) -> f64 {
        self.similarity
    }

    /// The score clamped into [0, 1], used by the stopping policy.
    pub fn clamped_similarity(&self) -> f64 {
        self.similarity.clamp(0.0, 1.0)
    }

    pub fn adjustment(&self) -> &Adjustment {
        &self.adjustment
    }

    pub fn rationale(&self) -> Option<&str> {
        self.rationale.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_finite_similarity() {
        let err = EvaluationResult::new(f64::NAN, Adjustment::zero())
            .expect_err("NaN similarity should be malformed");
        assert!(matches!(err, EvaluationError::Malformed { .. }));
    }

    #[test]
    fn test_tolerates_out_of_range_similarity() {
        let result =
            EvaluationResult::new(1.4, Adjustment::zero()).expect("out-of-range is tolerated");
        assert_eq!(result.similarity(), 1.4);
        assert_eq!(result.clamped_similarity(), 1.0);

        let result =
            EvaluationResult::new(-0.2, Adjustment::zero()).expect("out-of-range is tolerated");
        assert_eq!(result.clamped_similarity(), 0.0);
    }

    #[test]
    fn test_rationale_roundtrip() {
        let result = EvaluationResult::new(0.72, Adjustment::translate(-50.0, 0.0, 10.0))
            .expect("well-formed")
            .with_rationale("cube sits high and left of the panel framing");
        assert_eq!(
            result.rationale(),
            Some("cube sits high and left of the panel framing")
        );
    }

    #[test]
    fn test_adjustment_builders() {
        let adj = Adjustment::translate(10.0, 0.0, -5.0)
            .with_rotation(Rotation::yaw(15.0))
            .with_confidence(0.8);
        assert_eq!(adj.position_delta.x, 10.0);
        assert_eq!(adj.rotation_delta.expect("rotation set").yaw, 15.0);
        assert_eq!(adj.confidence, Some(0.8));
    }
}
