//! The iteration log: an append-only record of each iteration, and the
//! terminal outcome of a run.
//!
//! Records are the ground truth for post-hoc analysis. The log enforces the
//! contiguous 1-based index invariant on append; persistence is an external
//! writer's concern and consumes the wire-format view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::capture::SnapshotDigest;
use crate::error::LogError;
use crate::evaluate::EvaluationResult;
use crate::transform::{Rotation, Transform, Vec3};

/// One entry in a run's history. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    /// 1-based iteration index, contiguous within a run.
    pub iteration: u32,

    /// Digest of the scene snapshot this iteration evaluated.
    pub snapshot: SnapshotDigest,

    /// The oracle's verdict.
    pub evaluation: EvaluationResult,

    /// Absolute transform after applying the adjustment.
    pub transform: Transform,

    /// Wall-clock duration of the iteration in milliseconds.
    pub duration_ms: u64,

    /// When the record was written.
    pub timestamp: DateTime<Utc>,
}

impl IterationRecord {
    /// Convert to the operator-facing wire format.
    pub fn to_wire(&self) -> WireRecord {
        WireRecord {
            iteration: self.iteration,
            similarity: self.evaluation.similarity(),
            position: self.transform.position,
            rotation: Some(self.transform.rotation),
            timestamp: self.timestamp,
        }
    }
}

/// The serialized iteration entry examined by human operators and downstream
/// log consumers. Field names and declaration order are the wire contract;
/// do not reorder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireRecord {
    pub iteration: u32,
    pub similarity: f64,
    pub position: Vec3,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Rotation>,
    pub timestamp: DateTime<Utc>,
}

/// Ordered, append-only iteration history for one run.
#[derive(Debug, Default)]
pub struct IterationLog {
    records: Vec<IterationRecord>,
}

impl IterationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record, enforcing that its index continues the 1-based
    /// contiguous sequence.
    pub fn append(&mut self, record: IterationRecord) -> Result<(), LogError> {
        let expected = self.records.len() as u32 + 1;
        if record.iteration != expected {
            return Err(LogError::NonContiguousIndex {
                expected,
                actual: record.iteration,
            });
        }
        self.records.push(record);
        Ok(())
    }

    /// Build and append the next record, assigning its index. Used by the
    /// controller so the invariant holds by construction. Returns the
    /// assigned index.
    pub fn push(
        &mut self,
        snapshot: SnapshotDigest,
        evaluation: EvaluationResult,
        transform: Transform,
        duration_ms: u64,
    ) -> u32 {
        let iteration = self.records.len() as u32 + 1;
        self.records.push(IterationRecord {
            iteration,
            snapshot,
            evaluation,
            transform,
            duration_ms,
            timestamp: Utc::now(),
        });
        iteration
    }

    pub fn records(&self) -> &[IterationRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&IterationRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<IterationRecord> {
        self.records
    }

    /// Wire-format view of the full history.
    pub fn to_wire(&self) -> Vec<WireRecord> {
        self.records.iter().map(IterationRecord::to_wire).collect()
    }
}

/// Why a run aborted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum AbortReason {
    /// The renderer failed twice consecutively.
    Capture(String),

    /// The oracle failed twice consecutively (transport or malformed output;
    /// the message says which).
    Evaluation(String),

    /// The mutator rejected an adjustment. Never retried.
    Mutation(String),

    /// The caller cancelled between iterations.
    Cancelled,
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbortReason::Capture(msg) => write!(f, "capture: {msg}"),
            AbortReason::Evaluation(msg) => write!(f, "evaluation: {msg}"),
            AbortReason::Mutation(msg) => write!(f, "mutation: {msg}"),
            AbortReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Terminal classification of a run. Produced exactly once, at loop
/// termination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Similarity reached the configured threshold.
    Converged,

    /// The safety cap triggered before convergence. Not an error; callers
    /// should inspect the similarity trend before retrying with a larger cap.
    Exhausted,

    /// Insufficient relative improvement across the trailing window.
    Plateaued,

    /// An external collaborator failed persistently, or the caller cancelled.
    Aborted(AbortReason),
}

impl RunOutcome {
    pub fn is_aborted(&self) -> bool {
        matches!(self, RunOutcome::Aborted(_))
    }
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunOutcome::Converged => write!(f, "converged"),
            RunOutcome::Exhausted => write!(f, "max-iterations-exhausted"),
            RunOutcome::Plateaued => write!(f, "plateaued"),
            RunOutcome::Aborted(reason) => write!(f, "aborted ({reason})"),
        }
    }
}

/// Result of a complete positioning run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Run ID.
    pub run_id: String,

    /// Terminal outcome.
    pub outcome: RunOutcome,

    /// Full ordered iteration history (possibly empty on early abort).
    pub records: Vec<IterationRecord>,

    /// Total duration in milliseconds.
    pub duration_ms: u64,
}

impl RunReport {
    /// Number of completed iterations.
    pub fn iterations(&self) -> usize {
        self.records.len()
    }

    /// The last recorded similarity, as reported by the oracle.
    pub fn final_similarity(&self) -> Option<f64> {
        self.records.last().map(|r| r.evaluation.similarity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureImage, Resolution, SceneState, ViewAngle};
    use crate::evaluate::Adjustment;

    fn record(iteration: u32, similarity: f64) -> IterationRecord {
        let state = SceneState::new(
            Transform::at(0.0, 0.0, 100.0),
            vec![CaptureImage {
                angle: ViewAngle::Front,
                resolution: Resolution::default(),
                data: vec![iteration as u8],
            }],
        )
        .expect("state");
        IterationRecord {
            iteration,
            snapshot: state.snapshot_digest().clone(),
            evaluation: EvaluationResult::new(similarity, Adjustment::zero()).expect("result"),
            transform: Transform::at(0.0, 0.0, 100.0),
            duration_ms: 10,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_append_enforces_contiguity() {
        let mut log = IterationLog::new();
        log.append(record(1, 0.3)).expect("first append");
        log.append(record(2, 0.5)).expect("second append");

        let err = log.append(record(4, 0.6)).expect_err("gap should fail");
        assert_eq!(
            err,
            LogError::NonContiguousIndex {
                expected: 3,
                actual: 4
            }
        );
    }

    #[test]
    fn test_append_rejects_restart_at_one() {
        let mut log = IterationLog::new();
        log.append(record(1, 0.3)).expect("first append");
        assert!(log.append(record(1, 0.4)).is_err());
    }

    #[test]
    fn test_push_assigns_contiguous_indices() {
        let mut log = IterationLog::new();
        for i in 0..4 {
            let r = record(1, 0.2 + i as f64 * 0.1);
            log.push(r.snapshot, r.evaluation, r.transform, r.duration_ms);
        }
        let indices: Vec<u32> = log.records().iter().map(|r| r.iteration).collect();
        assert_eq!(indices, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_wire_record_field_order() {
        let wire = record(1, 0.42).to_wire();
        let json = serde_json::to_string(&wire).expect("serialize");

        let iteration = json.find("\"iteration\"").expect("iteration field");
        let similarity = json.find("\"similarity\"").expect("similarity field");
        let position = json.find("\"position\"").expect("position field");
        let rotation = json.find("\"rotation\"").expect("rotation field");
        let timestamp = json.find("\"timestamp\"").expect("timestamp field");
        assert!(iteration < similarity);
        assert!(similarity < position);
        assert!(position < rotation);
        assert!(rotation < timestamp);
    }

    #[test]
    fn test_wire_record_without_rotation_omits_field() {
        let mut wire = record(1, 0.42).to_wire();
        wire.rotation = None;
        let json = serde_json::to_string(&wire).expect("serialize");
        assert!(!json.contains("rotation"));
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(RunOutcome::Converged.to_string(), "converged");
        assert_eq!(RunOutcome::Exhausted.to_string(), "max-iterations-exhausted");
        assert_eq!(
            RunOutcome::Aborted(AbortReason::Cancelled).to_string(),
            "aborted (cancelled)"
        );
    }

    #[test]
    fn test_outcome_serde_tagging() {
        let json = serde_json::to_string(&RunOutcome::Aborted(AbortReason::Capture(
            "renderer down".to_string(),
        )))
        .expect("serialize");
        assert!(json.contains("\"outcome\":\"aborted\""));
        assert!(json.contains("\"kind\":\"capture\""));
    }

    #[test]
    fn test_report_final_similarity() {
        let report = RunReport {
            run_id: "run".to_string(),
            outcome: RunOutcome::Exhausted,
            records: vec![record(1, 0.1), record(2, 0.2)],
            duration_ms: 100,
        };
        assert_eq!(report.iterations(), 2);
        assert_eq!(report.final_similarity(), Some(0.2));
    }
}
