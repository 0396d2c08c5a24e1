//! Scripted in-memory collaborators (testing only)
//!
//! Provides `ScriptedRenderer`, `ScriptedOracle`, and `RecordingMutator` that
//! satisfy the collaborator contracts deterministically, without a live scene
//! or a model backend.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::capture::{CaptureImage, CaptureSpec, SceneState};
use crate::error::{CaptureError, EvaluationError, MutationError};
use crate::evaluate::{Adjustment, EvaluationResult};
use crate::ports::{ActorMutator, PositioningOracle, SceneRenderer};
use crate::target::{ActorId, TargetSpec};
use crate::transform::Transform;

// ---------------------------------------------------------------------------
// ScriptedRenderer
// ---------------------------------------------------------------------------

/// Renderer fake with scripted per-call outcomes.
///
/// Outcomes are consumed in order; once the script is exhausted every further
/// call succeeds. A successful call synthesizes one image per requested angle
/// whose bytes encode the transform, so distinct states produce distinct
/// snapshot digests.
#[derive(Debug, Default)]
pub struct ScriptedRenderer {
    script: Mutex<VecDeque<Result<(), String>>>,
    calls: AtomicUsize,
}

impl ScriptedRenderer {
    /// Every capture succeeds.
    pub fn always_ok() -> Self {
        Self::default()
    }

    /// Scripted outcomes, `Err(message)` producing a renderer failure.
    pub fn with_outcomes(outcomes: impl IntoIterator<Item = Result<(), String>>) -> Self {
        ScriptedRenderer {
            script: Mutex::new(outcomes.into_iter().collect()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Total capture calls observed, including failed ones.
    pub fn capture_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn synthesize(
        transform: &Transform,
        spec: &CaptureSpec,
    ) -> Result<SceneState, CaptureError> {
        let images = spec
            .angles
            .iter()
            .map(|angle| CaptureImage {
                angle: *angle,
                resolution: spec.resolution,
                data: format!(
                    "{}@{:.3},{:.3},{:.3}/yaw{:.3}",
                    angle.label(),
                    transform.position.x,
                    transform.position.y,
                    transform.position.z,
                    transform.rotation.yaw,
                )
                .into_bytes(),
            })
            .collect();
        SceneState::new(*transform, images)
    }
}

#[async_trait]
impl SceneRenderer for ScriptedRenderer {
    async fn capture(
        &self,
        actor_transform: &Transform,
        spec: &CaptureSpec,
    ) -> Result<SceneState, CaptureError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Err(message)) => Err(CaptureError::Renderer(message)),
            _ => Self::synthesize(actor_transform, spec),
        }
    }
}

// ---------------------------------------------------------------------------
// ScriptedOracle
// ---------------------------------------------------------------------------

/// One scripted oracle step.
#[derive(Debug, Clone)]
pub enum OracleStep {
    /// Well-formed verdict.
    Verdict {
        similarity: f64,
        adjustment: Adjustment,
    },

    /// Transport-level failure.
    Transport(String),

    /// Malformed-output failure.
    Malformed(String),
}

impl OracleStep {
    /// Verdict with a zero adjustment.
    pub fn score(similarity: f64) -> Self {
        OracleStep::Verdict {
            similarity,
            adjustment: Adjustment::zero(),
        }
    }
}

/// Oracle fake replaying a fixed script.
///
/// Steps are consumed in order; the final step repeats once the script is
/// exhausted, so a constant-score or persistently-failing oracle is a
/// one-step script.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    script: Vec<OracleStep>,
    cursor: AtomicUsize,
}

impl ScriptedOracle {
    /// Zero-delta verdicts with the given scores.
    pub fn from_scores(scores: &[f64]) -> Self {
        Self::with_steps(scores.iter().copied().map(OracleStep::score).collect())
    }

    pub fn with_steps(script: Vec<OracleStep>) -> Self {
        ScriptedOracle {
            script,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Total evaluation calls observed.
    pub fn evaluate_calls(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PositioningOracle for ScriptedOracle {
    async fn evaluate(
        &self,
        _target: &TargetSpec,
        _state: &SceneState,
    ) -> Result<EvaluationResult, EvaluationError> {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        let step = self
            .script
            .get(index)
            .or_else(|| self.script.last())
            .cloned();
        match step {
            Some(OracleStep::Verdict {
                similarity,
                adjustment,
            }) => EvaluationResult::new(similarity, adjustment),
            Some(OracleStep::Transport(message)) => Err(EvaluationError::Transport(message)),
            Some(OracleStep::Malformed(reason)) => Err(EvaluationError::Malformed { reason }),
            None => Err(EvaluationError::Malformed {
                reason: "oracle script is empty".to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingMutator
// ---------------------------------------------------------------------------

/// Mutator fake tracking a single actor's live transform and every
/// adjustment applied to it.
#[derive(Debug)]
pub struct RecordingMutator {
    actor: ActorId,
    current: Mutex<Transform>,
    applied: Mutex<Vec<Adjustment>>,
    reject_with: Option<String>,
}

impl RecordingMutator {
    pub fn new(actor: ActorId, initial: Transform) -> Self {
        RecordingMutator {
            actor,
            current: Mutex::new(initial),
            applied: Mutex::new(Vec::new()),
            reject_with: None,
        }
    }

    /// A mutator whose every `apply` fails.
    pub fn rejecting(actor: ActorId, initial: Transform, message: impl Into<String>) -> Self {
        RecordingMutator {
            actor,
            current: Mutex::new(initial),
            applied: Mutex::new(Vec::new()),
            reject_with: Some(message.into()),
        }
    }

    /// Snapshot of the live transform.
    pub fn transform(&self) -> Transform {
        *self.current.lock().unwrap()
    }

    /// Every adjustment applied so far, in order.
    pub fn applied(&self) -> Vec<Adjustment> {
        self.applied.lock().unwrap().clone()
    }

    fn check_actor(&self, actor: &ActorId) -> Result<(), MutationError> {
        if actor != &self.actor {
            return Err(MutationError::UnknownActor(actor.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ActorMutator for RecordingMutator {
    async fn current(&self, actor: &ActorId) -> Result<Transform, MutationError> {
        self.check_actor(actor)?;
        Ok(*self.current.lock().unwrap())
    }

    async fn apply(
        &self,
        actor: &ActorId,
        adjustment: &Adjustment,
    ) -> Result<Transform, MutationError> {
        self.check_actor(actor)?;
        if let Some(message) = &self.reject_with {
            return Err(MutationError::Rejected(message.clone()));
        }
        let mut current = self.current.lock().unwrap();
        let next = current.apply(
            &adjustment.position_delta,
            adjustment.rotation_delta.as_ref(),
        )?;
        *current = next;
        self.applied.lock().unwrap().push(adjustment.clone());
        Ok(next)
    }
}
