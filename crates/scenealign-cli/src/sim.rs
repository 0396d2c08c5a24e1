//! Deterministic simulated scene for self-test runs.
//!
//! Implements all three collaborator seams against a synthetic ground-truth
//! target: the renderer encodes the transform into the capture bytes, the
//! oracle scores similarity from normalized distance to the target and
//! proposes a proportional correction, and the mutator tracks the live
//! transform. No randomness anywhere, so repeated runs are identical.

use async_trait::async_trait;

use scenealign_core::fakes::RecordingMutator;
use scenealign_core::{
    ActorId, ActorMutator, Adjustment, CaptureError, CaptureImage, CaptureSpec, EvaluationError,
    EvaluationResult, MutationError, PositioningOracle, Rotation, SceneRenderer, SceneState,
    TargetSpec, Transform, Vec3,
};

/// Simulated scene: one actor, one known target transform.
pub struct SimulatedScene {
    target: Transform,
    initial_distance: f64,
    /// Fraction of the remaining offset corrected per evaluation.
    gain: f64,
    mutator: RecordingMutator,
}

impl SimulatedScene {
    pub fn new(actor: ActorId, initial: Transform, target: Transform, gain: f64) -> Self {
        SimulatedScene {
            target,
            initial_distance: initial.position.distance(&target.position),
            gain,
            mutator: RecordingMutator::new(actor, initial),
        }
    }

    /// Snapshot of the live transform.
    pub fn transform(&self) -> Transform {
        self.mutator.transform()
    }

    /// Remaining distance from the live transform to the target.
    pub fn distance_to_target(&self) -> f64 {
        self.transform().position.distance(&self.target.position)
    }

    fn similarity(&self, transform: &Transform) -> f64 {
        if self.initial_distance <= 0.0 {
            return 1.0;
        }
        let distance = transform.position.distance(&self.target.position);
        (1.0 - distance / self.initial_distance).clamp(0.0, 1.0)
    }

    fn correction(&self, transform: &Transform) -> Adjustment {
        let delta = Vec3::new(
            (self.target.position.x - transform.position.x) * self.gain,
            (self.target.position.y - transform.position.y) * self.gain,
            (self.target.position.z - transform.position.z) * self.gain,
        );
        let yaw = (self.target.rotation.yaw - transform.rotation.yaw) * self.gain;
        Adjustment {
            position_delta: delta,
            rotation_delta: Some(Rotation::yaw(yaw)),
            confidence: Some(1.0),
        }
    }
}

#[async_trait]
impl SceneRenderer for SimulatedScene {
    async fn capture(
        &self,
        actor_transform: &Transform,
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
                    actor_transform.position.x,
                    actor_transform.position.y,
                    actor_transform.position.z,
                    actor_transform.rotation.yaw,
                )
                .into_bytes(),
            })
            .collect();
        SceneState::new(*actor_transform, images)
    }
}

#[async_trait]
impl PositioningOracle for SimulatedScene {
    async fn evaluate(
        &self,
        _target: &TargetSpec,
        state: &SceneState,
    ) -> Result<EvaluationResult, EvaluationError> {
        let transform = state.transform();
        let similarity = self.similarity(transform);
        let distance = transform.position.distance(&self.target.position);
        Ok(EvaluationResult::new(similarity, self.correction(transform))?
            .with_rationale(format!("{distance:.1} units from target")))
    }
}

#[async_trait]
impl ActorMutator for SimulatedScene {
    async fn current(&self, actor: &ActorId) -> Result<Transform, MutationError> {
        self.mutator.current(actor).await
    }

    async fn apply(
        &self,
        actor: &ActorId,
        adjustment: &Adjustment,
    ) -> Result<Transform, MutationError> {
        self.mutator.apply(actor, adjustment).await
    }
}
