//! Collaborator interfaces consumed by the convergence controller.
//!
//! These traits define the three seams to the live scene:
//! - `SceneRenderer`: produce an immutable snapshot of the current view(s)
//! - `PositioningOracle`: score a snapshot against the target and propose a
//!   correction
//! - `ActorMutator`: apply a relative correction to the tracked actor
//!
//! All traits are async and backend-agnostic. Scripted in-memory fakes are
//! provided for testing via the `fakes` module; the only mutation of shared
//! state happens through `ActorMutator`, and only one controller instance may
//! drive a given actor at a time (caller-enforced).

use async_trait::async_trait;

use crate::capture::{CaptureSpec, SceneState};
use crate::error::{CaptureError, EvaluationError, MutationError};
use crate::evaluate::{Adjustment, EvaluationResult};
use crate::target::{ActorId, TargetSpec};
use crate::transform::Transform;

/// Scene capture collaborator.
///
/// Guarantees:
/// - A returned `SceneState` reflects the given transform and is immutable.
/// - Capture order follows `spec.angles`.
#[async_trait]
pub trait SceneRenderer: Send + Sync {
    /// Capture the current view(s) for the given actor transform.
    async fn capture(
        &self,
        actor_transform: &Transform,
        spec: &CaptureSpec,
    ) -> Result<SceneState, CaptureError>;
}

/// Scoring and correction collaborator.
///
/// The underlying transport (HTTP to a hosted model, JSON extraction) is the
/// implementation's concern; the controller only requires that the verdict
/// arrive well-formed or as an `EvaluationError`.
#[async_trait]
pub trait PositioningOracle: Send + Sync {
    /// Score the snapshot against the target and propose an adjustment.
    async fn evaluate(
        &self,
        target: &TargetSpec,
        state: &SceneState,
    ) -> Result<EvaluationResult, EvaluationError>;
}

/// Live-scene mutation collaborator.
///
/// Mutations are deterministic local operations; a failure here means the
/// actor is gone or the adjustment is unusable, and the run aborts without
/// retry.
#[async_trait]
pub trait ActorMutator: Send + Sync {
    /// Read the actor's current absolute transform.
    async fn current(&self, actor: &ActorId) -> Result<Transform, MutationError>;

    /// Apply a relative adjustment and report the resulting absolute
    /// transform.
    async fn apply(
        &self,
        actor: &ActorId,
        adjustment: &Adjustment,
    ) -> Result<Transform, MutationError>;
}
