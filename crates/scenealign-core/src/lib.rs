//! scenealign core - Iterative positioning convergence
//!
//! Provides the convergence controller that:
//! - Captures the current scene state through a `SceneRenderer`
//! - Scores it against a storyboard target through a `PositioningOracle`
//! - Applies the proposed correction through an `ActorMutator`
//! - Records every iteration and decides when to stop
//!
//! The 3D engine and the model backend live behind the trait seams in
//! [`ports`]; scripted fakes for all three collaborators are in [`fakes`].

pub mod capture;
pub mod config;
pub mod controller;
pub mod error;
pub mod evaluate;
pub mod fakes;
pub mod history;
pub mod policy;
pub mod ports;
pub mod target;
pub mod transform;

// Re-export key types
pub use capture::{CaptureImage, CaptureSpec, Resolution, SceneState, SnapshotDigest, ViewAngle};
pub use config::RunConfig;
pub use controller::{CancelHandle, ConvergenceController};
pub use error::{CaptureError, ConfigError, EvaluationError, LogError, MutationError};
pub use evaluate::{Adjustment, EvaluationResult};
pub use history::{AbortReason, IterationLog, IterationRecord, RunOutcome, RunReport, WireRecord};
pub use policy::{StoppingPolicy, Verdict};
pub use ports::{ActorMutator, PositioningOracle, SceneRenderer};
pub use target::{ActorId, SceneReference, TargetSpec};
pub use transform::{Rotation, Transform, Vec3};
