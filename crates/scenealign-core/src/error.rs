//! Error types for positioning runs
//!
//! Capture and evaluation failures are retryable (once per iteration) before a
//! run aborts; mutation failures are fatal immediately. `EvaluationError` keeps
//! transport failures and malformed oracle output as separate variants so logs
//! can tell them apart, even though the retry policy treats them identically.

use thiserror::Error;

/// A transform component left the finite range.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("non-finite {component}: {value}")]
pub struct TransformError {
    /// Which component failed validation (e.g. "position.x", "rotation.yaw")
    pub component: &'static str,

    /// The offending value
    pub value: f64,
}

/// Errors from the scene renderer collaborator.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The renderer reported a failure (viewport unavailable, write error, ...)
    #[error("renderer failure: {0}")]
    Renderer(String),

    /// The capture produced no usable image data
    #[error("empty capture: {0}")]
    EmptyCapture(String),

    /// The capture call exceeded the configured per-call bound
    #[error("capture timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
}

/// Errors from the positioning oracle collaborator.
#[derive(Error, Debug)]
pub enum EvaluationError {
    /// Transport-level failure (connection refused, HTTP 5xx, ...)
    #[error("oracle transport failure: {0}")]
    Transport(String),

    /// The oracle answered but its output could not be parsed into a
    /// well-formed verdict (missing score, missing adjustment, non-finite
    /// similarity). Never partially trusted.
    #[error("malformed oracle output: {reason}")]
    Malformed { reason: String },

    /// The evaluation call exceeded the configured per-call bound
    #[error("evaluation timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
}

/// Errors from the actor mutator collaborator. Fatal, never retried.
#[derive(Error, Debug)]
pub enum MutationError {
    /// The target actor does not exist in the live scene
    #[error("unknown actor: {0}")]
    UnknownActor(String),

    /// Applying the adjustment would leave the transform non-finite
    #[error("invalid adjustment: {0}")]
    InvalidAdjustment(#[from] TransformError),

    /// The scene rejected the mutation for another reason
    #[error("mutation rejected: {0}")]
    Rejected(String),
}

/// Invalid run configuration, rejected before the first iteration.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("max_iterations must be >= 1, got {0}")]
    MaxIterations(u32),

    #[error("convergence_threshold must be within [0, 1], got {0}")]
    ConvergenceThreshold(f64),

    #[error("plateau_window must be >= 2, got {0}")]
    PlateauWindow(u32),

    #[error("plateau_epsilon must be finite and non-negative, got {0}")]
    PlateauEpsilon(f64),

    #[error("capture spec must name at least one view angle")]
    EmptyAngles,

    #[error("capture resolution must be non-zero, got {width}x{height}")]
    ZeroResolution { width: u32, height: u32 },
}

/// Violation of the iteration log's append-only index invariant.
#[derive(Error, Debug, PartialEq)]
pub enum LogError {
    #[error("non-contiguous iteration index: expected {expected}, got {actual}")]
    NonContiguousIndex { expected: u32, actual: u32 },
}
