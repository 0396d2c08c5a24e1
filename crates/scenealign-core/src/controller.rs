//! Convergence controller: capture, evaluate, apply, record, decide.
//!
//! The loop is strictly sequential; each step gates the next. Capture and
//! evaluation failures are retried once within the iteration, mutation
//! failures abort immediately, and cancellation is observed between
//! iterations. `run` never propagates collaborator failures: expected failure
//! modes terminate the run with an `Aborted` outcome and whatever records
//! were collected.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};
use uuid::Uuid;

use crate::capture::SceneState;
use crate::config::RunConfig;
use crate::error::{CaptureError, ConfigError, EvaluationError};
use crate::evaluate::EvaluationResult;
use crate::history::{AbortReason, IterationLog, RunOutcome, RunReport};
use crate::policy::{StoppingPolicy, Verdict};
use crate::ports::{ActorMutator, PositioningOracle, SceneRenderer};
use crate::target::TargetSpec;
use crate::transform::Transform;

/// Cooperative cancellation handle, shared between the caller and a running
/// controller. Cancellation takes effect at the top of the next iteration,
/// never mid-step.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the associated run.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Orchestrates one positioning run against the three collaborator seams.
///
/// Holds no global state; the live actor transform is the only shared mutable
/// resource, reached exclusively through the mutator. Callers must not run
/// two controllers against the same actor concurrently.
pub struct ConvergenceController {
    renderer: Arc<dyn SceneRenderer>,
    oracle: Arc<dyn PositioningOracle>,
    mutator: Arc<dyn ActorMutator>,
}

impl ConvergenceController {
    pub fn new(
        renderer: Arc<dyn SceneRenderer>,
        oracle: Arc<dyn PositioningOracle>,
        mutator: Arc<dyn ActorMutator>,
    ) -> Self {
        ConvergenceController {
            renderer,
            oracle,
            mutator,
        }
    }

    /// Run to termination without external cancellation.
    pub async fn run(
        &self,
        target: &TargetSpec,
        config: &RunConfig,
    ) -> Result<RunReport, ConfigError> {
        self.run_with_cancel(target, config, &CancelHandle::new())
            .await
    }

    /// Run to termination, observing `cancel` between iterations.
    ///
    /// The only error is an invalid `config`, rejected before the first
    /// iteration; every collaborator failure is folded into the returned
    /// report's outcome.
    pub async fn run_with_cancel(
        &self,
        target: &TargetSpec,
        config: &RunConfig,
        cancel: &CancelHandle,
    ) -> Result<RunReport, ConfigError> {
        config.validate()?;

        let start = Instant::now();
        let run_id = Uuid::new_v4().to_string();
        let policy = StoppingPolicy::from_config(config);
        let mut log = IterationLog::new();

        info!(
            run_id = %run_id,
            actor = %target.actor,
            max_iterations = config.max_iterations,
            threshold = config.convergence_threshold,
            "Starting positioning run"
        );

        let outcome = self
            .drive(target, config, cancel, &policy, &mut log, &run_id)
            .await;

        let duration_ms = start.elapsed().as_millis() as u64;
        match &outcome {
            RunOutcome::Aborted(reason) => warn!(
                run_id = %run_id,
                reason = %reason,
                iterations = log.len(),
                "Positioning run aborted"
            ),
            other => info!(
                run_id = %run_id,
                outcome = %other,
                iterations = log.len(),
                duration_ms = duration_ms,
                "Positioning run finished"
            ),
        }

        Ok(RunReport {
            run_id,
            outcome,
            records: log.into_records(),
            duration_ms,
        })
    }

    async fn drive(
        &self,
        target: &TargetSpec,
        config: &RunConfig,
        cancel: &CancelHandle,
        policy: &StoppingPolicy,
        log: &mut IterationLog,
        run_id: &str,
    ) -> RunOutcome {
        let mut current = match self.mutator.current(&target.actor).await {
            Ok(transform) => transform,
            Err(e) => return RunOutcome::Aborted(AbortReason::Mutation(e.to_string())),
        };

        loop {
            if cancel.is_cancelled() {
                info!(run_id = %run_id, iterations = log.len(), "Cancellation observed, stopping");
                return RunOutcome::Aborted(AbortReason::Cancelled);
            }

            let iteration = log.len() as u32 + 1;
            let iter_start = Instant::now();

            let state = match self
                .capture_with_retry(&current, config, run_id, iteration)
                .await
            {
                Ok(state) => state,
                Err(e) => return RunOutcome::Aborted(AbortReason::Capture(e.to_string())),
            };

            let evaluation = match self
                .evaluate_with_retry(target, &state, config, run_id, iteration)
                .await
            {
                Ok(evaluation) => evaluation,
                Err(e) => return RunOutcome::Aborted(AbortReason::Evaluation(e.to_string())),
            };

            // The live transform moves here; aborted runs do not roll back.
            current = match self.mutator.apply(&target.actor, evaluation.adjustment()).await {
                Ok(transform) => transform,
                Err(e) => return RunOutcome::Aborted(AbortReason::Mutation(e.to_string())),
            };

            let similarity = evaluation.similarity();
            let snapshot = state.snapshot_digest().clone();
            let duration_ms = iter_start.elapsed().as_millis() as u64;
            log.push(snapshot, evaluation, current, duration_ms);

            info!(
                run_id = %run_id,
                iteration = iteration,
                similarity = similarity,
                position = %current.position,
                "Iteration recorded"
            );

            match policy.evaluate(log.records()) {
                Verdict::Continue => continue,
                Verdict::Converged => return RunOutcome::Converged,
                Verdict::Exhausted => return RunOutcome::Exhausted,
                Verdict::Plateaued => return RunOutcome::Plateaued,
            }
        }
    }

    /// Capture with the one-retry policy: retry once immediately, escalate
    /// the second consecutive failure.
    async fn capture_with_retry(
        &self,
        transform: &Transform,
        config: &RunConfig,
        run_id: &str,
        iteration: u32,
    ) -> Result<SceneState, CaptureError> {
        match self.bounded_capture(transform, config).await {
            Ok(state) => Ok(state),
            Err(first) => {
                warn!(
                    run_id = %run_id,
                    iteration = iteration,
                    error = %first,
                    "Capture failed, retrying once"
                );
                self.bounded_capture(transform, config).await
            }
        }
    }

    async fn bounded_capture(
        &self,
        transform: &Transform,
        config: &RunConfig,
    ) -> Result<SceneState, CaptureError> {
        let capture = self.renderer.capture(transform, &config.capture);
        if config.call_timeout_secs > 0 {
            match tokio::time::timeout(Duration::from_secs(config.call_timeout_secs), capture)
                .await
            {
                Ok(result) => result,
                Err(_) => Err(CaptureError::Timeout {
                    timeout_secs: config.call_timeout_secs,
                }),
            }
        } else {
            capture.await
        }
    }

    /// Evaluate with the same one-retry policy as capture. Transport failure
    /// and malformed output escalate identically.
    async fn evaluate_with_retry(
        &self,
        target: &TargetSpec,
        state: &SceneState,
        config: &RunConfig,
        run_id: &str,
        iteration: u32,
    ) -> Result<EvaluationResult, EvaluationError> {
        match self.bounded_evaluate(target, state, config).await {
            Ok(result) => Ok(result),
            Err(first) => {
                warn!(
                    run_id = %run_id,
                    iteration = iteration,
                    error = %first,
                    "Evaluation failed, retrying once"
                );
                self.bounded_evaluate(target, state, config).await
            }
        }
    }

    async fn bounded_evaluate(
        &self,
        target: &TargetSpec,
        state: &SceneState,
        config: &RunConfig,
    ) -> Result<EvaluationResult, EvaluationError> {
        let evaluate = self.oracle.evaluate(target, state);
        if config.call_timeout_secs > 0 {
            match tokio::time::timeout(Duration::from_secs(config.call_timeout_secs), evaluate)
                .await
            {
                Ok(result) => result,
                Err(_) => Err(EvaluationError::Timeout {
                    timeout_secs: config.call_timeout_secs,
                }),
            }
        } else {
            evaluate.await
        }
    }
}
