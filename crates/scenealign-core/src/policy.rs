//! Stopping-policy evaluation over recorded history.
//!
//! Precedence: convergence is checked before exhaustion so a run that reaches
//! the threshold on its last allowed iteration is still reported as success;
//! plateau detection runs last and only once enough history exists.

use crate::config::RunConfig;
use crate::history::IterationRecord;

/// Verdict after one completed iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    Converged,
    Exhausted,
    Plateaued,
}

/// Threshold evaluation, split out of the controller so it can be unit-tested
/// against synthetic histories.
#[derive(Debug, Clone)]
pub struct StoppingPolicy {
    convergence_threshold: f64,
    max_iterations: u32,
    plateau_window: u32,
    plateau_epsilon: f64,
}

impl StoppingPolicy {
    pub fn from_config(config: &RunConfig) -> Self {
        StoppingPolicy {
            convergence_threshold: config.convergence_threshold,
            max_iterations: config.max_iterations,
            plateau_window: config.plateau_window,
            plateau_epsilon: config.plateau_epsilon,
        }
    }

    /// Decide whether the loop continues, given the full history so far.
    /// Scores are clamped into [0, 1] before comparison.
    pub fn evaluate(&self, records: &[IterationRecord]) -> Verdict {
        let Some(last) = records.last() else {
            return Verdict::Continue;
        };

        if last.evaluation.clamped_similarity() >= self.convergence_threshold {
            return Verdict::Converged;
        }

        if last.iteration >= self.max_iterations {
            return Verdict::Exhausted;
        }

        let window = self.plateau_window as usize;
        if records.len() >= window {
            let trailing = &records[records.len() - window..];
            let oldest = trailing[0].evaluation.clamped_similarity();
            let newest = trailing[window - 1].evaluation.clamped_similarity();
            if fractional_improvement(oldest, newest) < self.plateau_epsilon {
                return Verdict::Plateaued;
            }
        }

        Verdict::Continue
    }
}

/// Relative improvement from `oldest` to `newest`.
///
/// Undefined at `oldest <= 0`: a positive newest score counts as unbounded
/// improvement so a run climbing out of zero is never declared stagnant,
/// otherwise zero.
pub fn fractional_improvement(oldest: f64, newest: f64) -> f64 {
    if oldest > 0.0 {
        (newest - oldest) / oldest
    } else if newest > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureImage, Resolution, SceneState, ViewAngle};
    use crate::evaluate::{Adjustment, EvaluationResult};
    use crate::transform::Transform;
    use chrono::Utc;

    fn history(scores: &[f64]) -> Vec<IterationRecord> {
        scores
            .iter()
            .enumerate()
            .map(|(i, &similarity)| {
                let state = SceneState::new(
                    Transform::at(0.0, 0.0, 100.0),
                    vec![CaptureImage {
                        angle: ViewAngle::Front,
                        resolution: Resolution::default(),
                        data: vec![i as u8],
                    }],
                )
                .expect("state");
                IterationRecord {
                    iteration: i as u32 + 1,
                    snapshot: state.snapshot_digest().clone(),
                    evaluation: EvaluationResult::new(similarity, Adjustment::zero())
                        .expect("result"),
                    transform: Transform::at(0.0, 0.0, 100.0),
                    duration_ms: 10,
                    timestamp: Utc::now(),
                }
            })
            .collect()
    }

    fn policy(threshold: f64, max: u32, window: u32, epsilon: f64) -> StoppingPolicy {
        StoppingPolicy::from_config(
            &RunConfig::default()
                .with_convergence_threshold(threshold)
                .with_max_iterations(max)
                .with_plateau(window, epsilon),
        )
    }

    #[test]
    fn test_empty_history_continues() {
        let p = policy(0.85, 5, 3, 0.05);
        assert_eq!(p.evaluate(&[]), Verdict::Continue);
    }

    #[test]
    fn test_converged_at_threshold() {
        let p = policy(0.85, 5, 3, 0.05);
        assert_eq!(p.evaluate(&history(&[0.85])), Verdict::Converged);
        assert_eq!(p.evaluate(&history(&[0.9])), Verdict::Converged);
        assert_eq!(p.evaluate(&history(&[0.84])), Verdict::Continue);
    }

    #[test]
    fn test_convergence_beats_exhaustion_on_last_iteration() {
        // Threshold reached exactly when the cap triggers: success, not
        // exhaustion.
        let p = policy(0.85, 3, 3, 0.0);
        assert_eq!(p.evaluate(&history(&[0.2, 0.5, 0.9])), Verdict::Converged);
    }

    #[test]
    fn test_exhausted_at_cap() {
        let p = policy(0.85, 3, 5, 0.05);
        assert_eq!(p.evaluate(&history(&[0.1, 0.1, 0.1])), Verdict::Exhausted);
    }

    #[test]
    fn test_plateau_needs_full_window() {
        let p = policy(0.85, 10, 3, 0.05);
        assert_eq!(p.evaluate(&history(&[0.40, 0.401])), Verdict::Continue);
    }

    #[test]
    fn test_plateau_just_below_epsilon() {
        // (0.419 - 0.40) / 0.40 = 4.75% < 5%
        let p = policy(0.85, 10, 3, 0.05);
        assert_eq!(
            p.evaluate(&history(&[0.40, 0.41, 0.419])),
            Verdict::Plateaued
        );
    }

    #[test]
    fn test_plateau_just_above_epsilon() {
        // (0.421 - 0.40) / 0.40 = 5.25%, not < 5%
        let p = policy(0.85, 10, 3, 0.05);
        assert_eq!(p.evaluate(&history(&[0.40, 0.41, 0.421])), Verdict::Continue);
    }

    #[test]
    fn test_plateau_window_is_trailing() {
        // Early stagnation scrolls out of the window once scores move again.
        let p = policy(0.85, 10, 3, 0.05);
        assert_eq!(
            p.evaluate(&history(&[0.40, 0.40, 0.40, 0.50, 0.70])),
            Verdict::Continue
        );
    }

    #[test]
    fn test_regression_is_plateau() {
        // Negative improvement is below any non-negative epsilon.
        let p = policy(0.85, 10, 3, 0.05);
        assert_eq!(p.evaluate(&history(&[0.50, 0.45, 0.40])), Verdict::Plateaued);
    }

    #[test]
    fn test_fractional_improvement_zero_oldest() {
        assert_eq!(fractional_improvement(0.0, 0.3), f64::INFINITY);
        assert_eq!(fractional_improvement(0.0, 0.0), 0.0);
        assert!((fractional_improvement(0.40, 0.419) - 0.0475).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_range_scores_clamped() {
        // An oracle scoring 1.2 still converges against a 0.85 threshold.
        let p = policy(0.85, 5, 3, 0.05);
        assert_eq!(p.evaluate(&history(&[1.2])), Verdict::Converged);
    }
}
