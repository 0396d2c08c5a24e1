//! Run configuration and validation.

use serde::{Deserialize, Serialize};

use crate::capture::CaptureSpec;
use crate::error::ConfigError;

/// Configuration for one convergence run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Safety cap on iterations.
    pub max_iterations: u32,

    /// Similarity at or above which the run stops as converged.
    pub convergence_threshold: f64,

    /// Number of most-recent iterations examined for stagnation.
    pub plateau_window: u32,

    /// Minimum fractional similarity improvement over the plateau window;
    /// anything below declares the run plateaued.
    pub plateau_epsilon: f64,

    /// What the renderer captures each iteration.
    pub capture: CaptureSpec,

    /// Per-collaborator-call bound in seconds. 0 disables the bound.
    pub call_timeout_secs: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            max_iterations: 5,
            convergence_threshold: 0.85,
            plateau_window: 3,
            plateau_epsilon: 0.05,
            capture: CaptureSpec::default(),
            call_timeout_secs: 60,
        }
    }
}

impl RunConfig {
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_convergence_threshold(mut self, threshold: f64) -> Self {
        self.convergence_threshold = threshold;
        self
    }

    pub fn with_plateau(mut self, window: u32, epsilon: f64) -> Self {
        self.plateau_window = window;
        self.plateau_epsilon = epsilon;
        self
    }

    pub fn with_capture(mut self, capture: CaptureSpec) -> Self {
        self.capture = capture;
        self
    }

    pub fn with_call_timeout_secs(mut self, secs: u64) -> Self {
        self.call_timeout_secs = secs;
        self
    }

    /// Reject out-of-range options before the first iteration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations < 1 {
            return Err(ConfigError::MaxIterations(self.max_iterations));
        }
        if !self.convergence_threshold.is_finite()
            || !(0.0..=1.0).contains(&self.convergence_threshold)
        {
            return Err(ConfigError::ConvergenceThreshold(self.convergence_threshold));
        }
        if self.plateau_window < 2 {
            return Err(ConfigError::PlateauWindow(self.plateau_window));
        }
        if !self.plateau_epsilon.is_finite() || self.plateau_epsilon < 0.0 {
            return Err(ConfigError::PlateauEpsilon(self.plateau_epsilon));
        }
        if self.capture.angles.is_empty() {
            return Err(ConfigError::EmptyAngles);
        }
        if self.capture.resolution.width == 0 || self.capture.resolution.height == 0 {
            return Err(ConfigError::ZeroResolution {
                width: self.capture.resolution.width,
                height: self.capture.resolution.height,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_iterations, 5);
        assert_eq!(config.convergence_threshold, 0.85);
        assert_eq!(config.plateau_window, 3);
        assert_eq!(config.plateau_epsilon, 0.05);
    }

    #[test]
    fn test_rejects_zero_iterations() {
        let err = RunConfig::default()
            .with_max_iterations(0)
            .validate()
            .expect_err("zero cap should be rejected");
        assert_eq!(err, ConfigError::MaxIterations(0));
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        let config = RunConfig::default().with_convergence_threshold(1.5);
        assert!(config.validate().is_err());

        let config = RunConfig::default().with_convergence_threshold(f64::NAN);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_short_plateau_window() {
        let err = RunConfig::default()
            .with_plateau(1, 0.05)
            .validate()
            .expect_err("window of 1 should be rejected");
        assert_eq!(err, ConfigError::PlateauWindow(1));
    }

    #[test]
    fn test_rejects_empty_angles() {
        let mut config = RunConfig::default();
        config.capture.angles.clear();
        assert_eq!(config.validate(), Err(ConfigError::EmptyAngles));
    }

    #[test]
    fn test_timeout_zero_is_valid() {
        let config = RunConfig::default().with_call_timeout_secs(0);
        assert!(config.validate().is_ok());
    }
}
