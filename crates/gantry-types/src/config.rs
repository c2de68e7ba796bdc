//! Global contact and stepping configuration.
//!
//! These values come from the `<Scene>` element's attributes and are shared
//! by the collision pipeline, the solver, and the step driver.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Contact generation and solver parameters for a scene.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContactConfig {
    /// Error reduction parameter for contact constraints (0..1).
    pub erp: f64,
    /// Constraint force mixing (softness) for contact constraints.
    pub cfm: f64,
    /// ERP used for joint limit stops.
    pub stop_erp: f64,
    /// CFM used for joint limit stops.
    pub stop_cfm: f64,
    /// Default sliding friction coefficient when no material pair resolves.
    pub default_friction: f64,
    /// Solver iterations for the full solver profile.
    pub full_iterations: usize,
    /// Solver iterations for the quick solver profile.
    pub quick_iterations: usize,
    /// Use the quick profile every Nth step (0 disables quick stepping).
    pub quick_solver_ratio: u32,
    /// Whether movable bodies collide with each other (static-vs-movable
    /// collision is always on).
    pub body_collisions: bool,
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            erp: 0.2,
            cfm: 1e-5,
            stop_erp: 0.2,
            stop_cfm: 1e-5,
            default_friction: 0.5,
            full_iterations: 32,
            quick_iterations: 8,
            quick_solver_ratio: 0,
            body_collisions: true,
        }
    }
}

impl ContactConfig {
    /// Validate parameter ranges.
    pub fn validate(&self) -> crate::Result<()> {
        if !(0.0..=1.0).contains(&self.erp) || !(0.0..=1.0).contains(&self.stop_erp) {
            return Err(crate::SimError::invalid_config("erp must be in [0, 1]"));
        }
        if self.cfm < 0.0 || self.stop_cfm < 0.0 {
            return Err(crate::SimError::invalid_config("cfm must be >= 0"));
        }
        if self.full_iterations == 0 {
            return Err(crate::SimError::invalid_config(
                "full_iterations must be > 0",
            ));
        }
        Ok(())
    }
}

/// Fixed-step timing configuration for a scene.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StepConfig {
    /// Fixed step length in seconds of simulated time.
    pub step_length: f64,
    /// Gravity along world Z (m/s², negative is downward).
    pub gravity: f64,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            step_length: 0.004,
            gravity: -9.81,
        }
    }
}

impl StepConfig {
    /// Create a config with the given step length.
    #[must_use]
    pub fn with_step_length(step_length: f64) -> Self {
        Self {
            step_length,
            ..Default::default()
        }
    }

    /// Set gravity.
    #[must_use]
    pub fn gravity(mut self, gravity: f64) -> Self {
        self.gravity = gravity;
        self
    }

    /// Steps per second of simulated time.
    #[must_use]
    pub fn frequency(&self) -> f64 {
        1.0 / self.step_length
    }

    /// Validate the configuration.
    pub fn validate(&self) -> crate::Result<()> {
        if !self.step_length.is_finite() || self.step_length <= 0.0 {
            return Err(crate::SimError::InvalidStepLength(self.step_length));
        }
        if self.step_length > 1.0 {
            return Err(crate::SimError::invalid_config(
                "step length > 1 second is likely an error",
            ));
        }
        Ok(())
    }
}
