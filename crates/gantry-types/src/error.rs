//! Runtime error types for simulation operations.
//!
//! Scene-description problems are a different animal: they accumulate as
//! positioned records in the scene crate. This type covers runtime and
//! configuration failures only.

use thiserror::Error;

/// Errors that can occur while building or stepping a simulation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    /// Invalid body handle referenced.
    #[error("invalid body handle: {0}")]
    InvalidBody(u32),

    /// Invalid geom handle referenced.
    #[error("invalid geom handle: {0}")]
    InvalidGeom(u32),

    /// Invalid joint handle referenced.
    #[error("invalid joint handle: {0}")]
    InvalidJoint(u32),

    /// Invalid step length.
    #[error("invalid step length: {0} (must be positive and finite)")]
    InvalidStepLength(f64),

    /// Simulation diverged (`NaN` or `Inf` detected in body state).
    #[error("simulation diverged: {reason}")]
    Diverged {
        /// Description of what went wrong.
        reason: String,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },

    /// Invalid mass properties.
    #[error("invalid mass properties: {reason}")]
    InvalidMassProperties {
        /// Description of what's wrong.
        reason: String,
    },

    /// Named object not found in the compiled simulation.
    #[error("object not found: {name}")]
    NotFound {
        /// The name that failed to resolve.
        name: String,
    },
}

impl SimError {
    /// Create a diverged error.
    #[must_use]
    pub fn diverged(reason: impl Into<String>) -> Self {
        Self::Diverged {
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create an invalid mass properties error.
    #[must_use]
    pub fn invalid_mass(reason: impl Into<String>) -> Self {
        Self::InvalidMassProperties {
            reason: reason.into(),
        }
    }

    /// Create a not-found error.
    #[must_use]
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Check whether this is a divergence error.
    #[must_use]
    pub fn is_diverged(&self) -> bool {
        matches!(self, Self::Diverged { .. })
    }
}
