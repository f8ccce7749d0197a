//! Configuration for finite-difference derivatives.

use crate::error::{ActionError, Result};

/// Largest perturbation accepted by [`NumDiffConfig::validate`].
///
/// Beyond this the linearization assumption no longer holds.
pub const MAX_EPS: f64 = 1e-2;

/// Configuration for [`ActionModelNumDiff`](crate::ActionModelNumDiff).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumDiffConfig {
    /// Perturbation magnitude for first-order differences.
    /// Default: `1e-6`. Must be in `(0, 1e-2]`.
    ///
    /// Second-order differences use `sqrt(eps)`, which balances truncation
    /// against rounding for the `1/h²` scaling.
    pub eps: f64,

    /// Centered differences (O(ε²) error, 2× cost) instead of forward
    /// differences (O(ε) error).
    /// Default: `true`.
    pub centered: bool,
}

impl Default for NumDiffConfig {
    fn default() -> Self {
        Self {
            eps: 1e-6,
            centered: true,
        }
    }
}

impl NumDiffConfig {
    /// Set the perturbation magnitude.
    #[must_use]
    pub fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    /// Use forward differences.
    #[must_use]
    pub fn forward(mut self) -> Self {
        self.centered = false;
        self
    }

    /// Use centered differences.
    #[must_use]
    pub fn centered(mut self) -> Self {
        self.centered = true;
        self
    }

    /// Step used for second-order differences.
    #[must_use]
    pub fn hessian_eps(&self) -> f64 {
        self.eps.sqrt()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::InvalidArgument`] if `eps` is non-finite,
    /// non-positive, or above [`MAX_EPS`].
    pub fn validate(&self) -> Result<()> {
        // !(eps > 0) also rejects NaN
        if !self.eps.is_finite() || !(self.eps > 0.0) || self.eps > MAX_EPS {
            return Err(ActionError::invalid_argument(format!(
                "finite-difference eps must be in (0, {MAX_EPS}], got {}",
                self.eps
            )));
        }
        Ok(())
    }
}
