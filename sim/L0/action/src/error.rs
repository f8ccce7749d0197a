//! Error types for action and impulse models.

use std::fmt;

use thiserror::Error;

use crate::impulse::FrameId;

/// Row/column extent of a vector or matrix argument.
///
/// Vectors are reported as `n×1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    /// Number of rows.
    pub rows: usize,
    /// Number of columns.
    pub cols: usize,
}

impl Shape {
    /// Shape of a matrix.
    #[must_use]
    pub const fn matrix(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Shape of a column vector.
    #[must_use]
    pub const fn vector(len: usize) -> Self {
        Self { rows: len, cols: 1 }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}×{}", self.rows, self.cols)
    }
}

/// Errors raised by model construction, configuration and evaluation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ActionError {
    /// A constructor or setter received an argument it cannot accept.
    ///
    /// Raised before the object enters service: zero dimensions,
    /// inconsistent constructor shapes, non-positive timesteps.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Description of the rejected argument.
        reason: String,
    },

    /// A vector or matrix argument disagrees with the model's fixed dimensions.
    #[error("{what} has wrong dimension: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Name of the offending argument.
        what: &'static str,
        /// Shape required by the model.
        expected: Shape,
        /// Shape that was passed.
        actual: Shape,
    },

    /// Data was handed to a model that did not create it.
    #[error("data is not bound to this model")]
    DataMismatch,

    /// The dynamics-engine buffer has no entry for the requested frame.
    #[error("unknown frame {0}")]
    UnknownFrame(FrameId),
}

impl ActionError {
    /// Create an invalid-argument error.
    #[must_use]
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Check if this is a dimension mismatch.
    #[must_use]
    pub fn is_dimension_mismatch(&self) -> bool {
        matches!(self, Self::DimensionMismatch { .. })
    }

    /// Check if this is a construction-time argument error.
    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }
}

/// Result type for action and impulse model operations.
pub type Result<T> = std::result::Result<T, ActionError>;
