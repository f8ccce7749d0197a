//! Shape validation for model inputs.
//!
//! Two tiers of checks:
//!
//! - `require_*`: always on. Used by constructors and setters, where a
//!   mismatch is a configuration error.
//! - `check_*`: hot-path preconditions for `calc`, `calc_diff` and the
//!   impulse `update_*` operations. The `unchecked` feature compiles them
//!   out, leaving shape correctness to the caller.

use nalgebra::{DMatrix, DVector};

use crate::Real;
use crate::error::{ActionError, Result, Shape};

/// Whether hot-path shape checks are compiled in.
///
/// `false` when the crate is built with the `unchecked` feature.
pub const SHAPE_CHECKS: bool = cfg!(not(feature = "unchecked"));

/// Fail unless `v` has exactly `expected` entries.
pub(crate) fn require_len<T: Real>(what: &'static str, v: &DVector<T>, expected: usize) -> Result<()> {
    if v.len() == expected {
        Ok(())
    } else {
        Err(ActionError::DimensionMismatch {
            what,
            expected: Shape::vector(expected),
            actual: Shape::vector(v.len()),
        })
    }
}

/// Fail unless `m` is exactly `rows × cols`.
pub(crate) fn require_shape<T: Real>(
    what: &'static str,
    m: &DMatrix<T>,
    rows: usize,
    cols: usize,
) -> Result<()> {
    if m.shape() == (rows, cols) {
        Ok(())
    } else {
        Err(ActionError::DimensionMismatch {
            what,
            expected: Shape::matrix(rows, cols),
            actual: Shape::matrix(m.nrows(), m.ncols()),
        })
    }
}

/// Hot-path variant of [`require_len`].
#[inline]
pub(crate) fn check_len<T: Real>(what: &'static str, v: &DVector<T>, expected: usize) -> Result<()> {
    if SHAPE_CHECKS {
        require_len(what, v, expected)
    } else {
        Ok(())
    }
}

/// Hot-path variant of [`require_shape`].
#[inline]
pub(crate) fn check_shape<T: Real>(
    what: &'static str,
    m: &DMatrix<T>,
    rows: usize,
    cols: usize,
) -> Result<()> {
    if SHAPE_CHECKS {
        require_shape(what, m, rows, cols)
    } else {
        Ok(())
    }
}

/// Fail unless the square matrix `m` is symmetric.
///
/// Entries are compared relative to the largest magnitude in `m`, so a
/// product such as `LLᵀ` that is symmetric up to rounding is accepted.
pub(crate) fn require_symmetric<T: Real>(what: &'static str, m: &DMatrix<T>) -> Result<()> {
    let scale = m.iter().fold(T::one(), |acc, &v| acc.max(v.abs()));
    let tol = T::default_epsilon() * nalgebra::convert(1e3) * scale;
    let n = m.nrows();
    for i in 0..n {
        for j in (i + 1)..n {
            if (m[(i, j)] - m[(j, i)]).abs() > tol {
                return Err(ActionError::invalid_argument(format!(
                    "{what} must be symmetric: entry ({i}, {j}) is {} but ({j}, {i}) is {}",
                    m[(i, j)],
                    m[(j, i)]
                )));
            }
        }
    }
    Ok(())
}

/// Fail unless a dimension is strictly positive.
pub(crate) fn require_positive(what: &str, n: usize) -> Result<()> {
    if n == 0 {
        Err(ActionError::invalid_argument(format!("{what} must be positive")))
    } else {
        Ok(())
    }
}
