//! State representations.
//!
//! A state exposes its coordinate dimension `nx`, its tangent dimension
//! `ndx`, the configuration/velocity split `nq`/`nv`, and the manifold
//! operators that map between points and tangent vectors:
//!
//! ```text
//! integrate(x, dx) = x ⊕ dx      (point + tangent → point)
//! diff(x0, x1)     = x1 ⊖ x0     (point, point → tangent)
//! ```
//!
//! Multibody states (quaternions, free-flyers) live in the dynamics engine
//! and implement [`State`] there. [`StateVector`] covers plain vector
//! spaces, where both operators reduce to addition and subtraction.

use std::fmt;
use std::marker::PhantomData;

use nalgebra::DVector;

use crate::Real;
use crate::error::Result;
use crate::shape::{check_len, require_positive};

/// State representation consumed by action and impulse models.
pub trait State<T: Real = f64>: fmt::Debug + Send + Sync {
    /// Dimension of the state coordinates.
    fn nx(&self) -> usize;

    /// Dimension of the tangent space.
    fn ndx(&self) -> usize;

    /// Dimension of the configuration part.
    fn nq(&self) -> usize;

    /// Dimension of the velocity part.
    fn nv(&self) -> usize;

    /// Neutral state (length `nx`).
    fn zero(&self) -> DVector<T>;

    /// Tangent vector from `x0` to `x1`: `dxout = x1 ⊖ x0` (length `ndx`).
    fn diff(&self, x0: &DVector<T>, x1: &DVector<T>, dxout: &mut DVector<T>) -> Result<()>;

    /// Point reached from `x` along `dx`: `xout = x ⊕ dx` (length `nx`).
    fn integrate(&self, x: &DVector<T>, dx: &DVector<T>, xout: &mut DVector<T>) -> Result<()>;
}

/// Euclidean state: `nx == ndx`, first half configuration, second half velocity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateVector<T: Real = f64> {
    nx: usize,
    _scalar: PhantomData<T>,
}

impl<T: Real> StateVector<T> {
    /// Create a vector state of dimension `nx`.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::InvalidArgument`](crate::ActionError::InvalidArgument)
    /// if `nx` is zero.
    pub fn new(nx: usize) -> Result<Self> {
        require_positive("nx", nx)?;
        Ok(Self {
            nx,
            _scalar: PhantomData,
        })
    }
}

impl<T: Real> State<T> for StateVector<T> {
    fn nx(&self) -> usize {
        self.nx
    }

    fn ndx(&self) -> usize {
        self.nx
    }

    fn nq(&self) -> usize {
        self.nx - self.nv()
    }

    fn nv(&self) -> usize {
        self.nx / 2
    }

    fn zero(&self) -> DVector<T> {
        DVector::zeros(self.nx)
    }

    fn diff(&self, x0: &DVector<T>, x1: &DVector<T>, dxout: &mut DVector<T>) -> Result<()> {
        check_len("x0", x0, self.nx)?;
        check_len("x1", x1, self.nx)?;
        check_len("dxout", dxout, self.nx)?;
        dxout.copy_from(x1);
        *dxout -= x0;
        Ok(())
    }

    fn integrate(&self, x: &DVector<T>, dx: &DVector<T>, xout: &mut DVector<T>) -> Result<()> {
        check_len("x", x, self.nx)?;
        check_len("dx", dx, self.nx)?;
        check_len("xout", xout, self.nx)?;
        xout.copy_from(x);
        *xout += dx;
        Ok(())
    }
}
