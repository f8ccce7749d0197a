//! Unicycle action model.
//!
//! State `(x, y, θ)`, control `(v, ω)`, explicit Euler over `dt`:
//!
//! ```text
//! xnext = [x + cosθ·v·dt,  y + sinθ·v·dt,  θ + ω·dt]
//! ℓ     = ½‖w₀·x‖² + ½‖w₁·u‖²
//! ```
//!
//! The dynamics Jacobians depend on `θ` and `v`. `calc` caches `cosθ` and
//! `sinθ` in the data and `calc_diff` reads them back, so `calc_diff` must
//! follow a `calc` at the same `(x, u)`.

use std::fmt;
use std::sync::Arc;

use nalgebra::DVector;

use super::{ActionData, ActionDataCommon, ActionModel, ActionModelBase};
use crate::Real;
use crate::error::{ActionError, Result};
use crate::state::StateVector;

const NX: usize = 3;
const NU: usize = 2;

/// Wheeled robot driving in the plane.
#[derive(Debug, Clone)]
pub struct ActionModelUnicycle<T: Real = f64> {
    base: ActionModelBase<T>,
    dt: T,
    /// `[w₀, w₁]`: state and control residual weights.
    cost_weights: [T; 2],
}

/// Data for [`ActionModelUnicycle`].
#[derive(Debug, Clone)]
pub struct ActionDataUnicycle<T: Real = f64> {
    /// Outputs and derivatives.
    pub common: ActionDataCommon<T>,
    cos_theta: T,
    sin_theta: T,
}

impl<T: Real> ActionData<T> for ActionDataUnicycle<T> {
    fn common(&self) -> &ActionDataCommon<T> {
        &self.common
    }

    fn common_mut(&mut self) -> &mut ActionDataCommon<T> {
        &mut self.common
    }
}

impl<T: Real> ActionModelUnicycle<T> {
    /// Create a unicycle with `dt = 0.1` and cost weights `[10, 1]`.
    ///
    /// # Errors
    ///
    /// Infallible in practice; propagates state construction errors.
    pub fn new() -> Result<Self> {
        let state = Arc::new(StateVector::<T>::new(NX)?);
        Ok(Self {
            base: ActionModelBase::new(state, NU)?,
            dt: nalgebra::convert(0.1),
            cost_weights: [nalgebra::convert(10.0), nalgebra::one()],
        })
    }

    /// Timestep.
    #[must_use]
    pub fn dt(&self) -> T {
        self.dt
    }

    /// Set the timestep.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::InvalidArgument`] unless `dt` is positive and finite.
    pub fn set_dt(&mut self, dt: T) -> Result<()> {
        if !dt.is_finite() || !(dt > T::zero()) {
            return Err(ActionError::invalid_argument(format!(
                "dt must be positive and finite, got {dt}"
            )));
        }
        self.dt = dt;
        Ok(())
    }

    /// Builder form of [`set_dt`](Self::set_dt).
    ///
    /// # Errors
    ///
    /// As [`set_dt`](Self::set_dt).
    pub fn with_dt(mut self, dt: T) -> Result<Self> {
        self.set_dt(dt)?;
        Ok(self)
    }

    /// State and control residual weights `[w₀, w₁]`.
    #[must_use]
    pub fn cost_weights(&self) -> [T; 2] {
        self.cost_weights
    }

    /// Set the residual weights.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::InvalidArgument`] if a weight is negative or
    /// non-finite.
    pub fn set_cost_weights(&mut self, weights: [T; 2]) -> Result<()> {
        if weights.iter().any(|w| !w.is_finite() || *w < T::zero()) {
            return Err(ActionError::invalid_argument(format!(
                "cost weights must be finite and non-negative, got [{}, {}]",
                weights[0], weights[1]
            )));
        }
        self.cost_weights = weights;
        Ok(())
    }

    fn state_cost(&self, x: &DVector<T>) -> T {
        let w = self.cost_weights[0];
        let half: T = nalgebra::convert(0.5);
        half * w * w * x.norm_squared()
    }
}

impl<T: Real> ActionModel<T> for ActionModelUnicycle<T> {
    type Data = ActionDataUnicycle<T>;

    fn base(&self) -> &ActionModelBase<T> {
        &self.base
    }

    fn create_data(&self) -> ActionDataUnicycle<T> {
        let mut common = ActionDataCommon::new(&self.base);
        common.Fx.fill_with_identity();
        ActionDataUnicycle {
            common,
            cos_theta: T::one(),
            sin_theta: T::zero(),
        }
    }

    fn calc(&self, data: &mut ActionDataUnicycle<T>, x: &DVector<T>, u: &DVector<T>) -> Result<()> {
        self.base.check_xu(x, u)?;
        let (c, s) = (x[2].cos(), x[2].sin());
        data.cos_theta = c;
        data.sin_theta = s;

        let d = &mut data.common;
        d.xnext[0] = x[0] + c * u[0] * self.dt;
        d.xnext[1] = x[1] + s * u[0] * self.dt;
        d.xnext[2] = x[2] + u[1] * self.dt;

        let w = self.cost_weights[1];
        let half: T = nalgebra::convert(0.5);
        d.cost = self.state_cost(x) + half * w * w * u.norm_squared();
        Ok(())
    }

    fn calc_terminal(&self, data: &mut ActionDataUnicycle<T>, x: &DVector<T>) -> Result<()> {
        self.base.check_x(x)?;
        data.common.cost = self.state_cost(x);
        Ok(())
    }

    /// Requires a preceding [`calc`](ActionModel::calc) at the same point.
    fn calc_diff(
        &self,
        data: &mut ActionDataUnicycle<T>,
        x: &DVector<T>,
        u: &DVector<T>,
    ) -> Result<()> {
        self.base.check_xu(x, u)?;
        let (c, s, dt) = (data.cos_theta, data.sin_theta, self.dt);
        let w_x = self.cost_weights[0] * self.cost_weights[0];
        let w_u = self.cost_weights[1] * self.cost_weights[1];
        let d = &mut data.common;

        d.Lx.copy_from(x);
        d.Lx *= w_x;
        d.Lu.copy_from(u);
        d.Lu *= w_u;
        d.Lxx.fill_diagonal(w_x);
        d.Luu.fill_diagonal(w_u);

        d.Fx[(0, 2)] = -s * u[0] * dt;
        d.Fx[(1, 2)] = c * u[0] * dt;
        d.Fu[(0, 0)] = c * dt;
        d.Fu[(1, 0)] = s * dt;
        d.Fu[(2, 1)] = dt;
        Ok(())
    }

    fn calc_diff_terminal(&self, data: &mut ActionDataUnicycle<T>, x: &DVector<T>) -> Result<()> {
        self.base.check_x(x)?;
        let w_x = self.cost_weights[0] * self.cost_weights[0];
        let d = &mut data.common;
        d.Lx.copy_from(x);
        d.Lx *= w_x;
        d.Lxx.fill_diagonal(w_x);
        Ok(())
    }
}

impl<T: Real> fmt::Display for ActionModelUnicycle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActionModelUnicycle {{dt={}, nu={}}}", self.dt, self.base.nu())
    }
}
