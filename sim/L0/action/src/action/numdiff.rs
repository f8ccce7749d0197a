//! Finite-difference action model.
//!
//! [`ActionModelNumDiff`] wraps any [`ActionModel`] and replaces its
//! analytical derivatives by finite differences of its `calc`. It is the
//! reference used to validate analytical `calc_diff` implementations.
//!
//! Perturbations live in the tangent space. With `z = (dx, du)`:
//!
//! ```text
//! x(z) = x ⊕ dx              (State::integrate)
//! u(z) = u + du
//!
//! Fx, Fu : columns  (xnext(+heᵢ) ⊖ xnext(−heᵢ)) / 2h       (centered)
//!                   (xnext(+heᵢ) ⊖ xnext(0))   / h         (forward)
//! Lx, Lu : entries  (ℓ(+heᵢ) − ℓ(−heᵢ)) / 2h  or  (ℓ(+heᵢ) − ℓ(0)) / h
//! Lxx, Luu, Lxu :   (ℓ(+eᵢ+eⱼ) − ℓ(+eᵢ−eⱼ) − ℓ(−eᵢ+eⱼ) + ℓ(−eᵢ−eⱼ)) / 4k²
//! ```
//!
//! with `h = eps` and `k = sqrt(eps)` from [`NumDiffConfig`].
//!
//! The wrapped model's own derivatives are never called, so `calc_diff` only
//! needs the wrapped model's `calc` and has no `calc`-first precondition.

use std::fmt;

use nalgebra::{DVector, Dim, Matrix, Storage};

use super::{ActionData, ActionDataCommon, ActionModel, ActionModelBase};
use crate::Real;
use crate::config::NumDiffConfig;
use crate::error::Result;

/// Action model with finite-difference derivatives.
#[derive(Debug, Clone)]
pub struct ActionModelNumDiff<M, T: Real = f64> {
    inner: M,
    base: ActionModelBase<T>,
    config: NumDiffConfig,
}

/// Perturbation buffers, sized once at creation.
#[derive(Debug, Clone)]
struct Scratch<T: Real> {
    /// Stacked tangent perturbation `(dx, du)`, length `ndx + nu`.
    dz: DVector<T>,
    dx: DVector<T>,
    xp: DVector<T>,
    up: DVector<T>,
    xnext0: DVector<T>,
    xnext_p: DVector<T>,
    xnext_m: DVector<T>,
    dxnext: DVector<T>,
}

/// Data for [`ActionModelNumDiff`].
#[derive(Debug, Clone)]
pub struct ActionDataNumDiff<T: Real, D> {
    /// Outputs and derivatives.
    pub common: ActionDataCommon<T>,
    /// Data of the wrapped model. Holds the nominal point after every call.
    pub inner: D,
    scratch: Scratch<T>,
}

impl<T: Real, D: ActionData<T>> ActionData<T> for ActionDataNumDiff<T, D> {
    fn common(&self) -> &ActionDataCommon<T> {
        &self.common
    }

    fn common_mut(&mut self) -> &mut ActionDataCommon<T> {
        &mut self.common
    }
}

impl<T: Real, M: ActionModel<T>> ActionModelNumDiff<M, T> {
    /// Wrap `model` with the default configuration.
    ///
    /// # Errors
    ///
    /// Propagates base construction errors.
    pub fn new(model: M) -> Result<Self> {
        Self::with_config(model, NumDiffConfig::default())
    }

    /// Wrap `model` with an explicit configuration.
    ///
    /// The wrapper has its own identity but keeps the control bounds of
    /// `model`.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::InvalidArgument`](crate::ActionError::InvalidArgument)
    /// if `config` fails [`NumDiffConfig::validate`].
    pub fn with_config(model: M, config: NumDiffConfig) -> Result<Self> {
        config.validate()?;
        let bounds = model.base();
        let mut base = ActionModelBase::new(bounds.state().clone(), bounds.nu())?;
        base.set_u_lb(bounds.u_lb().clone())?;
        base.set_u_ub(bounds.u_ub().clone())?;
        Ok(Self {
            inner: model,
            base,
            config,
        })
    }

    /// The wrapped model.
    #[must_use]
    pub fn model(&self) -> &M {
        &self.inner
    }

    /// Finite-difference configuration.
    #[must_use]
    pub fn config(&self) -> &NumDiffConfig {
        &self.config
    }

    /// Cost of the wrapped model at the point perturbed by `scratch.dz`.
    ///
    /// With `u == None` the terminal cost is evaluated and only the first
    /// `ndx` entries of `dz` are read.
    fn cost_at(
        &self,
        inner: &mut M::Data,
        s: &mut Scratch<T>,
        x: &DVector<T>,
        u: Option<&DVector<T>>,
    ) -> Result<T> {
        let ndx = self.base.ndx();
        s.dx.copy_from(&s.dz.rows(0, ndx));
        self.base.state().integrate(x, &s.dx, &mut s.xp)?;
        match u {
            Some(u) => {
                s.up.copy_from(u);
                s.up += s.dz.rows(ndx, u.len());
                self.inner.calc(inner, &s.xp, &s.up)?;
            }
            None => self.inner.calc_terminal(inner, &s.xp)?,
        }
        Ok(inner.common().cost)
    }

    fn differentiate(
        &self,
        data: &mut ActionDataNumDiff<T, M::Data>,
        x: &DVector<T>,
        u: Option<&DVector<T>>,
    ) -> Result<()> {
        let ndx = self.base.ndx();
        let nz = ndx + u.map_or(0, |u| u.len());
        let h: T = nalgebra::convert(self.config.eps);
        let k: T = nalgebra::convert(self.config.hessian_eps());
        let two: T = nalgebra::convert(2.0);
        let four: T = nalgebra::convert(4.0);
        let ActionDataNumDiff {
            common: d,
            inner,
            scratch: s,
        } = data;

        s.dz.fill(T::zero());
        let c0 = self.cost_at(inner, s, x, u)?;
        if u.is_some() {
            s.xnext0.copy_from(&inner.common().xnext);
        }

        // First order
        for i in 0..nz {
            s.dz[i] = h;
            let cp = self.cost_at(inner, s, x, u)?;
            if u.is_some() {
                s.xnext_p.copy_from(&inner.common().xnext);
            }
            let (cm, denom) = if self.config.centered {
                s.dz[i] = -h;
                let cm = self.cost_at(inner, s, x, u)?;
                if u.is_some() {
                    s.xnext_m.copy_from(&inner.common().xnext);
                }
                (cm, two * h)
            } else {
                s.xnext_m.copy_from(&s.xnext0);
                (c0, h)
            };
            s.dz[i] = T::zero();

            let grad = (cp - cm) / denom;
            if i < ndx {
                d.Lx[i] = grad;
            } else {
                d.Lu[i - ndx] = grad;
            }

            if u.is_some() {
                self.base
                    .state()
                    .diff(&s.xnext_m, &s.xnext_p, &mut s.dxnext)?;
                s.dxnext /= denom;
                if i < ndx {
                    d.Fx.set_column(i, &s.dxnext);
                } else {
                    d.Fu.set_column(i - ndx, &s.dxnext);
                }
            }
        }

        // Second order
        for i in 0..nz {
            for j in i..nz {
                let mut acc = T::zero();
                let (one, neg) = (T::one(), -T::one());
                for (si, sj, sign) in [(k, k, one), (k, -k, neg), (-k, k, neg), (-k, -k, one)] {
                    s.dz[i] += si;
                    s.dz[j] += sj;
                    acc += sign * self.cost_at(inner, s, x, u)?;
                    s.dz.fill(T::zero());
                }
                let hij = acc / (four * k * k);
                match (i < ndx, j < ndx) {
                    (true, true) => {
                        d.Lxx[(i, j)] = hij;
                        d.Lxx[(j, i)] = hij;
                    }
                    (true, false) => d.Lxu[(i, j - ndx)] = hij,
                    (false, false) => {
                        d.Luu[(i - ndx, j - ndx)] = hij;
                        d.Luu[(j - ndx, i - ndx)] = hij;
                    }
                    // j ≥ i, so j is never in the state block when i is not
                    (false, true) => {}
                }
            }
        }

        // Leave the wrapped data at the nominal point
        self.cost_at(inner, s, x, u)?;
        Ok(())
    }
}

impl<T: Real, M: ActionModel<T>> ActionModel<T> for ActionModelNumDiff<M, T> {
    type Data = ActionDataNumDiff<T, M::Data>;

    fn base(&self) -> &ActionModelBase<T> {
        &self.base
    }

    fn create_data(&self) -> Self::Data {
        let (nx, ndx, nu) = (self.base.nx(), self.base.ndx(), self.base.nu());
        ActionDataNumDiff {
            common: ActionDataCommon::new(&self.base),
            inner: self.inner.create_data(),
            scratch: Scratch {
                dz: DVector::zeros(ndx + nu),
                dx: DVector::zeros(ndx),
                xp: DVector::zeros(nx),
                up: DVector::zeros(nu),
                xnext0: DVector::zeros(nx),
                xnext_p: DVector::zeros(nx),
                xnext_m: DVector::zeros(nx),
                dxnext: DVector::zeros(ndx),
            },
        }
    }

    fn calc(&self, data: &mut Self::Data, x: &DVector<T>, u: &DVector<T>) -> Result<()> {
        self.inner.calc(&mut data.inner, x, u)?;
        let src = data.inner.common();
        data.common.xnext.copy_from(&src.xnext);
        data.common.cost = src.cost;
        Ok(())
    }

    fn calc_terminal(&self, data: &mut Self::Data, x: &DVector<T>) -> Result<()> {
        self.inner.calc_terminal(&mut data.inner, x)?;
        data.common.cost = data.inner.common().cost;
        Ok(())
    }

    fn calc_diff(&self, data: &mut Self::Data, x: &DVector<T>, u: &DVector<T>) -> Result<()> {
        self.base.check_xu(x, u)?;
        self.differentiate(data, x, Some(u))
    }

    fn calc_diff_terminal(&self, data: &mut Self::Data, x: &DVector<T>) -> Result<()> {
        self.base.check_x(x)?;
        self.differentiate(data, x, None)
    }
}

impl<T: Real, M: fmt::Display> fmt::Display for ActionModelNumDiff<M, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActionModelNumDiff {{{}}}", self.inner)
    }
}

/// Largest entry-wise relative error between `a` and `b`.
///
/// Each entry contributes `|a - b| / max(|a|, |b|, floor)`, so entries near
/// zero are compared absolutely against `floor`. Returns infinity when the
/// shapes differ.
pub fn max_relative_error<T, R, C, S1, S2>(
    a: &Matrix<T, R, C, S1>,
    b: &Matrix<T, R, C, S2>,
    floor: T,
) -> T
where
    T: Real,
    R: Dim,
    C: Dim,
    S1: Storage<T, R, C>,
    S2: Storage<T, R, C>,
{
    if a.shape() != b.shape() {
        return nalgebra::convert(f64::INFINITY);
    }
    a.iter().zip(b.iter()).fold(T::zero(), |worst, (&ai, &bi)| {
        let scale = ai.abs().max(bi.abs()).max(floor);
        worst.max((ai - bi).abs() / scale)
    })
}
