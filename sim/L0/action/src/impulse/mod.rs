//! Impulse models: instantaneous contact events.
//!
//! An impulse makes the generalized velocity jump at an instant, with no
//! time elapsing. An [`ImpulseModel`] describes one such contact with `ni`
//! constrained directions; its [`ImpulseData`] holds the contact Jacobian,
//! the impulse, the post-impact velocity and their sensitivities.
//!
//! ```text
//!   dynamics engine buffer (external, &'a K)
//!          │  frame Jacobians, velocity partials
//!          ▼
//!   ImpulseModel::calc / calc_diff ──▶ Jc, dv0_dq
//!   solver ── update_velocity ──────▶ vnext, dvnext_dx
//!          ── update_force ─────────▶ f, df_dq
//! ```
//!
//! Impulse data borrows the engine buffer for its whole lifetime and never
//! owns it, so the buffer cannot be written while the data exists.
//!
//! `calc_diff` reads values that `calc` placed in the engine buffer and in
//! the data, so it must follow a `calc` at the same state.

pub mod frame;

use std::fmt;
use std::sync::Arc;

use nalgebra::{DMatrix, DVector};

use crate::Real;
use crate::action::ModelId;
use crate::error::Result;
use crate::shape::{check_len, check_shape, require_positive};
use crate::state::State;

/// Index of a frame in the dynamics engine's kinematic tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(usize);

impl FrameId {
    /// Wrap a raw frame index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Raw frame index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fields every impulse model carries: state, impulse dimension, identity.
#[derive(Debug, Clone)]
pub struct ImpulseModelBase<T: Real = f64> {
    state: Arc<dyn State<T>>,
    ni: usize,
    id: ModelId,
}

impl<T: Real> ImpulseModelBase<T> {
    /// Create the shared fields for an impulse of dimension `ni` over `state`.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::InvalidArgument`](crate::ActionError::InvalidArgument)
    /// if `ni` is zero.
    pub fn new(state: Arc<dyn State<T>>, ni: usize) -> Result<Self> {
        require_positive("ni", ni)?;
        Ok(Self {
            state,
            ni,
            id: ModelId::next(),
        })
    }

    /// State representation.
    #[must_use]
    pub fn state(&self) -> &Arc<dyn State<T>> {
        &self.state
    }

    /// Impulse dimension. Fixed for the lifetime of the model.
    #[must_use]
    pub fn ni(&self) -> usize {
        self.ni
    }

    /// Velocity dimension of the state.
    #[must_use]
    pub fn nv(&self) -> usize {
        self.state.nv()
    }

    /// Tangent dimension of the state.
    #[must_use]
    pub fn ndx(&self) -> usize {
        self.state.ndx()
    }

    /// Identity recorded in data created by this model.
    #[must_use]
    pub fn id(&self) -> ModelId {
        self.id
    }
}

/// Evaluation cache of an impulse model, bound to a dynamics-engine buffer.
#[allow(non_snake_case)] // Jc follows contact-dynamics notation
pub struct ImpulseData<'a, T: Real, K: ?Sized> {
    model: ModelId,
    engine: &'a K,
    /// Contact Jacobian (`ni × nv`).
    pub Jc: DMatrix<T>,
    /// Partial of the contact velocity w.r.t. the configuration (`ni × nv`).
    pub dv0_dq: DMatrix<T>,
    /// Contact impulse (length `ni`).
    pub f: DVector<T>,
    /// Post-impact generalized velocity (length `nv`).
    pub vnext: DVector<T>,
    /// Jacobian of `vnext` w.r.t. the state (`nv × ndx`).
    pub dvnext_dx: DMatrix<T>,
    /// Jacobian of the impulse w.r.t. the configuration (`ni × nv`).
    pub df_dq: DMatrix<T>,
}

impl<'a, T: Real, K: ?Sized> ImpulseData<'a, T, K> {
    /// Zero-filled data sized for `base`, bound to its model and to `engine`.
    #[must_use]
    pub fn new(base: &ImpulseModelBase<T>, engine: &'a K) -> Self {
        let (ni, nv, ndx) = (base.ni(), base.nv(), base.ndx());
        Self {
            model: base.id(),
            engine,
            Jc: DMatrix::zeros(ni, nv),
            dv0_dq: DMatrix::zeros(ni, nv),
            f: DVector::zeros(ni),
            vnext: DVector::zeros(nv),
            dvnext_dx: DMatrix::zeros(nv, ndx),
            df_dq: DMatrix::zeros(ni, nv),
        }
    }

    /// The dynamics-engine buffer this data reads from.
    #[must_use]
    pub fn engine(&self) -> &'a K {
        self.engine
    }

    /// Identity of the model that created this data.
    #[must_use]
    pub fn model_id(&self) -> ModelId {
        self.model
    }
}

impl<T: Real, K: ?Sized> fmt::Debug for ImpulseData<'_, T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImpulseData")
            .field("model", &self.model)
            .field("Jc", &self.Jc)
            .field("dv0_dq", &self.dv0_dq)
            .field("f", &self.f)
            .field("vnext", &self.vnext)
            .field("dvnext_dx", &self.dvnext_dx)
            .field("df_dq", &self.df_dq)
            .finish_non_exhaustive()
    }
}

/// Instantaneous contact with `ni` constrained directions.
///
/// # Errors
///
/// `calc`, `calc_diff` and the `update_*` methods return
/// [`ActionError::DimensionMismatch`](crate::ActionError::DimensionMismatch)
/// on a wrong-sized argument and leave the data untouched (unless built
/// with the `unchecked` feature).
pub trait ImpulseModel<T: Real = f64>: Send + Sync {
    /// Dynamics-engine buffer the data borrows.
    type Kinematics: ?Sized;

    /// Shared model fields.
    fn base(&self) -> &ImpulseModelBase<T>;

    /// Fill the contact Jacobian `Jc` for state `x`.
    fn calc(&self, data: &mut ImpulseData<'_, T, Self::Kinematics>, x: &DVector<T>) -> Result<()>;

    /// Fill `dv0_dq` for state `x`. Requires a preceding `calc`.
    fn calc_diff(
        &self,
        data: &mut ImpulseData<'_, T, Self::Kinematics>,
        x: &DVector<T>,
    ) -> Result<()>;

    /// Allocate data bound to this model and to `engine`.
    fn create_data<'a>(&self, engine: &'a Self::Kinematics) -> ImpulseData<'a, T, Self::Kinematics> {
        ImpulseData::new(self.base(), engine)
    }

    /// Store the post-impact velocity (length `nv`).
    fn update_velocity(
        &self,
        data: &mut ImpulseData<'_, T, Self::Kinematics>,
        vnext: &DVector<T>,
    ) -> Result<()> {
        check_len("vnext", vnext, self.base().nv())?;
        data.vnext.copy_from(vnext);
        Ok(())
    }

    /// Store the post-impact velocity Jacobian (`nv × ndx`).
    fn update_velocity_diff(
        &self,
        data: &mut ImpulseData<'_, T, Self::Kinematics>,
        dvnext_dx: &DMatrix<T>,
    ) -> Result<()> {
        let base = self.base();
        check_shape("dvnext_dx", dvnext_dx, base.nv(), base.ndx())?;
        data.dvnext_dx.copy_from(dvnext_dx);
        Ok(())
    }

    /// Store the contact impulse (length `ni`).
    fn update_force(
        &self,
        data: &mut ImpulseData<'_, T, Self::Kinematics>,
        force: &DVector<T>,
    ) -> Result<()> {
        check_len("force", force, self.base().ni())?;
        data.f.copy_from(force);
        Ok(())
    }

    /// Store the impulse Jacobian (`ni × nv`).
    fn update_force_diff(
        &self,
        data: &mut ImpulseData<'_, T, Self::Kinematics>,
        df_dq: &DMatrix<T>,
    ) -> Result<()> {
        let base = self.base();
        check_shape("df_dq", df_dq, base.ni(), base.nv())?;
        data.df_dq.copy_from(df_dq);
        Ok(())
    }

    /// Whether `data` was created by this model. Advisory.
    fn check_data(&self, data: &ImpulseData<'_, T, Self::Kinematics>) -> bool {
        data.model_id() == self.base().id()
    }

    /// State representation.
    fn state(&self) -> &Arc<dyn State<T>> {
        self.base().state()
    }

    /// Impulse dimension.
    fn ni(&self) -> usize {
        self.base().ni()
    }
}
