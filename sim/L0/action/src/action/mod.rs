//! Action models: one discrete step of dynamics plus stage cost.
//!
//! An [`ActionModel`] is the immutable description of the map
//! `(x, u) ↦ (xnext, cost)` and its derivatives. Evaluation writes into an
//! [`ActionData`] created by that same model:
//!
//! ```text
//! ┌──────────────────────────┐  create_data()  ┌──────────────────────────┐
//! │  ActionModel (shared)    │ ──────────────▶ │  ActionData (per node)   │
//! │  state, nu, parameters   │                 │  xnext, cost, Fx … Lxu   │
//! │  &self during evaluation │ ◀── calc ────── │  scratch buffers         │
//! └──────────────────────────┘   calc_diff     └──────────────────────────┘
//! ```
//!
//! # Evaluation protocol
//!
//! 1. `calc(data, x, u)` writes `xnext` and `cost`.
//! 2. `calc_diff(data, x, u)` writes `Fx`, `Fu`, `Lx`, `Lu`, `Lxx`, `Luu`,
//!    `Lxu`.
//!
//! Models whose derivatives depend on the evaluation point may read values
//! cached by step 1, so step 2 must follow a `calc` at the same `(x, u)` on
//! the same data. Models with constant derivatives document that they are
//! exempt. The protocol is a documented precondition; no state flag guards it.
//!
//! # Dispatch
//!
//! [`ActionModel`] has an associated `Data` type and is meant for static
//! dispatch. [`BoxedActionModel`] erases the concrete type so a horizon can
//! hold heterogeneous nodes.

pub mod lqr;
pub mod numdiff;
pub mod unicycle;

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use nalgebra::{DMatrix, DVector};

use crate::Real;
use crate::error::{ActionError, Result};
use crate::shape::{check_len, require_len, require_positive};
use crate::state::State;

// ============================================================================
// Model identity
// ============================================================================

/// Identity of a model instance, recorded in every data it creates.
///
/// Clones of a model keep the identity of the original, so data created by
/// either one passes the other's `check_data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelId(u64);

impl ModelId {
    /// Allocate a fresh identity.
    #[must_use]
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "model#{}", self.0)
    }
}

// ============================================================================
// Shared model fields
// ============================================================================

/// Fields every action model carries: state, control dimension, identity
/// and control bounds.
#[derive(Debug, Clone)]
pub struct ActionModelBase<T: Real = f64> {
    state: Arc<dyn State<T>>,
    nu: usize,
    id: ModelId,
    u_lb: DVector<T>,
    u_ub: DVector<T>,
    has_control_limits: bool,
}

impl<T: Real> ActionModelBase<T> {
    /// Create the shared fields for a model over `state` with `nu` controls.
    ///
    /// Control bounds start at ±∞.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::InvalidArgument`] if `nu` is zero.
    pub fn new(state: Arc<dyn State<T>>, nu: usize) -> Result<Self> {
        require_positive("nu", nu)?;
        let inf: T = nalgebra::convert(f64::INFINITY);
        Ok(Self {
            state,
            nu,
            id: ModelId::next(),
            u_lb: DVector::from_element(nu, -inf),
            u_ub: DVector::from_element(nu, inf),
            has_control_limits: false,
        })
    }

    /// State representation.
    #[must_use]
    pub fn state(&self) -> &Arc<dyn State<T>> {
        &self.state
    }

    /// State dimension.
    #[must_use]
    pub fn nx(&self) -> usize {
        self.state.nx()
    }

    /// Tangent dimension.
    #[must_use]
    pub fn ndx(&self) -> usize {
        self.state.ndx()
    }

    /// Control dimension.
    #[must_use]
    pub fn nu(&self) -> usize {
        self.nu
    }

    /// Identity recorded in data created by this model.
    #[must_use]
    pub fn id(&self) -> ModelId {
        self.id
    }

    /// Lower control bound.
    #[must_use]
    pub fn u_lb(&self) -> &DVector<T> {
        &self.u_lb
    }

    /// Upper control bound.
    #[must_use]
    pub fn u_ub(&self) -> &DVector<T> {
        &self.u_ub
    }

    /// True once both bounds are finite in every component.
    #[must_use]
    pub fn has_control_limits(&self) -> bool {
        self.has_control_limits
    }

    /// Set the lower control bound.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::DimensionMismatch`] unless `u_lb` has length `nu`.
    pub fn set_u_lb(&mut self, u_lb: DVector<T>) -> Result<()> {
        require_len("u_lb", &u_lb, self.nu)?;
        self.u_lb = u_lb;
        self.update_has_control_limits();
        Ok(())
    }

    /// Set the upper control bound.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::DimensionMismatch`] unless `u_ub` has length `nu`.
    pub fn set_u_ub(&mut self, u_ub: DVector<T>) -> Result<()> {
        require_len("u_ub", &u_ub, self.nu)?;
        self.u_ub = u_ub;
        self.update_has_control_limits();
        Ok(())
    }

    fn update_has_control_limits(&mut self) {
        let finite = |v: &DVector<T>| v.iter().all(|b| b.is_finite());
        self.has_control_limits = finite(&self.u_lb) && finite(&self.u_ub);
    }

    /// Hot-path check of a state/control pair.
    #[inline]
    pub(crate) fn check_xu(&self, x: &DVector<T>, u: &DVector<T>) -> Result<()> {
        check_len("x", x, self.nx())?;
        check_len("u", u, self.nu)
    }

    /// Hot-path check of a terminal state.
    #[inline]
    pub(crate) fn check_x(&self, x: &DVector<T>) -> Result<()> {
        check_len("x", x, self.nx())
    }
}

// ============================================================================
// Shared data fields
// ============================================================================

/// Fields every action data carries: outputs and derivatives.
///
/// Variant-specific data embeds this struct and adds its own scratch.
#[derive(Debug, Clone)]
#[allow(non_snake_case)] // Fx, Lxu, … follow optimal-control notation
pub struct ActionDataCommon<T: Real = f64> {
    model: ModelId,
    /// Stage or terminal cost.
    pub cost: T,
    /// Next state (length `nx`).
    pub xnext: DVector<T>,
    /// Dynamics Jacobian w.r.t. the state (`ndx × ndx`).
    pub Fx: DMatrix<T>,
    /// Dynamics Jacobian w.r.t. the control (`ndx × nu`).
    pub Fu: DMatrix<T>,
    /// Cost gradient w.r.t. the state (length `ndx`).
    pub Lx: DVector<T>,
    /// Cost gradient w.r.t. the control (length `nu`).
    pub Lu: DVector<T>,
    /// Cost Hessian w.r.t. the state (`ndx × ndx`).
    pub Lxx: DMatrix<T>,
    /// Cost Hessian w.r.t. the control (`nu × nu`).
    pub Luu: DMatrix<T>,
    /// Mixed cost Hessian (`ndx × nu`).
    pub Lxu: DMatrix<T>,
}

impl<T: Real> ActionDataCommon<T> {
    /// Zero-filled fields sized for `base` and bound to its model.
    #[must_use]
    pub fn new(base: &ActionModelBase<T>) -> Self {
        let (nx, ndx, nu) = (base.nx(), base.ndx(), base.nu());
        Self {
            model: base.id(),
            cost: nalgebra::zero(),
            xnext: DVector::zeros(nx),
            Fx: DMatrix::zeros(ndx, ndx),
            Fu: DMatrix::zeros(ndx, nu),
            Lx: DVector::zeros(ndx),
            Lu: DVector::zeros(nu),
            Lxx: DMatrix::zeros(ndx, ndx),
            Luu: DMatrix::zeros(nu, nu),
            Lxu: DMatrix::zeros(ndx, nu),
        }
    }

    /// Identity of the model that created this data.
    #[must_use]
    pub fn model_id(&self) -> ModelId {
        self.model
    }
}

/// Upcast to [`Any`], implemented for every `'static` type.
pub trait AsAny: Any {
    /// Borrow as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
    /// Borrow as `&mut dyn Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<D: Any> AsAny for D {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Mutable evaluation cache bound to one action model.
pub trait ActionData<T: Real = f64>: AsAny + fmt::Debug + Send {
    /// Shared output and derivative fields.
    fn common(&self) -> &ActionDataCommon<T>;

    /// Mutable access to the shared fields.
    fn common_mut(&mut self) -> &mut ActionDataCommon<T>;
}

impl<T: Real> ActionData<T> for ActionDataCommon<T> {
    fn common(&self) -> &ActionDataCommon<T> {
        self
    }

    fn common_mut(&mut self) -> &mut ActionDataCommon<T> {
        self
    }
}

// ============================================================================
// Model trait
// ============================================================================

/// Dynamics and cost of one discrete timestep, with derivatives.
///
/// Implementations never mutate `self` during evaluation, so a model can be
/// shared across threads while each thread owns its data.
///
/// # Errors
///
/// The evaluation methods return [`ActionError::DimensionMismatch`] when `x`
/// or `u` has the wrong length (unless built with the `unchecked` feature).
pub trait ActionModel<T: Real = f64>: Send + Sync {
    /// Data type created and consumed by this model.
    type Data: ActionData<T>;

    /// Shared model fields.
    fn base(&self) -> &ActionModelBase<T>;

    /// Allocate data sized for this model, with constant blocks pre-filled.
    fn create_data(&self) -> Self::Data;

    /// Compute the next state and the stage cost.
    fn calc(&self, data: &mut Self::Data, x: &DVector<T>, u: &DVector<T>) -> Result<()>;

    /// Compute the terminal cost. Dynamics are not evaluated.
    fn calc_terminal(&self, data: &mut Self::Data, x: &DVector<T>) -> Result<()>;

    /// Compute the derivatives of the dynamics and the stage cost.
    fn calc_diff(&self, data: &mut Self::Data, x: &DVector<T>, u: &DVector<T>) -> Result<()>;

    /// Compute the derivatives of the terminal cost.
    fn calc_diff_terminal(&self, data: &mut Self::Data, x: &DVector<T>) -> Result<()>;

    /// Whether `data` was created by this model.
    ///
    /// Advisory; evaluation methods never call it.
    fn check_data(&self, data: &Self::Data) -> bool {
        data.common().model_id() == self.id()
    }

    /// State representation.
    fn state(&self) -> &Arc<dyn State<T>> {
        self.base().state()
    }

    /// State dimension.
    fn nx(&self) -> usize {
        self.base().nx()
    }

    /// Tangent dimension.
    fn ndx(&self) -> usize {
        self.base().ndx()
    }

    /// Control dimension.
    fn nu(&self) -> usize {
        self.base().nu()
    }

    /// Model identity.
    fn id(&self) -> ModelId {
        self.base().id()
    }
}

// ============================================================================
// Dynamic dispatch
// ============================================================================

/// Object-safe mirror of [`ActionModel`] over boxed data.
///
/// Method names differ from [`ActionModel`] so both traits can be in scope.
trait ErasedActionModel<T: Real>: Send + Sync {
    fn erased_base(&self) -> &ActionModelBase<T>;
    fn create_boxed(&self) -> Box<dyn ActionData<T>>;
    fn calc_boxed(&self, data: &mut dyn ActionData<T>, x: &DVector<T>, u: &DVector<T>)
    -> Result<()>;
    fn calc_terminal_boxed(&self, data: &mut dyn ActionData<T>, x: &DVector<T>) -> Result<()>;
    fn calc_diff_boxed(
        &self,
        data: &mut dyn ActionData<T>,
        x: &DVector<T>,
        u: &DVector<T>,
    ) -> Result<()>;
    fn calc_diff_terminal_boxed(&self, data: &mut dyn ActionData<T>, x: &DVector<T>)
    -> Result<()>;
    fn check_boxed(&self, data: &dyn ActionData<T>) -> bool;
    fn describe(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

fn downcast<T: Real, M: ActionModel<T>>(data: &mut dyn ActionData<T>) -> Result<&mut M::Data> {
    data.as_any_mut().downcast_mut::<M::Data>().ok_or_else(|| {
        tracing::warn!("boxed action model received data of a different type");
        ActionError::DataMismatch
    })
}

impl<T, M> ErasedActionModel<T> for M
where
    T: Real,
    M: ActionModel<T> + fmt::Display,
{
    fn erased_base(&self) -> &ActionModelBase<T> {
        ActionModel::base(self)
    }

    fn create_boxed(&self) -> Box<dyn ActionData<T>> {
        Box::new(ActionModel::create_data(self))
    }

    fn calc_boxed(
        &self,
        data: &mut dyn ActionData<T>,
        x: &DVector<T>,
        u: &DVector<T>,
    ) -> Result<()> {
        ActionModel::calc(self, downcast::<T, M>(data)?, x, u)
    }

    fn calc_terminal_boxed(&self, data: &mut dyn ActionData<T>, x: &DVector<T>) -> Result<()> {
        ActionModel::calc_terminal(self, downcast::<T, M>(data)?, x)
    }

    fn calc_diff_boxed(
        &self,
        data: &mut dyn ActionData<T>,
        x: &DVector<T>,
        u: &DVector<T>,
    ) -> Result<()> {
        ActionModel::calc_diff(self, downcast::<T, M>(data)?, x, u)
    }

    fn calc_diff_terminal_boxed(
        &self,
        data: &mut dyn ActionData<T>,
        x: &DVector<T>,
    ) -> Result<()> {
        ActionModel::calc_diff_terminal(self, downcast::<T, M>(data)?, x)
    }

    fn check_boxed(&self, data: &dyn ActionData<T>) -> bool {
        data.as_any()
            .downcast_ref::<M::Data>()
            .is_some_and(|d| ActionModel::check_data(self, d))
    }

    fn describe(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Type-erased, shareable action model.
///
/// Wraps any [`ActionModel`] so a solver can hold different model types in
/// one horizon. Data is boxed; handing a box created by a model of another
/// type returns [`ActionError::DataMismatch`].
///
/// Cloning is cheap: clones share the same model.
#[derive(Clone)]
pub struct BoxedActionModel<T: Real = f64> {
    inner: Arc<dyn ErasedActionModel<T>>,
}

impl<T: Real> BoxedActionModel<T> {
    /// Erase a concrete model.
    #[must_use]
    pub fn new<M>(model: M) -> Self
    where
        M: ActionModel<T> + fmt::Display + 'static,
    {
        Self {
            inner: Arc::new(model),
        }
    }

    /// Shared model fields.
    #[must_use]
    pub fn base(&self) -> &ActionModelBase<T> {
        self.inner.erased_base()
    }

    /// State representation.
    #[must_use]
    pub fn state(&self) -> &Arc<dyn State<T>> {
        self.inner.erased_base().state()
    }

    /// State dimension.
    #[must_use]
    pub fn nx(&self) -> usize {
        self.inner.erased_base().nx()
    }

    /// Control dimension.
    #[must_use]
    pub fn nu(&self) -> usize {
        self.inner.erased_base().nu()
    }

    /// See [`ActionModel::create_data`].
    #[must_use]
    pub fn create_data(&self) -> Box<dyn ActionData<T>> {
        self.inner.create_boxed()
    }

    /// See [`ActionModel::calc`].
    ///
    /// # Errors
    ///
    /// [`ActionError::DataMismatch`] for foreign data, otherwise as the
    /// wrapped model.
    pub fn calc(&self, data: &mut dyn ActionData<T>, x: &DVector<T>, u: &DVector<T>) -> Result<()> {
        self.inner.calc_boxed(data, x, u)
    }

    /// See [`ActionModel::calc_terminal`].
    ///
    /// # Errors
    ///
    /// As [`calc`](Self::calc).
    pub fn calc_terminal(&self, data: &mut dyn ActionData<T>, x: &DVector<T>) -> Result<()> {
        self.inner.calc_terminal_boxed(data, x)
    }

    /// See [`ActionModel::calc_diff`].
    ///
    /// # Errors
    ///
    /// As [`calc`](Self::calc).
    pub fn calc_diff(
        &self,
        data: &mut dyn ActionData<T>,
        x: &DVector<T>,
        u: &DVector<T>,
    ) -> Result<()> {
        self.inner.calc_diff_boxed(data, x, u)
    }

    /// See [`ActionModel::calc_diff_terminal`].
    ///
    /// # Errors
    ///
    /// As [`calc`](Self::calc).
    pub fn calc_diff_terminal(&self, data: &mut dyn ActionData<T>, x: &DVector<T>) -> Result<()> {
        self.inner.calc_diff_terminal_boxed(data, x)
    }

    /// See [`ActionModel::check_data`].
    #[must_use]
    pub fn check_data(&self, data: &dyn ActionData<T>) -> bool {
        self.inner.check_boxed(data)
    }
}

impl<T: Real> fmt::Display for BoxedActionModel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.describe(f)
    }
}

impl<T: Real> fmt::Debug for BoxedActionModel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxedActionModel")
            .field("model", &format_args!("{self}"))
            .finish()
    }
}
