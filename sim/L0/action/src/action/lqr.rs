//! Linear-quadratic action model.
//!
//! ```text
//! xnext   = A·x + B·u + f
//! ℓ(x, u) = ½xᵀQx + ½uᵀRu + xᵀNu + qᵀx + rᵀu
//! ℓ(x)    = ½xᵀQx + qᵀx                         (terminal)
//! ```
//!
//! so that
//!
//! ```text
//! Fx = A    Fu = B
//! Lx = q + Qx + Nu    Lu = r + Ru + Nᵀx
//! Lxx = Q   Luu = R   Lxu = N
//! ```
//!
//! `Q` and `R` must be symmetric. `set_lxx`, `set_luu` and `from_matrices`
//! reject anything else with [`ActionError::InvalidArgument`].
//!
//! The Jacobians and Hessians do not depend on `(x, u)`. They are copied into
//! the data once, by [`create_data`](ActionModel::create_data), and
//! `calc_diff` only refreshes the gradients. Setters called afterwards do
//! not reach data that already exists.
//!
//! Accessors use the derivative names of the blocks they fill:
//! `fx` is `A`, `fu` is `B`, `f0` is `f`, `lx` is `q`, `lu` is `r`,
//! `lxx` is `Q`, `luu` is `R`, `lxu` is `N`.

use std::fmt;
use std::sync::Arc;

use nalgebra::{DMatrix, DVector};
use rand::Rng;

use super::{ActionData, ActionDataCommon, ActionModel, ActionModelBase};
use crate::Real;
use crate::error::{ActionError, Result};
use crate::shape::{require_len, require_positive, require_shape, require_symmetric};
use crate::state::StateVector;

/// Linear dynamics with quadratic cost.
#[derive(Debug, Clone)]
pub struct ActionModelLqr<T: Real = f64> {
    base: ActionModelBase<T>,
    drift_free: bool,
    a: DMatrix<T>,
    b: DMatrix<T>,
    f: DVector<T>,
    q_mat: DMatrix<T>,
    r_mat: DMatrix<T>,
    n_mat: DMatrix<T>,
    q_vec: DVector<T>,
    r_vec: DVector<T>,
}

/// Data for [`ActionModelLqr`].
#[derive(Debug, Clone)]
pub struct ActionDataLqr<T: Real = f64> {
    /// Outputs and derivatives.
    pub common: ActionDataCommon<T>,
    /// `½Ru` scratch (length `nu`).
    ru_tmp: DVector<T>,
    /// `½Qx + Nu` scratch (length `ndx`).
    qx_tmp: DVector<T>,
}

impl<T: Real> ActionData<T> for ActionDataLqr<T> {
    fn common(&self) -> &ActionDataCommon<T> {
        &self.common
    }

    fn common_mut(&mut self) -> &mut ActionDataCommon<T> {
        &mut self.common
    }
}

impl<T: Real> ActionModelLqr<T> {
    /// Create an `nx`-state, `nu`-control model with unit parameters.
    ///
    /// `A = I`, `B = I` (`nx × nu`), `Q = I`, `R = I`, `N = 0`, `q = 1`,
    /// `r = 1`, and `f = 1` unless `drift_free`, in which case `f = 0`.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::InvalidArgument`] if `nx` or `nu` is zero.
    pub fn new(nx: usize, nu: usize, drift_free: bool) -> Result<Self> {
        require_positive("nx", nx)?;
        require_positive("nu", nu)?;
        let one: T = nalgebra::one();
        let f = if drift_free {
            DVector::zeros(nx)
        } else {
            DVector::from_element(nx, one)
        };
        let model = Self {
            base: ActionModelBase::new(Arc::new(StateVector::<T>::new(nx)?), nu)?,
            drift_free,
            a: DMatrix::identity(nx, nx),
            b: DMatrix::identity(nx, nu),
            f,
            q_mat: DMatrix::identity(nx, nx),
            r_mat: DMatrix::identity(nu, nu),
            n_mat: DMatrix::zeros(nx, nu),
            q_vec: DVector::from_element(nx, one),
            r_vec: DVector::from_element(nu, one),
        };
        tracing::debug!(nx, nu, drift_free, "created LQR action model");
        Ok(model)
    }

    /// Create a drift-free model from its matrices, with zero linear cost terms.
    ///
    /// Dimensions are taken from `b` (`nx × nu`); every other matrix must
    /// agree with them.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::InvalidArgument`] if any shape is inconsistent,
    /// a dimension is zero, or `Q` or `R` is not symmetric.
    pub fn from_matrices(
        a: DMatrix<T>,
        b: DMatrix<T>,
        q: DMatrix<T>,
        r: DMatrix<T>,
        n: DMatrix<T>,
    ) -> Result<Self> {
        let (nx, nu) = b.shape();
        require_positive("nx", nx)?;
        require_positive("nu", nu)?;
        for (what, m, rows, cols) in [
            ("A", &a, nx, nx),
            ("Q", &q, nx, nx),
            ("R", &r, nu, nu),
            ("N", &n, nx, nu),
        ] {
            require_shape(what, m, rows, cols)
                .map_err(|e| ActionError::invalid_argument(e.to_string()))?;
        }
        require_symmetric("Q", &q)?;
        require_symmetric("R", &r)?;
        Ok(Self {
            base: ActionModelBase::new(Arc::new(StateVector::<T>::new(nx)?), nu)?,
            drift_free: true,
            a,
            b,
            f: DVector::zeros(nx),
            q_mat: q,
            r_mat: r,
            n_mat: n,
            q_vec: DVector::zeros(nx),
            r_vec: DVector::zeros(nu),
        })
    }

    /// Add the drift `f` and the linear cost terms `q`, `r`.
    ///
    /// The model is drift-free afterwards only if `f` is zero.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::InvalidArgument`] if a length disagrees with
    /// the model's dimensions.
    pub fn with_affine_terms(mut self, f: DVector<T>, q: DVector<T>, r: DVector<T>) -> Result<Self> {
        let (nx, nu) = (self.base.nx(), self.base.nu());
        for (what, v, len) in [("f", &f, nx), ("q", &q, nx), ("r", &r, nu)] {
            require_len(what, v, len).map_err(|e| ActionError::invalid_argument(e.to_string()))?;
        }
        self.drift_free = f.iter().all(|v| v.is_zero());
        self.f = f;
        self.q_vec = q;
        self.r_vec = r;
        Ok(self)
    }

    /// Create a random drift-free model.
    ///
    /// Entries of `A`, `B` and `N` are uniform in `[-1, 1)` (`N` scaled by
    /// 0.1); `Q` and `R` are `LLᵀ + I` for a random `L`, hence positive
    /// definite. Linear terms are uniform in `[-1, 1)`.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::InvalidArgument`] if `nx` or `nu` is zero.
    pub fn random<R: Rng + ?Sized>(nx: usize, nu: usize, rng: &mut R) -> Result<Self> {
        require_positive("nx", nx)?;
        require_positive("nu", nu)?;
        let mut uniform = |scale: f64| -> T { nalgebra::convert(scale * rng.gen_range(-1.0..1.0)) };
        let a = DMatrix::from_fn(nx, nx, |_, _| uniform(1.0));
        let b = DMatrix::from_fn(nx, nu, |_, _| uniform(1.0));
        let lq = DMatrix::from_fn(nx, nx, |_, _| uniform(1.0));
        let lr = DMatrix::from_fn(nu, nu, |_, _| uniform(1.0));
        let n = DMatrix::from_fn(nx, nu, |_, _| uniform(0.1));
        let q = DVector::from_fn(nx, |_, _| uniform(1.0));
        let r = DVector::from_fn(nu, |_, _| uniform(1.0));

        let q_mat = &lq * lq.transpose() + DMatrix::identity(nx, nx);
        let r_mat = &lr * lr.transpose() + DMatrix::identity(nu, nu);
        Self::from_matrices(a, b, q_mat, r_mat, n)?.with_affine_terms(DVector::zeros(nx), q, r)
    }

    /// Whether the drift term is forced to zero.
    #[must_use]
    pub fn drift_free(&self) -> bool {
        self.drift_free
    }

    /// State matrix `A` (`nx × nx`).
    #[must_use]
    pub fn fx(&self) -> &DMatrix<T> {
        &self.a
    }

    /// Control matrix `B` (`nx × nu`).
    #[must_use]
    pub fn fu(&self) -> &DMatrix<T> {
        &self.b
    }

    /// Drift `f` (length `nx`).
    #[must_use]
    pub fn f0(&self) -> &DVector<T> {
        &self.f
    }

    /// Linear state cost `q` (length `nx`).
    #[must_use]
    pub fn lx(&self) -> &DVector<T> {
        &self.q_vec
    }

    /// Linear control cost `r` (length `nu`).
    #[must_use]
    pub fn lu(&self) -> &DVector<T> {
        &self.r_vec
    }

    /// State weight `Q` (`nx × nx`).
    #[must_use]
    pub fn lxx(&self) -> &DMatrix<T> {
        &self.q_mat
    }

    /// Control weight `R` (`nu × nu`).
    #[must_use]
    pub fn luu(&self) -> &DMatrix<T> {
        &self.r_mat
    }

    /// Cross weight `N` (`nx × nu`).
    #[must_use]
    pub fn lxu(&self) -> &DMatrix<T> {
        &self.n_mat
    }

    /// Set `A`.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::DimensionMismatch`] unless `fx` is `nx × nx`.
    pub fn set_fx(&mut self, fx: DMatrix<T>) -> Result<()> {
        let nx = self.base.nx();
        require_shape("Fx", &fx, nx, nx)?;
        self.a = fx;
        Ok(())
    }

    /// Set `B`.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::DimensionMismatch`] unless `fu` is `nx × nu`.
    pub fn set_fu(&mut self, fu: DMatrix<T>) -> Result<()> {
        require_shape("Fu", &fu, self.base.nx(), self.base.nu())?;
        self.b = fu;
        Ok(())
    }

    /// Set `f`.
    ///
    /// A non-zero drift clears the drift-free flag; a zero drift sets it.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::DimensionMismatch`] unless `f0` has length `nx`.
    pub fn set_f0(&mut self, f0: DVector<T>) -> Result<()> {
        require_len("f0", &f0, self.base.nx())?;
        let drift_free = f0.iter().all(|v| v.is_zero());
        if self.drift_free && !drift_free {
            tracing::warn!("non-zero drift set on a drift-free LQR model; clearing drift_free");
        }
        self.drift_free = drift_free;
        self.f = f0;
        Ok(())
    }

    /// Set `q`.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::DimensionMismatch`] unless `lx` has length `nx`.
    pub fn set_lx(&mut self, lx: DVector<T>) -> Result<()> {
        require_len("lx", &lx, self.base.nx())?;
        self.q_vec = lx;
        Ok(())
    }

    /// Set `r`.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::DimensionMismatch`] unless `lu` has length `nu`.
    pub fn set_lu(&mut self, lu: DVector<T>) -> Result<()> {
        require_len("lu", &lu, self.base.nu())?;
        self.r_vec = lu;
        Ok(())
    }

    /// Set `Q`.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::DimensionMismatch`] unless `lxx` is `nx × nx`,
    /// and [`ActionError::InvalidArgument`] if it is not symmetric.
    pub fn set_lxx(&mut self, lxx: DMatrix<T>) -> Result<()> {
        let nx = self.base.nx();
        require_shape("Lxx", &lxx, nx, nx)?;
        require_symmetric("Lxx", &lxx)?;
        self.q_mat = lxx;
        Ok(())
    }

    /// Set `R`.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::DimensionMismatch`] unless `luu` is `nu × nu`,
    /// and [`ActionError::InvalidArgument`] if it is not symmetric.
    pub fn set_luu(&mut self, luu: DMatrix<T>) -> Result<()> {
        let nu = self.base.nu();
        require_shape("Luu", &luu, nu, nu)?;
        require_symmetric("Luu", &luu)?;
        self.r_mat = luu;
        Ok(())
    }

    /// Set `N`.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::DimensionMismatch`] unless `lxu` is `nx × nu`.
    pub fn set_lxu(&mut self, lxu: DMatrix<T>) -> Result<()> {
        require_shape("Lxu", &lxu, self.base.nx(), self.base.nu())?;
        self.n_mat = lxu;
        Ok(())
    }

    /// Control bounds live on the shared base.
    pub fn base_mut(&mut self) -> &mut ActionModelBase<T> {
        &mut self.base
    }
}

impl<T: Real> ActionModel<T> for ActionModelLqr<T> {
    type Data = ActionDataLqr<T>;

    fn base(&self) -> &ActionModelBase<T> {
        &self.base
    }

    fn create_data(&self) -> ActionDataLqr<T> {
        let mut common = ActionDataCommon::new(&self.base);
        common.Fx.copy_from(&self.a);
        common.Fu.copy_from(&self.b);
        common.Lxx.copy_from(&self.q_mat);
        common.Luu.copy_from(&self.r_mat);
        common.Lxu.copy_from(&self.n_mat);
        ActionDataLqr {
            common,
            ru_tmp: DVector::zeros(self.base.nu()),
            qx_tmp: DVector::zeros(self.base.ndx()),
        }
    }

    fn calc(&self, data: &mut ActionDataLqr<T>, x: &DVector<T>, u: &DVector<T>) -> Result<()> {
        self.base.check_xu(x, u)?;
        let one: T = nalgebra::one();
        let half: T = nalgebra::convert(0.5);
        let d = &mut data.common;

        d.xnext.copy_from(&self.f);
        d.xnext.gemv(one, &self.a, x, one);
        d.xnext.gemv(one, &self.b, u, one);

        // ½xᵀQx + xᵀNu = xᵀ(½Qx + Nu)
        data.qx_tmp.gemv(half, &self.q_mat, x, T::zero());
        data.qx_tmp.gemv(one, &self.n_mat, u, one);
        data.ru_tmp.gemv(half, &self.r_mat, u, T::zero());
        d.cost = x.dot(&data.qx_tmp) + u.dot(&data.ru_tmp) + self.q_vec.dot(x) + self.r_vec.dot(u);
        Ok(())
    }

    fn calc_terminal(&self, data: &mut ActionDataLqr<T>, x: &DVector<T>) -> Result<()> {
        self.base.check_x(x)?;
        let half: T = nalgebra::convert(0.5);
        data.qx_tmp.gemv(half, &self.q_mat, x, T::zero());
        data.common.cost = x.dot(&data.qx_tmp) + self.q_vec.dot(x);
        Ok(())
    }

    /// Refreshes `Lx` and `Lu` only. Does not require a preceding `calc`.
    fn calc_diff(&self, data: &mut ActionDataLqr<T>, x: &DVector<T>, u: &DVector<T>) -> Result<()> {
        self.base.check_xu(x, u)?;
        let one: T = nalgebra::one();
        let d = &mut data.common;

        d.Lx.copy_from(&self.q_vec);
        d.Lx.gemv(one, &self.q_mat, x, one);
        d.Lx.gemv(one, &self.n_mat, u, one);

        d.Lu.copy_from(&self.r_vec);
        d.Lu.gemv(one, &self.r_mat, u, one);
        d.Lu.gemv_tr(one, &self.n_mat, x, one);
        Ok(())
    }

    /// Refreshes `Lx` only. Does not require a preceding `calc_terminal`.
    fn calc_diff_terminal(&self, data: &mut ActionDataLqr<T>, x: &DVector<T>) -> Result<()> {
        self.base.check_x(x)?;
        let one: T = nalgebra::one();
        let d = &mut data.common;
        d.Lx.copy_from(&self.q_vec);
        d.Lx.gemv(one, &self.q_mat, x, one);
        Ok(())
    }
}

impl<T: Real> fmt::Display for ActionModelLqr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ActionModelLqr {{nx={}, nu={}, drift_free={}}}",
            self.base.nx(),
            self.base.nu(),
            self.drift_free
        )
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_default_parameters() {
        let model = ActionModelLqr::<f64>::new(3, 2, false).unwrap();
        assert_eq!(model.fx(), &DMatrix::identity(3, 3));
        assert_eq!(model.fu(), &DMatrix::identity(3, 2));
        assert_eq!(model.f0(), &DVector::from_element(3, 1.0));
        assert_eq!(model.lxu(), &DMatrix::zeros(3, 2));
        assert!(!model.drift_free());

        let model = ActionModelLqr::<f64>::new(3, 2, true).unwrap();
        assert_eq!(model.f0(), &DVector::zeros(3));
        assert!(model.drift_free());
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(ActionModelLqr::<f64>::new(0, 2, true).unwrap_err().is_invalid_argument());
        assert!(ActionModelLqr::<f64>::new(2, 0, true).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_from_matrices_validates_shapes() {
        let ok = ActionModelLqr::from_matrices(
            DMatrix::<f64>::identity(2, 2),
            DMatrix::zeros(2, 1),
            DMatrix::identity(2, 2),
            DMatrix::identity(1, 1),
            DMatrix::zeros(2, 1),
        );
        assert!(ok.is_ok());

        let err = ActionModelLqr::from_matrices(
            DMatrix::<f64>::identity(2, 2),
            DMatrix::zeros(2, 1),
            DMatrix::identity(3, 3),
            DMatrix::identity(1, 1),
            DMatrix::zeros(2, 1),
        )
        .unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(err.to_string().contains('Q'));
    }

    #[test]
    fn test_calc_dynamics() {
        let mut model = ActionModelLqr::<f64>::new(2, 1, false).unwrap();
        model
            .set_fx(DMatrix::from_row_slice(2, 2, &[1.0, 0.1, 0.0, 1.0]))
            .unwrap();
        model.set_fu(DMatrix::from_row_slice(2, 1, &[0.0, 0.1])).unwrap();
        model.set_f0(DVector::from_vec(vec![0.5, -0.5])).unwrap();

        let mut data = model.create_data();
        let x = DVector::from_vec(vec![1.0, 2.0]);
        let u = DVector::from_vec(vec![3.0]);
        model.calc(&mut data, &x, &u).unwrap();

        assert_relative_eq!(data.common.xnext[0], 1.0 + 0.2 + 0.5, epsilon = 1e-12);
        assert_relative_eq!(data.common.xnext[1], 2.0 + 0.3 - 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_calc_cost_closed_form() {
        let mut model = ActionModelLqr::<f64>::new(2, 1, true).unwrap();
        model
            .set_lxx(DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 4.0]))
            .unwrap();
        model.set_luu(DMatrix::from_element(1, 1, 6.0)).unwrap();
        model.set_lxu(DMatrix::from_row_slice(2, 1, &[1.0, -1.0])).unwrap();
        model.set_lx(DVector::from_vec(vec![1.0, 0.0])).unwrap();
        model.set_lu(DVector::from_vec(vec![-2.0])).unwrap();

        let mut data = model.create_data();
        let x = DVector::from_vec(vec![1.0, 2.0]);
        let u = DVector::from_vec(vec![0.5]);
        model.calc(&mut data, &x, &u).unwrap();

        // ½(2 + 16) + ½(6·0.25) + (0.5 − 1.0) + 1 − 1
        let expected = 9.0 + 0.75 - 0.5 + 1.0 - 1.0;
        assert_relative_eq!(data.common.cost, expected, epsilon = 1e-12);

        model.calc_terminal(&mut data, &x).unwrap();
        assert_relative_eq!(data.common.cost, 9.0 + 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_calc_diff_gradients() {
        let mut rng = StdRng::seed_from_u64(7);
        let model = ActionModelLqr::<f64>::random(4, 2, &mut rng).unwrap();
        let mut data = model.create_data();
        let x = DVector::from_fn(4, |i, _| i as f64 - 1.5);
        let u = DVector::from_vec(vec![0.3, -0.7]);
        model.calc_diff(&mut data, &x, &u).unwrap();

        let lx = model.lx() + model.lxx() * &x + model.lxu() * &u;
        let lu = model.lu() + model.luu() * &u + model.lxu().transpose() * &x;
        assert_relative_eq!(data.common.Lx, lx, epsilon = 1e-12);
        assert_relative_eq!(data.common.Lu, lu, epsilon = 1e-12);

        model.calc_diff_terminal(&mut data, &x).unwrap();
        let lx = model.lx() + model.lxx() * &x;
        assert_relative_eq!(data.common.Lx, lx, epsilon = 1e-12);
    }

    #[test]
    fn test_create_data_snapshots_constant_blocks() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut model = ActionModelLqr::<f64>::random(3, 2, &mut rng).unwrap();
        let data = model.create_data();
        assert_eq!(&data.common.Fx, model.fx());
        assert_eq!(&data.common.Fu, model.fu());
        assert_eq!(&data.common.Lxx, model.lxx());
        assert_eq!(&data.common.Luu, model.luu());
        assert_eq!(&data.common.Lxu, model.lxu());

        let before = data.common.Fx.clone();
        model.set_fx(DMatrix::from_element(3, 3, 9.0)).unwrap();
        assert_eq!(data.common.Fx, before);
    }

    #[test]
    fn test_calc_diff_leaves_constant_blocks() {
        let model = ActionModelLqr::<f64>::new(3, 2, true).unwrap();
        let mut data = model.create_data();
        let x = DVector::from_element(3, 2.0);
        let u = DVector::from_element(2, -1.0);
        model.calc(&mut data, &x, &u).unwrap();
        model.calc_diff(&mut data, &x, &u).unwrap();
        assert_eq!(data.common.Fx, DMatrix::identity(3, 3));
        assert_eq!(data.common.Luu, DMatrix::identity(2, 2));
    }

    #[test]
    fn test_setters_reject_wrong_shapes() {
        let mut model = ActionModelLqr::<f64>::new(3, 2, true).unwrap();
        assert!(model.set_fx(DMatrix::zeros(3, 2)).unwrap_err().is_dimension_mismatch());
        assert!(model.set_fu(DMatrix::zeros(2, 3)).unwrap_err().is_dimension_mismatch());
        assert!(model.set_f0(DVector::zeros(2)).unwrap_err().is_dimension_mismatch());
        assert!(model.set_lx(DVector::zeros(2)).unwrap_err().is_dimension_mismatch());
        assert!(model.set_lu(DVector::zeros(3)).unwrap_err().is_dimension_mismatch());
        assert!(model.set_lxx(DMatrix::zeros(2, 2)).unwrap_err().is_dimension_mismatch());
        assert!(model.set_luu(DMatrix::zeros(3, 3)).unwrap_err().is_dimension_mismatch());
        assert!(model.set_lxu(DMatrix::zeros(2, 3)).unwrap_err().is_dimension_mismatch());
        // Rejected setters leave the model untouched
        assert_eq!(model.fx(), &DMatrix::identity(3, 3));
    }

    #[test]
    fn test_non_symmetric_weights_rejected() {
        let mut model = ActionModelLqr::<f64>::new(2, 2, true).unwrap();
        let skew = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 0.0, 1.0]);

        let err = model.set_lxx(skew.clone()).unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(model.lxx(), &DMatrix::identity(2, 2));

        let err = model.set_luu(skew.clone()).unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(model.luu(), &DMatrix::identity(2, 2));

        let err = ActionModelLqr::from_matrices(
            DMatrix::identity(2, 2),
            DMatrix::identity(2, 2),
            skew,
            DMatrix::identity(2, 2),
            DMatrix::zeros(2, 2),
        )
        .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_symmetric_weights_match_finite_differences() {
        use crate::action::numdiff::{ActionModelNumDiff, max_relative_error};

        let mut model = ActionModelLqr::<f64>::new(2, 1, true).unwrap();
        model
            .set_lxx(DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 3.0]))
            .unwrap();
        model.set_lxu(DMatrix::from_row_slice(2, 1, &[0.5, -2.0])).unwrap();
        let num = ActionModelNumDiff::new(model.clone()).unwrap();

        let x = DVector::from_vec(vec![0.3, -0.7]);
        let u = DVector::from_vec(vec![0.4]);
        let mut data = model.create_data();
        model.calc_diff(&mut data, &x, &u).unwrap();
        let mut ndata = num.create_data();
        num.calc_diff(&mut ndata, &x, &u).unwrap();

        assert!(max_relative_error(&data.common.Lx, &ndata.common.Lx, 1.0) < 1e-6);
        assert!(max_relative_error(&data.common.Lu, &ndata.common.Lu, 1.0) < 1e-6);
        assert!(max_relative_error(&data.common.Lxx, &ndata.common.Lxx, 1.0) < 1e-4);
        assert!(max_relative_error(&data.common.Lxu, &ndata.common.Lxu, 1.0) < 1e-4);
    }

    #[test]
    fn test_set_f0_tracks_drift_flag() {
        let mut model = ActionModelLqr::<f64>::new(2, 1, true).unwrap();
        model.set_f0(DVector::from_element(2, 0.1)).unwrap();
        assert!(!model.drift_free());
        model.set_f0(DVector::zeros(2)).unwrap();
        assert!(model.drift_free());
    }

    #[test]
    #[cfg(not(feature = "unchecked"))]
    fn test_calc_rejects_wrong_lengths() {
        let model = ActionModelLqr::<f64>::new(3, 2, true).unwrap();
        let mut data = model.create_data();
        let x = DVector::zeros(3);
        let u = DVector::zeros(2);
        let err = model.calc(&mut data, &DVector::zeros(2), &u).unwrap_err();
        assert!(err.is_dimension_mismatch());
        let err = model.calc_diff(&mut data, &x, &DVector::zeros(3)).unwrap_err();
        assert!(err.is_dimension_mismatch());
        let err = model.calc_terminal(&mut data, &DVector::zeros(4)).unwrap_err();
        assert!(err.is_dimension_mismatch());
    }

    #[test]
    fn test_single_precision() {
        let model = ActionModelLqr::<f32>::new(2, 2, false).unwrap();
        let mut data = model.create_data();
        let x = DVector::from_vec(vec![1.0_f32, 2.0]);
        let u = DVector::from_vec(vec![0.5_f32, 0.5]);
        model.calc(&mut data, &x, &u).unwrap();
        assert_relative_eq!(data.common.xnext[0], 2.5_f32, epsilon = 1e-6);
        assert_relative_eq!(data.common.xnext[1], 3.5_f32, epsilon = 1e-6);
    }

    #[test]
    fn test_display() {
        let model = ActionModelLqr::<f64>::new(4, 2, true).unwrap();
        assert_eq!(
            model.to_string(),
            "ActionModelLqr {nx=4, nu=2, drift_free=true}"
        );
    }
}
