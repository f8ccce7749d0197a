//! Property-based tests for the LQR model.
//!
//! Run with: cargo test -p sim-action-tests -- lqr_properties

use nalgebra::{DMatrix, DVector};
use proptest::prelude::*;
use sim_action::{
    ActionModel, ActionModelLqr, ActionModelNumDiff, SHAPE_CHECKS, max_relative_error,
};

// =============================================================================
// Strategies
// =============================================================================

fn arb_matrix(rows: usize, cols: usize) -> impl Strategy<Value = DMatrix<f64>> {
    prop::collection::vec(-10.0..10.0f64, rows * cols)
        .prop_map(move |v| DMatrix::from_vec(rows, cols, v))
}

/// `(M + Mᵀ)/2`, symmetric bit-for-bit.
fn arb_symmetric(n: usize) -> impl Strategy<Value = DMatrix<f64>> {
    arb_matrix(n, n).prop_map(|m| (&m + m.transpose()) * 0.5)
}

fn arb_vector(len: usize) -> impl Strategy<Value = DVector<f64>> {
    prop::collection::vec(-10.0..10.0f64, len).prop_map(DVector::from_vec)
}

/// Every LQR parameter, sized for a random `(nx, nu)`.
#[derive(Debug, Clone)]
struct LqrParams {
    nx: usize,
    nu: usize,
    a: DMatrix<f64>,
    b: DMatrix<f64>,
    f: DVector<f64>,
    q: DMatrix<f64>,
    r: DMatrix<f64>,
    n: DMatrix<f64>,
    lx: DVector<f64>,
    lu: DVector<f64>,
}

fn arb_params() -> impl Strategy<Value = LqrParams> {
    (1..=6usize, 1..=4usize).prop_flat_map(|(nx, nu)| {
        (
            (arb_matrix(nx, nx), arb_matrix(nx, nu), arb_vector(nx)),
            (arb_symmetric(nx), arb_symmetric(nu), arb_matrix(nx, nu)),
            (arb_vector(nx), arb_vector(nu)),
        )
            .prop_map(move |((a, b, f), (q, r, n), (lx, lu))| LqrParams {
                nx,
                nu,
                a,
                b,
                f,
                q,
                r,
                n,
                lx,
                lu,
            })
    })
}

fn configured(p: &LqrParams) -> ActionModelLqr<f64> {
    let mut model = ActionModelLqr::new(p.nx, p.nu, true).unwrap();
    model.set_fx(p.a.clone()).unwrap();
    model.set_fu(p.b.clone()).unwrap();
    model.set_f0(p.f.clone()).unwrap();
    model.set_lxx(p.q.clone()).unwrap();
    model.set_luu(p.r.clone()).unwrap();
    model.set_lxu(p.n.clone()).unwrap();
    model.set_lx(p.lx.clone()).unwrap();
    model.set_lu(p.lu.clone()).unwrap();
    model
}

// =============================================================================
// Property Tests: Accessors
// =============================================================================

proptest! {
    /// Every getter returns exactly what its setter stored.
    #[test]
    fn setters_round_trip(p in arb_params()) {
        let model = configured(&p);
        prop_assert_eq!(model.fx(), &p.a);
        prop_assert_eq!(model.fu(), &p.b);
        prop_assert_eq!(model.f0(), &p.f);
        prop_assert_eq!(model.lxx(), &p.q);
        prop_assert_eq!(model.luu(), &p.r);
        prop_assert_eq!(model.lxu(), &p.n);
        prop_assert_eq!(model.lx(), &p.lx);
        prop_assert_eq!(model.lu(), &p.lu);
    }

    /// Data created after configuration snapshots the constant blocks.
    #[test]
    fn create_data_snapshots_parameters(p in arb_params()) {
        let model = configured(&p);
        let data = model.create_data();
        prop_assert_eq!(&data.common.Fx, &p.a);
        prop_assert_eq!(&data.common.Fu, &p.b);
        prop_assert_eq!(&data.common.Lxx, &p.q);
        prop_assert_eq!(&data.common.Luu, &p.r);
        prop_assert_eq!(&data.common.Lxu, &p.n);
    }

    /// A drift-free model always reports a zero drift of length nx.
    #[test]
    fn drift_free_means_zero_drift(nx in 1..=8usize, nu in 1..=4usize) {
        let model = ActionModelLqr::<f64>::new(nx, nu, true).unwrap();
        prop_assert!(model.drift_free());
        prop_assert_eq!(model.f0(), &DVector::zeros(nx));
    }

    /// `xnext = A·x + B·u + f` for any parameters and point.
    #[test]
    fn next_state_matches_formula(
        p in arb_params(),
        seed in prop::collection::vec(-5.0..5.0f64, 10),
    ) {
        let model = configured(&p);
        let x = DVector::from_fn(p.nx, |i, _| seed[i]);
        let u = DVector::from_fn(p.nu, |i, _| seed[6 + i]);
        let mut data = model.create_data();
        model.calc(&mut data, &x, &u).unwrap();

        let expected = &p.a * &x + &p.b * &u + &p.f;
        for i in 0..p.nx {
            let tol = 1e-9 * (1.0 + expected[i].abs());
            prop_assert!((data.common.xnext[i] - expected[i]).abs() < tol);
        }
    }

    /// Setters reject any shape other than the fixed one and keep the old value.
    #[test]
    fn setters_reject_other_shapes(
        nx in 1..=5usize,
        nu in 1..=4usize,
        dr in 1..=3usize,
        dc in 0..=2usize,
    ) {
        let mut model = ActionModelLqr::<f64>::new(nx, nu, false).unwrap();
        let before = model.fx().clone();
        let err = model.set_fx(DMatrix::zeros(nx + dr, nx + dc)).unwrap_err();
        prop_assert!(err.is_dimension_mismatch());
        prop_assert_eq!(model.fx(), &before);

        let err = model.set_lu(DVector::zeros(nu + dr)).unwrap_err();
        prop_assert!(err.is_dimension_mismatch());
    }

    /// Q and R with any off-diagonal mismatch are refused and leave the model as it was.
    #[test]
    fn asymmetric_weights_rejected(
        n in 2..=5usize,
        m in arb_matrix(5, 5),
        bump in 0.1..10.0f64,
    ) {
        let mut q = m.view((0, 0), (n, n)).clone_owned();
        q = (&q + q.transpose()) * 0.5;
        q[(0, 1)] += bump;

        let mut model = ActionModelLqr::<f64>::new(n, n, true).unwrap();
        let err = model.set_lxx(q.clone()).unwrap_err();
        prop_assert!(err.is_invalid_argument());
        let err = model.set_luu(q).unwrap_err();
        prop_assert!(err.is_invalid_argument());
        prop_assert_eq!(model.lxx(), &DMatrix::identity(n, n));
        prop_assert_eq!(model.luu(), &DMatrix::identity(n, n));
    }

    /// Analytical gradients and Hessians of any setter-configured model agree
    /// with finite differences.
    #[test]
    fn derivatives_match_finite_differences(
        p in arb_params(),
        seed in prop::collection::vec(-5.0..5.0f64, 10),
    ) {
        let model = configured(&p);
        let num = ActionModelNumDiff::new(model.clone()).unwrap();
        let x = DVector::from_fn(p.nx, |i, _| seed[i]);
        let u = DVector::from_fn(p.nu, |i, _| seed[6 + i]);

        let mut data = model.create_data();
        model.calc_diff(&mut data, &x, &u).unwrap();
        let mut ndata = num.create_data();
        num.calc_diff(&mut ndata, &x, &u).unwrap();

        let (a, n) = (&data.common, &ndata.common);
        prop_assert!(max_relative_error(&a.Fx, &n.Fx, 1.0) < 1e-6);
        prop_assert!(max_relative_error(&a.Fu, &n.Fu, 1.0) < 1e-6);
        prop_assert!(max_relative_error(&a.Lx, &n.Lx, 1.0) < 1e-4);
        prop_assert!(max_relative_error(&a.Lu, &n.Lu, 1.0) < 1e-4);
        prop_assert!(max_relative_error(&a.Lxx, &n.Lxx, 1.0) < 1e-3);
        prop_assert!(max_relative_error(&a.Luu, &n.Luu, 1.0) < 1e-3);
        prop_assert!(max_relative_error(&a.Lxu, &n.Lxu, 1.0) < 1e-3);
    }

    /// Evaluation rejects a wrong-sized state when shape checks are compiled in.
    #[test]
    fn calc_rejects_wrong_state_length(nx in 1..=5usize, extra in 1..=3usize) {
        prop_assume!(SHAPE_CHECKS);
        let model = ActionModelLqr::<f64>::new(nx, 1, true).unwrap();
        let mut data = model.create_data();
        let result = model.calc(&mut data, &DVector::zeros(nx + extra), &DVector::zeros(1));
        prop_assert!(result.is_err_and(|e| e.is_dimension_mismatch()));
    }
}
