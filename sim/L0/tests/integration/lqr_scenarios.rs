//! End-to-end LQR configuration and evaluation.

use approx::assert_relative_eq;
use nalgebra::{DMatrix, DVector};
use sim_action::{ActionError, ActionModel, ActionModelLqr, SHAPE_CHECKS};

use crate::action_test_utils::{point, seeded_lqr};

/// nx=4, nu=2, drift-free: zero drift of length 4, and a data created after
/// `set_fx(I₄)` carries `Fx == I₄`.
#[test]
fn drift_free_model_with_identity_dynamics() {
    let mut model = ActionModelLqr::<f64>::new(4, 2, true).unwrap();
    assert_eq!(model.f0(), &DVector::zeros(4));

    model.set_fx(DMatrix::identity(4, 4)).unwrap();
    let data = model.create_data();
    assert_eq!(data.common.Fx, DMatrix::identity(4, 4));
    assert_eq!(data.common.xnext.len(), 4);
    assert_eq!(data.common.Lxu.shape(), (4, 2));
}

#[test]
fn next_state_is_affine() {
    let mut model = seeded_lqr(5, 3, 17);
    model.set_f0(point(5, 2.0)).unwrap();
    let mut data = model.create_data();

    for phase in [0.0, 0.4, 1.3] {
        let x = point(5, phase);
        let u = point(3, phase + 1.0);
        model.calc(&mut data, &x, &u).unwrap();
        let expected = model.fx() * &x + model.fu() * &u + model.f0();
        assert_relative_eq!(data.common.xnext, expected, epsilon = 1e-12);
    }
}

#[test]
fn cost_matches_quadratic_form() {
    let model = seeded_lqr(4, 2, 5);
    let mut data = model.create_data();
    let x = point(4, 0.2);
    let u = point(2, 0.9);
    model.calc(&mut data, &x, &u).unwrap();

    let expected = 0.5 * x.dot(&(model.lxx() * &x))
        + 0.5 * u.dot(&(model.luu() * &u))
        + x.dot(&(model.lxu() * &u))
        + model.lx().dot(&x)
        + model.lu().dot(&u);
    assert_relative_eq!(data.common.cost, expected, epsilon = 1e-12);
}

#[test]
fn snapshot_survives_later_setters() {
    let mut model = seeded_lqr(3, 2, 9);
    let data = model.create_data();
    let (a, b, q, r, n) = (
        model.fx().clone(),
        model.fu().clone(),
        model.lxx().clone(),
        model.luu().clone(),
        model.lxu().clone(),
    );

    model.set_fx(DMatrix::zeros(3, 3)).unwrap();
    model.set_fu(DMatrix::zeros(3, 2)).unwrap();
    model.set_lxx(DMatrix::zeros(3, 3)).unwrap();
    model.set_luu(DMatrix::zeros(2, 2)).unwrap();
    model.set_lxu(DMatrix::from_element(3, 2, 1.0)).unwrap();

    assert_eq!(data.common.Fx, a);
    assert_eq!(data.common.Fu, b);
    assert_eq!(data.common.Lxx, q);
    assert_eq!(data.common.Luu, r);
    assert_eq!(data.common.Lxu, n);

    // Fresh data picks up the new values
    let fresh = model.create_data();
    assert_eq!(fresh.common.Lxu, DMatrix::from_element(3, 2, 1.0));
}

#[test]
fn data_from_another_model_is_detected() {
    let a = seeded_lqr(3, 2, 1);
    let b = seeded_lqr(3, 2, 1);
    let data = a.create_data();
    assert!(a.check_data(&data));
    assert!(!b.check_data(&data));
}

#[test]
fn wrong_input_lengths_fail_fast() {
    if !SHAPE_CHECKS {
        return;
    }
    let model = ActionModelLqr::<f64>::new(4, 2, false).unwrap();
    let mut data = model.create_data();
    let result = model.calc(&mut data, &DVector::zeros(3), &DVector::zeros(2));
    assert!(matches!(
        result,
        Err(ActionError::DimensionMismatch { what: "x", .. })
    ));
    // Nothing was written
    assert_eq!(data.common.xnext, DVector::zeros(4));
}

#[test]
fn terminal_pass_after_running_pass() {
    let model = seeded_lqr(3, 1, 23);
    let mut data = model.create_data();
    let x = point(3, 0.5);
    let u = point(1, 0.1);
    model.calc(&mut data, &x, &u).unwrap();
    model.calc_diff(&mut data, &x, &u).unwrap();

    model.calc_terminal(&mut data, &x).unwrap();
    model.calc_diff_terminal(&mut data, &x).unwrap();
    let expected = 0.5 * x.dot(&(model.lxx() * &x)) + model.lx().dot(&x);
    assert_relative_eq!(data.common.cost, expected, epsilon = 1e-12);
    assert_relative_eq!(data.common.Lx, model.lx() + model.lxx() * &x, epsilon = 1e-12);
}

#[test]
fn single_precision_matches_double() {
    let model64 = ActionModelLqr::<f64>::new(3, 2, false).unwrap();
    let model32 = ActionModelLqr::<f32>::new(3, 2, false).unwrap();
    let mut d64 = model64.create_data();
    let mut d32 = model32.create_data();

    let x = point(3, 0.3);
    let u = point(2, 0.8);
    model64.calc(&mut d64, &x, &u).unwrap();
    model32
        .calc(&mut d32, &x.map(|v| v as f32), &u.map(|v| v as f32))
        .unwrap();

    assert_relative_eq!(d32.common.cost, d64.common.cost as f32, epsilon = 1e-5);
    for i in 0..3 {
        assert_relative_eq!(d32.common.xnext[i], d64.common.xnext[i] as f32, epsilon = 1e-5);
    }
}
