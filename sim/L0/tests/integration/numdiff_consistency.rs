//! Analytical derivatives agree with finite differences.

use std::sync::Arc;

use nalgebra::{DMatrix, DVector};
use sim_action::{
    ActionData, ActionDataCommon, ActionModel, ActionModelBase, ActionModelNumDiff,
    ActionModelUnicycle, NumDiffConfig, State, max_relative_error,
};

use crate::action_test_utils::{point, seeded_lqr};

fn assert_derivatives_match<M>(model: &M, x: &DVector<f64>, u: &DVector<f64>, tol: f64)
where
    M: ActionModel<f64> + Clone,
{
    let num = ActionModelNumDiff::new(model.clone()).unwrap();
    let mut data = model.create_data();
    model.calc(&mut data, x, u).unwrap();
    model.calc_diff(&mut data, x, u).unwrap();
    let mut ndata = num.create_data();
    num.calc(&mut ndata, x, u).unwrap();
    num.calc_diff(&mut ndata, x, u).unwrap();

    let (a, n) = (data.common(), &ndata.common);
    for (name, err) in [
        ("Fx", max_relative_error(&a.Fx, &n.Fx, 1.0)),
        ("Fu", max_relative_error(&a.Fu, &n.Fu, 1.0)),
        ("Lx", max_relative_error(&a.Lx, &n.Lx, 1.0)),
        ("Lu", max_relative_error(&a.Lu, &n.Lu, 1.0)),
        ("Lxx", max_relative_error(&a.Lxx, &n.Lxx, 1.0)),
        ("Luu", max_relative_error(&a.Luu, &n.Luu, 1.0)),
        ("Lxu", max_relative_error(&a.Lxu, &n.Lxu, 1.0)),
    ] {
        assert!(err < tol, "{name}: relative error {err:e} exceeds {tol:e}");
    }
}

#[test]
fn lqr_gradients_and_hessians() {
    for (seed, (nx, nu)) in [(1, (2, 1)), (2, (4, 2)), (3, (6, 3)), (4, (8, 8))] {
        let model = seeded_lqr(nx, nu, seed);
        assert_derivatives_match(&model, &point(nx, 0.3), &point(nu, 1.9), 1e-4);
    }
}

#[test]
fn lqr_with_drift_and_cross_term() {
    let mut model = seeded_lqr(5, 2, 77);
    model.set_f0(point(5, 4.0)).unwrap();
    model
        .set_lxu(DMatrix::from_fn(5, 2, |i, j| 0.3 * (i as f64) - 0.2 * (j as f64)))
        .unwrap();
    assert_derivatives_match(&model, &point(5, -0.6), &point(2, 2.2), 1e-4);
}

#[test]
fn unicycle_at_several_headings() {
    let model = ActionModelUnicycle::<f64>::new().unwrap();
    for theta in [-2.5, -0.4, 0.0, 1.1, 3.0] {
        let x = DVector::from_vec(vec![0.3, -0.8, theta]);
        let u = DVector::from_vec(vec![1.4, -0.3]);
        assert_derivatives_match(&model, &x, &u, 1e-4);
    }
}

#[test]
fn centered_beats_forward() {
    let model = ActionModelUnicycle::<f64>::new().unwrap();
    let x = DVector::from_vec(vec![0.2, 0.1, 0.7]);
    let u = DVector::from_vec(vec![2.0, 0.5]);
    let mut data = model.create_data();
    model.calc(&mut data, &x, &u).unwrap();
    model.calc_diff(&mut data, &x, &u).unwrap();

    let fx_error = |config: NumDiffConfig| {
        let num = ActionModelNumDiff::with_config(model.clone(), config).unwrap();
        let mut ndata = num.create_data();
        num.calc_diff(&mut ndata, &x, &u).unwrap();
        max_relative_error(&data.common.Fx, &ndata.common.Fx, 1.0)
    };
    let centered = fx_error(NumDiffConfig::default().with_eps(1e-4));
    let forward = fx_error(NumDiffConfig::default().with_eps(1e-4).forward());
    assert!(centered < forward, "centered {centered:e} vs forward {forward:e}");
}

// ============================================================================
// Non-Euclidean state: R² × SO(2) stored as (px, py, cosθ, sinθ)
// ============================================================================

#[derive(Debug)]
struct PlanarPose;

impl PlanarPose {
    fn angle(x: &DVector<f64>) -> f64 {
        x[3].atan2(x[2])
    }
}

impl State<f64> for PlanarPose {
    fn nx(&self) -> usize {
        4
    }

    fn ndx(&self) -> usize {
        3
    }

    fn nq(&self) -> usize {
        4
    }

    fn nv(&self) -> usize {
        3
    }

    fn zero(&self) -> DVector<f64> {
        DVector::from_vec(vec![0.0, 0.0, 1.0, 0.0])
    }

    fn diff(
        &self,
        x0: &DVector<f64>,
        x1: &DVector<f64>,
        dxout: &mut DVector<f64>,
    ) -> sim_action::Result<()> {
        let dtheta = Self::angle(x1) - Self::angle(x0);
        dxout[0] = x1[0] - x0[0];
        dxout[1] = x1[1] - x0[1];
        dxout[2] = dtheta.sin().atan2(dtheta.cos());
        Ok(())
    }

    fn integrate(
        &self,
        x: &DVector<f64>,
        dx: &DVector<f64>,
        xout: &mut DVector<f64>,
    ) -> sim_action::Result<()> {
        let (s, c) = (Self::angle(x) + dx[2]).sin_cos();
        xout[0] = x[0] + dx[0];
        xout[1] = x[1] + dx[1];
        xout[2] = c;
        xout[3] = s;
        Ok(())
    }
}

/// Pose driven by a body-fixed twist: `xnext = x ⊕ u·dt`,
/// `ℓ = ½‖p‖² + ½θ² + ½‖u‖²`.
#[derive(Debug, Clone)]
struct DrivenPose {
    base: ActionModelBase<f64>,
    dt: f64,
}

impl DrivenPose {
    fn new() -> Self {
        Self {
            base: ActionModelBase::new(Arc::new(PlanarPose), 3).unwrap(),
            dt: 0.05,
        }
    }

    fn state_cost(x: &DVector<f64>) -> f64 {
        let theta = PlanarPose::angle(x);
        0.5 * (x[0] * x[0] + x[1] * x[1] + theta * theta)
    }
}

impl ActionModel<f64> for DrivenPose {
    type Data = ActionDataCommon<f64>;

    fn base(&self) -> &ActionModelBase<f64> {
        &self.base
    }

    fn create_data(&self) -> ActionDataCommon<f64> {
        ActionDataCommon::new(&self.base)
    }

    fn calc(
        &self,
        data: &mut ActionDataCommon<f64>,
        x: &DVector<f64>,
        u: &DVector<f64>,
    ) -> sim_action::Result<()> {
        self.state().integrate(x, &(u * self.dt), &mut data.xnext)?;
        data.cost = Self::state_cost(x) + 0.5 * u.norm_squared();
        Ok(())
    }

    fn calc_terminal(
        &self,
        data: &mut ActionDataCommon<f64>,
        x: &DVector<f64>,
    ) -> sim_action::Result<()> {
        data.cost = Self::state_cost(x);
        Ok(())
    }

    fn calc_diff(
        &self,
        data: &mut ActionDataCommon<f64>,
        x: &DVector<f64>,
        u: &DVector<f64>,
    ) -> sim_action::Result<()> {
        self.calc_diff_terminal(data, x)?;
        data.Fx.fill_with_identity();
        data.Fu.fill_with_identity();
        data.Fu *= self.dt;
        data.Lu.copy_from(u);
        data.Luu.fill_with_identity();
        data.Lxu.fill(0.0);
        Ok(())
    }

    fn calc_diff_terminal(
        &self,
        data: &mut ActionDataCommon<f64>,
        x: &DVector<f64>,
    ) -> sim_action::Result<()> {
        data.Lx[0] = x[0];
        data.Lx[1] = x[1];
        data.Lx[2] = PlanarPose::angle(x);
        data.Lxx.fill_with_identity();
        Ok(())
    }
}

#[test]
fn tangent_space_perturbations() {
    let model = DrivenPose::new();
    assert_eq!(model.nx(), 4);
    assert_eq!(model.ndx(), 3);

    let data = model.create_data();
    assert_eq!(data.Fx.shape(), (3, 3));
    assert_eq!(data.Lx.len(), 3);

    let theta: f64 = 0.4;
    let x = DVector::from_vec(vec![0.5, -0.2, theta.cos(), theta.sin()]);
    let u = DVector::from_vec(vec![0.3, 0.1, -0.6]);
    assert_derivatives_match(&model, &x, &u, 1e-4);
}

#[test]
fn tangent_space_terminal() {
    let model = DrivenPose::new();
    let num = ActionModelNumDiff::new(model.clone()).unwrap();
    let theta: f64 = -1.2;
    let x = DVector::from_vec(vec![1.5, 0.7, theta.cos(), theta.sin()]);

    let mut data = model.create_data();
    model.calc_diff_terminal(&mut data, &x).unwrap();
    let mut ndata = num.create_data();
    num.calc_diff_terminal(&mut ndata, &x).unwrap();

    assert!(max_relative_error(&data.Lx, &ndata.common.Lx, 1.0) < 1e-6);
    assert!(max_relative_error(&data.Lxx, &ndata.common.Lxx, 1.0) < 1e-4);
}
