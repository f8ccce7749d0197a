//! Integration tests for batched node evaluation (`ActionBatch`).
//!
//! Batched evaluation must produce identical results to evaluating each
//! node sequentially, with or without the `parallel` feature.

use std::sync::Arc;

use nalgebra::DVector;
use sim_action::{ActionBatch, ActionModel, ActionModelNumDiff, ActionModelUnicycle};

use crate::action_test_utils::{point, seeded_lqr};

#[test]
fn batch_matches_sequential_lqr() {
    let model = Arc::new(seeded_lqr(6, 3, 31));
    let n = 32;
    let xs: Vec<_> = (0..n).map(|i| point(6, 0.1 * i as f64)).collect();
    let us: Vec<_> = (0..n).map(|i| point(3, 2.0 - 0.05 * i as f64)).collect();

    let mut batch = ActionBatch::new(Arc::clone(&model), n);
    assert!(batch.calc_all(&xs, &us).unwrap().iter().all(Option::is_none));
    assert!(batch.calc_diff_all(&xs, &us).unwrap().iter().all(Option::is_none));

    let mut total = 0.0;
    for (i, node) in batch.nodes().enumerate() {
        let mut data = model.create_data();
        model.calc(&mut data, &xs[i], &us[i]).unwrap();
        model.calc_diff(&mut data, &xs[i], &us[i]).unwrap();
        assert_eq!(node.common.xnext, data.common.xnext, "node {i} xnext mismatch");
        assert_eq!(node.common.cost, data.common.cost, "node {i} cost mismatch");
        assert_eq!(node.common.Lx, data.common.Lx, "node {i} Lx mismatch");
        assert_eq!(node.common.Lu, data.common.Lu, "node {i} Lu mismatch");
        total += data.common.cost;
    }
    assert!((batch.total_cost() - total).abs() < 1e-9 * (1.0 + total.abs()));
}

#[test]
fn batch_of_finite_difference_nodes() {
    let model = Arc::new(ActionModelNumDiff::new(ActionModelUnicycle::<f64>::new().unwrap()).unwrap());
    let n = 8;
    let xs: Vec<_> = (0..n)
        .map(|i| DVector::from_vec(vec![0.0, 0.1, 0.4 * i as f64]))
        .collect();
    let us = vec![DVector::from_vec(vec![1.0, -0.5]); n];

    let mut batch = ActionBatch::new(Arc::clone(&model), n);
    batch.calc_all(&xs, &us).unwrap();
    batch.calc_diff_all(&xs, &us).unwrap();

    for (i, node) in batch.nodes().enumerate() {
        let mut data = model.create_data();
        model.calc_diff(&mut data, &xs[i], &us[i]).unwrap();
        assert_eq!(node.common.Fx, data.common.Fx, "node {i} Fx mismatch");
        assert!(model.check_data(node));
    }
}

#[test]
fn repeated_evaluation_is_stable() {
    let model = Arc::new(seeded_lqr(3, 2, 4));
    let mut batch = ActionBatch::new(model, 4);
    let xs = vec![point(3, 1.0); 4];
    let us = vec![point(2, 0.0); 4];

    batch.calc_all(&xs, &us).unwrap();
    let first = batch.total_cost();
    for _ in 0..10 {
        batch.calc_all(&xs, &us).unwrap();
    }
    assert_eq!(batch.total_cost(), first);
}
