//! Integration tests for sim-action.
//!
//! These tests exercise the public API the way a trajectory optimizer does:
//! - LQR configuration, data snapshots and closed-form evaluation
//! - Finite-difference consistency of analytical derivatives
//! - Impulse data bound to a dynamics-engine buffer
//! - Heterogeneous horizons through boxed models
//! - Batched node evaluation

pub mod batch_eval;
pub mod lqr_properties;
pub mod lqr_scenarios;
pub mod numdiff_consistency;
