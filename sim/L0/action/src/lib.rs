//! Differentiable action and impulse models for DDP-style trajectory optimization.
//!
//! A trajectory optimizer discretizes a horizon into nodes and, at every node,
//! evaluates one step of dynamics plus a stage cost together with their first
//! and second derivatives. This crate provides that per-node abstraction:
//!
//! - [`ActionModel`] / [`ActionData`]: `(x, u) ↦ (xnext, cost)` and
//!   `Fx, Fu, Lx, Lu, Lxx, Luu, Lxu`, with an exact linear-quadratic model
//!   ([`ActionModelLqr`]), a non-linear unicycle ([`ActionModelUnicycle`]) and
//!   a finite-difference wrapper ([`ActionModelNumDiff`]).
//! - [`ImpulseModel`] / [`ImpulseData`]: instantaneous contact events that
//!   make the generalized velocity jump, with the post-impact velocity and
//!   its sensitivities.
//!
//! Like the Model/Data split of the simulation core, the model is immutable
//! during evaluation and the data holds every mutable buffer:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     ActionModel (Arc)                       │
//! │  Static: dimensions, parameters, control bounds             │
//! └─────────────────────────┬───────────────────────────────────┘
//!                           │ create_data()  (once per node)
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    ActionData (per node)                    │
//! │  Dynamic: xnext, cost, derivative blocks, scratch           │
//! │  One iteration: calc() then calc_diff()                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Layer 0 Crate
//!
//! No rendering or engine dependencies. The rigid-body dynamics engine is an
//! external collaborator reached through [`FrameKinematics`].
//!
//! # Quick Start
//!
//! ```
//! use nalgebra::{DMatrix, DVector};
//! use sim_action::{ActionModel, ActionModelLqr};
//!
//! let mut model = ActionModelLqr::<f64>::new(4, 2, true)?;
//! model.set_fx(DMatrix::identity(4, 4))?;
//!
//! let mut data = model.create_data();
//! let x = DVector::from_element(4, 1.0);
//! let u = DVector::from_element(2, 0.5);
//! model.calc(&mut data, &x, &u)?;
//! model.calc_diff(&mut data, &x, &u)?;
//!
//! assert_eq!(data.common.Fx, DMatrix::identity(4, 4));
//! # Ok::<(), sim_action::ActionError>(())
//! ```
//!
//! # Features
//!
//! - `parallel`: evaluate [`ActionBatch`] nodes with rayon.
//! - `unchecked`: compile out the shape checks on `calc`, `calc_diff` and the
//!   impulse `update_*` operations (see [`SHAPE_CHECKS`]). Setters and
//!   constructors always validate.

#![doc(html_root_url = "https://docs.rs/sim-action/0.3.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,       // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,           // mul_add style changes aren't always clearer
    clippy::neg_cmp_op_on_partial_ord,  // !(x > 0.0) is intentional for NaN rejection
    clippy::many_single_char_names,     // x, u, f, q, r follow optimal-control notation
    clippy::doc_markdown,               // Not all technical terms need backticks
)]

use nalgebra::RealField;

// Action models (contract, LQR, unicycle, finite differences)
pub mod action;

// Impulse models and the dynamics-engine seam
pub mod impulse;

// Batched node evaluation (one model, many data)
pub mod batch;

pub mod config;
pub mod error;
pub mod shape;
pub mod state;

/// Scalar type of the whole stack.
///
/// Implemented for every `RealField + Copy` type, in practice `f32` and `f64`.
pub trait Real: RealField + Copy {}

impl<T: RealField + Copy> Real for T {}

pub use action::lqr::{ActionDataLqr, ActionModelLqr};
pub use action::numdiff::{ActionDataNumDiff, ActionModelNumDiff, max_relative_error};
pub use action::unicycle::{ActionDataUnicycle, ActionModelUnicycle};
pub use action::{
    ActionData, ActionDataCommon, ActionModel, ActionModelBase, AsAny, BoxedActionModel, ModelId,
};
pub use batch::ActionBatch;
pub use config::{MAX_EPS, NumDiffConfig};
pub use error::{ActionError, Result, Shape};
pub use impulse::frame::{DenseFrameKinematics, FrameKinematics, ImpulseFrame, ImpulseKind};
pub use impulse::{FrameId, ImpulseData, ImpulseModel, ImpulseModelBase};
pub use shape::SHAPE_CHECKS;
pub use state::{State, StateVector};
