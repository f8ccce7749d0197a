//! Batched node evaluation: N horizon nodes sharing one action model.
//!
//! Every node owns its own data, created once up front by the shared model.
//! Evaluation is parallelized across nodes via rayon when the `parallel`
//! feature is enabled; sequential fallback when disabled.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use nalgebra::DVector;
//! use sim_action::{ActionBatch, ActionModelLqr};
//!
//! let model = Arc::new(ActionModelLqr::<f64>::new(3, 2, false)?);
//! let mut batch = ActionBatch::new(model, 10);
//!
//! let xs = vec![DVector::zeros(3); 10];
//! let us = vec![DVector::from_element(2, 0.5); 10];
//! let errors = batch.calc_all(&xs, &us)?;
//! assert!(errors.iter().all(Option::is_none));
//! assert!(batch.total_cost() > 0.0);
//! # Ok::<(), sim_action::ActionError>(())
//! ```

use std::marker::PhantomData;
use std::sync::Arc;

use nalgebra::DVector;

use crate::Real;
use crate::action::{ActionData, ActionModel};
use crate::error::{ActionError, Result, Shape};

/// N nodes sharing one [`ActionModel`], each with its own data.
///
/// # Determinism
///
/// Each node's evaluation is a pure function of its own data, its own
/// `(x, u)` and the shared model, so results do not depend on thread count
/// or scheduling order.
pub struct ActionBatch<M: ActionModel<T>, T: Real = f64> {
    model: Arc<M>,
    nodes: Vec<M::Data>,
    _scalar: PhantomData<T>,
}

impl<M: ActionModel<T>, T: Real> ActionBatch<M, T> {
    /// Create `n` nodes, each with data from [`ActionModel::create_data`].
    #[must_use]
    pub fn new(model: Arc<M>, n: usize) -> Self {
        let nodes = (0..n).map(|_| model.create_data()).collect();
        tracing::debug!(nodes = n, nx = model.nx(), nu = model.nu(), "created action batch");
        Self {
            model,
            nodes,
            _scalar: PhantomData,
        }
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Shared model reference.
    #[must_use]
    pub fn model(&self) -> &M {
        &self.model
    }

    // ==================== Node Access ====================

    /// Data of node `i`, or `None` if `i >= len()`.
    #[must_use]
    pub fn node(&self, i: usize) -> Option<&M::Data> {
        self.nodes.get(i)
    }

    /// Mutable data of node `i`, or `None` if `i >= len()`.
    pub fn node_mut(&mut self, i: usize) -> Option<&mut M::Data> {
        self.nodes.get_mut(i)
    }

    /// Iterator over all node data.
    pub fn nodes(&self) -> impl ExactSizeIterator<Item = &M::Data> {
        self.nodes.iter()
    }

    /// Sum of the node costs from the last evaluation.
    #[must_use]
    pub fn total_cost(&self) -> T {
        self.nodes
            .iter()
            .fold(T::zero(), |acc, data| acc + data.common().cost)
    }

    // ==================== Evaluation ====================

    /// Run [`ActionModel::calc`] on every node.
    ///
    /// Returns per-node errors: `None` = success, `Some(e)` = that node
    /// failed.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::DimensionMismatch`] if `xs` or `us` does not
    /// have one entry per node. No node is evaluated in that case.
    pub fn calc_all(
        &mut self,
        xs: &[DVector<T>],
        us: &[DVector<T>],
    ) -> Result<Vec<Option<ActionError>>> {
        self.check_inputs(xs, us)?;
        Ok(self.for_each_node(xs, us, |model, data, x, u| model.calc(data, x, u)))
    }

    /// Run [`ActionModel::calc_diff`] on every node.
    ///
    /// Node `i` must have been evaluated by `calc` at `(xs[i], us[i])` if the
    /// model requires it.
    ///
    /// # Errors
    ///
    /// As [`calc_all`](Self::calc_all).
    pub fn calc_diff_all(
        &mut self,
        xs: &[DVector<T>],
        us: &[DVector<T>],
    ) -> Result<Vec<Option<ActionError>>> {
        self.check_inputs(xs, us)?;
        Ok(self.for_each_node(xs, us, |model, data, x, u| model.calc_diff(data, x, u)))
    }

    fn check_inputs(&self, xs: &[DVector<T>], us: &[DVector<T>]) -> Result<()> {
        let n = self.nodes.len();
        for (what, len) in [("xs", xs.len()), ("us", us.len())] {
            if len != n {
                return Err(ActionError::DimensionMismatch {
                    what,
                    expected: Shape::vector(n),
                    actual: Shape::vector(len),
                });
            }
        }
        Ok(())
    }

    fn for_each_node<F>(
        &mut self,
        xs: &[DVector<T>],
        us: &[DVector<T>],
        op: F,
    ) -> Vec<Option<ActionError>>
    where
        F: Fn(&M, &mut M::Data, &DVector<T>, &DVector<T>) -> Result<()> + Sync,
    {
        let model = &*self.model;

        #[cfg(feature = "parallel")]
        {
            use rayon::iter::{
                IndexedParallelIterator, IntoParallelRefIterator, IntoParallelRefMutIterator,
                ParallelIterator,
            };
            self.nodes
                .par_iter_mut()
                .zip(xs.par_iter())
                .zip(us.par_iter())
                .map(|((data, x), u)| op(model, data, x, u).err())
                .collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            self.nodes
                .iter_mut()
                .zip(xs)
                .zip(us)
                .map(|((data, x), u)| op(model, data, x, u).err())
                .collect()
        }
    }
}
