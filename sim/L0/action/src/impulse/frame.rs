//! Impulse at a frame of the kinematic tree.
//!
//! Frame quantities are 6-row spatial blocks, linear rows first:
//!
//! ```text
//! J(frame)      ∈ ℝ^{6×nv}    rows 0..3 linear, rows 3..6 angular
//! ∂v/∂q(frame)  ∈ ℝ^{6×nv}
//! ```
//!
//! A point contact ([`ImpulseKind::Point3D`]) constrains the linear rows;
//! a full frame contact ([`ImpulseKind::Frame6D`]) constrains all six.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use nalgebra::{DMatrix, DMatrixView, DVector};

use super::{FrameId, ImpulseData, ImpulseModel, ImpulseModelBase};
use crate::Real;
use crate::error::{ActionError, Result, Shape};
use crate::shape::{check_len, require_positive, require_shape};
use crate::state::State;

/// Rows of a spatial frame block.
pub const FRAME_ROWS: usize = 6;

/// Read access to the frame quantities a dynamics engine computed for the
/// current state.
pub trait FrameKinematics<T: Real = f64>: Send + Sync {
    /// Velocity dimension the blocks are expressed in.
    fn nv(&self) -> usize;

    /// Frame Jacobian (`6 × nv`), or `None` for an unknown frame.
    fn frame_jacobian(&self, frame: FrameId) -> Option<DMatrixView<'_, T>>;

    /// Partial of the frame velocity w.r.t. the configuration (`6 × nv`),
    /// or `None` for an unknown frame.
    fn frame_velocity_partial(&self, frame: FrameId) -> Option<DMatrixView<'_, T>>;
}

#[derive(Debug, Clone)]
struct FrameBlocks<T: Real> {
    jacobian: DMatrix<T>,
    velocity_partial: DMatrix<T>,
}

/// Per-frame store of dense blocks, filled by whichever engine the caller runs.
///
/// Frames are keyed by id, so any [`FrameId`] can be stored.
#[derive(Debug, Clone)]
pub struct DenseFrameKinematics<T: Real = f64> {
    nv: usize,
    frames: BTreeMap<FrameId, FrameBlocks<T>>,
}

impl<T: Real> DenseFrameKinematics<T> {
    /// Empty store for `nv` velocity coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::InvalidArgument`] if `nv` is zero.
    pub fn new(nv: usize) -> Result<Self> {
        require_positive("nv", nv)?;
        Ok(Self {
            nv,
            frames: BTreeMap::new(),
        })
    }

    /// Store the blocks of `frame`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::DimensionMismatch`] unless both blocks are
    /// `6 × nv`.
    pub fn set_frame(
        &mut self,
        frame: FrameId,
        jacobian: DMatrix<T>,
        velocity_partial: DMatrix<T>,
    ) -> Result<()> {
        require_shape("frame Jacobian", &jacobian, FRAME_ROWS, self.nv)?;
        require_shape("frame velocity partial", &velocity_partial, FRAME_ROWS, self.nv)?;
        self.frames.insert(
            frame,
            FrameBlocks {
                jacobian,
                velocity_partial,
            },
        );
        Ok(())
    }

    /// Whether `frame` has stored blocks.
    #[must_use]
    pub fn contains(&self, frame: FrameId) -> bool {
        self.frames.contains_key(&frame)
    }

    /// Number of stored frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether no frame is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    fn blocks(&self, frame: FrameId) -> Option<&FrameBlocks<T>> {
        self.frames.get(&frame)
    }
}

impl<T: Real> FrameKinematics<T> for DenseFrameKinematics<T> {
    fn nv(&self) -> usize {
        self.nv
    }

    fn frame_jacobian(&self, frame: FrameId) -> Option<DMatrixView<'_, T>> {
        self.blocks(frame).map(|b| b.jacobian.rows(0, FRAME_ROWS))
    }

    fn frame_velocity_partial(&self, frame: FrameId) -> Option<DMatrixView<'_, T>> {
        self.blocks(frame)
            .map(|b| b.velocity_partial.rows(0, FRAME_ROWS))
    }
}

/// Constrained directions of a frame impulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImpulseKind {
    /// Translational contact, `ni = 3`.
    Point3D,
    /// Translational and rotational contact, `ni = 6`.
    Frame6D,
}

impl ImpulseKind {
    /// Impulse dimension.
    #[must_use]
    pub const fn ni(self) -> usize {
        match self {
            Self::Point3D => 3,
            Self::Frame6D => 6,
        }
    }
}

/// Impulse at one frame, read from a [`FrameKinematics`] buffer.
#[derive(Debug, Clone)]
pub struct ImpulseFrame<T: Real = f64> {
    base: ImpulseModelBase<T>,
    frame: FrameId,
    kind: ImpulseKind,
}

impl<T: Real> ImpulseFrame<T> {
    /// Contact of `kind` at `frame`.
    ///
    /// # Errors
    ///
    /// Propagates base construction errors.
    pub fn new(state: Arc<dyn State<T>>, frame: FrameId, kind: ImpulseKind) -> Result<Self> {
        Ok(Self {
            base: ImpulseModelBase::new(state, kind.ni())?,
            frame,
            kind,
        })
    }

    /// Contact frame.
    #[must_use]
    pub fn frame(&self) -> FrameId {
        self.frame
    }

    /// Constrained directions.
    #[must_use]
    pub fn kind(&self) -> ImpulseKind {
        self.kind
    }

    fn read<'k>(&self, block: Option<DMatrixView<'k, T>>) -> Result<DMatrixView<'k, T>> {
        let block = block.ok_or(ActionError::UnknownFrame(self.frame))?;
        let nv = self.base.nv();
        if block.shape() != (FRAME_ROWS, nv) {
            return Err(ActionError::DimensionMismatch {
                what: "frame block",
                expected: Shape::matrix(FRAME_ROWS, nv),
                actual: Shape::matrix(block.nrows(), block.ncols()),
            });
        }
        Ok(block)
    }
}

impl<T: Real> ImpulseModel<T> for ImpulseFrame<T> {
    type Kinematics = dyn FrameKinematics<T>;

    fn base(&self) -> &ImpulseModelBase<T> {
        &self.base
    }

    fn calc(
        &self,
        data: &mut ImpulseData<'_, T, Self::Kinematics>,
        x: &DVector<T>,
    ) -> Result<()> {
        check_len("x", x, self.base.state().nx())?;
        let jac = self.read(data.engine().frame_jacobian(self.frame))?;
        data.Jc.copy_from(&jac.rows(0, self.base.ni()));
        Ok(())
    }

    fn calc_diff(
        &self,
        data: &mut ImpulseData<'_, T, Self::Kinematics>,
        x: &DVector<T>,
    ) -> Result<()> {
        check_len("x", x, self.base.state().nx())?;
        let partial = self.read(data.engine().frame_velocity_partial(self.frame))?;
        data.dv0_dq.copy_from(&partial.rows(0, self.base.ni()));
        Ok(())
    }
}

impl<T: Real> fmt::Display for ImpulseFrame<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ImpulseFrame {{frame={}, kind={:?}, ni={}}}",
            self.frame,
            self.kind,
            self.base.ni()
        )
    }
}
