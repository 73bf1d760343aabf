//! Shape validation and inference.
//!
//! Everything here runs before a single output element is touched. The
//! engines call `validate_forward` / `validate_backward` first and only ever
//! index buffers through the `BilinearDims` those return.

use crate::bilinear::{BilinearInputs, GradTargets};
use crate::error::{BufferRole, PoolResult, ShapeError};
use crate::tensor::{Shape, TensorView, TensorViewMut};

/// Resolved extents of one pooling call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BilinearDims {
    pub batch: usize,
    pub c0: usize,
    pub c1: usize,
    pub height: usize,
    pub width: usize,
}

impl BilinearDims {
    /// Flattened spatial extent H·W, the reduction length of the forward pass.
    ///
    /// Dims returned by `infer_dims` are known not to overflow here or in the
    /// `step_*` helpers. Hand-built dims saturate instead of wrapping.
    #[inline(always)]
    pub fn spatial(&self) -> usize {
        self.height.saturating_mul(self.width)
    }

    #[inline(always)]
    pub fn step_data0(&self) -> usize {
        self.c0.saturating_mul(self.spatial())
    }

    #[inline(always)]
    pub fn step_data1(&self) -> usize {
        self.c1.saturating_mul(self.spatial())
    }

    #[inline(always)]
    pub fn step_out(&self) -> usize {
        self.c0.saturating_mul(self.c1)
    }

    /// `(batch, c0·c1, 1, 1)`.
    pub fn output_shape(&self) -> Shape {
        Shape::d4(self.batch, self.step_out(), 1, 1)
    }
}

fn check_rank(shape: &Shape, buffer: BufferRole) -> PoolResult<()> {
    if shape.ndim != 4 {
        return Err(ShapeError::RankMismatch { buffer, expected: 4, actual: shape.ndim }.into());
    }
    Ok(())
}

fn check_exact(actual: &Shape, expected: &Shape, buffer: BufferRole) -> PoolResult<()> {
    if actual.ndim != expected.ndim {
        return Err(ShapeError::RankMismatch {
            buffer,
            expected: expected.ndim,
            actual: actual.ndim,
        }
        .into());
    }
    if actual.as_slice() != expected.as_slice() {
        return Err(ShapeError::OutputShapeMismatch {
            buffer,
            expected: expected.nchw(),
            actual: actual.nchw(),
        }
        .into());
    }
    Ok(())
}

fn check_layout(len: usize, shape: &Shape, contiguous: bool, buffer: BufferRole) -> PoolResult<()> {
    let expected = shape.total(buffer)?;
    if !contiguous {
        return Err(ShapeError::NonContiguous { buffer }.into());
    }
    if len != expected {
        return Err(ShapeError::LengthMismatch { buffer, expected, actual: len }.into());
    }
    Ok(())
}

fn check_view<T>(view: &TensorView<'_, T>, buffer: BufferRole) -> PoolResult<()> {
    check_layout(view.data().len(), view.shape(), view.is_contiguous(), buffer)
}

fn check_view_mut<T>(view: &TensorViewMut<'_, T>, buffer: BufferRole) -> PoolResult<()> {
    check_layout(view.data().len(), view.shape(), view.is_contiguous(), buffer)
}

/// Checks that two feature-map shapes can be pooled together and resolves
/// their extents. Channel counts are free; batch, height and width must match.
pub fn infer_dims(shape0: &Shape, shape1: &Shape) -> PoolResult<BilinearDims> {
    check_rank(shape0, BufferRole::Data0)?;
    check_rank(shape1, BufferRole::Data1)?;

    for axis in [0usize, 2, 3] {
        let (lhs, rhs) = (shape0.dims[axis], shape1.dims[axis]);
        if lhs != rhs {
            return Err(ShapeError::AxisMismatch { axis, lhs, rhs }.into());
        }
    }

    shape0.total(BufferRole::Data0)?;
    shape1.total(BufferRole::Data1)?;
    let (batch, c0, c1) = (shape0.dims[0], shape0.dims[1], shape1.dims[1]);
    c0.checked_mul(c1)
        .and_then(|step| step.checked_mul(batch))
        .ok_or(ShapeError::SizeOverflow { buffer: BufferRole::Output })?;

    Ok(BilinearDims {
        batch,
        c0,
        c1,
        height: shape0.dims[2],
        width: shape0.dims[3],
    })
}

/// Output shape `(n, c0·c1, 1, 1)` for inputs of shape `(n, c0, h, w)` and
/// `(n, c1, h, w)`.
pub fn infer_output_shape(shape0: &Shape, shape1: &Shape) -> PoolResult<Shape> {
    infer_dims(shape0, shape1).map(|dims| dims.output_shape())
}

/// Full precondition check for a forward call.
pub fn validate_forward<T>(
    data0: &TensorView<'_, T>,
    data1: &TensorView<'_, T>,
    out: &TensorViewMut<'_, T>,
) -> PoolResult<BilinearDims> {
    let dims = infer_dims(data0.shape(), data1.shape())?;
    check_exact(out.shape(), &dims.output_shape(), BufferRole::Output)?;

    check_view(data0, BufferRole::Data0)?;
    check_view(data1, BufferRole::Data1)?;
    check_view_mut(out, BufferRole::Output)?;
    Ok(dims)
}

/// Full precondition check for a backward call.
///
/// Self-pooled inputs must come with exactly one shared gradient buffer and
/// distinct inputs with two.
pub fn validate_backward<T>(
    grad_out: &TensorView<'_, T>,
    inputs: &BilinearInputs<'_, T>,
    grads: &GradTargets<'_, T>,
) -> PoolResult<BilinearDims> {
    let dims = infer_dims(inputs.data0().shape(), inputs.data1().shape())?;
    check_exact(grad_out.shape(), &dims.output_shape(), BufferRole::GradOutput)?;

    match (inputs, grads) {
        (
            BilinearInputs::Distinct { data0, data1 },
            GradTargets::Distinct { grad0, grad1 },
        ) => {
            check_exact(grad0.shape(), data0.shape(), BufferRole::GradData0)?;
            check_exact(grad1.shape(), data1.shape(), BufferRole::GradData1)?;

            check_view(grad_out, BufferRole::GradOutput)?;
            check_view(data0, BufferRole::Data0)?;
            check_view(data1, BufferRole::Data1)?;
            check_view_mut(grad0, BufferRole::GradData0)?;
            check_view_mut(grad1, BufferRole::GradData1)?;
            Ok(dims)
        }
        (BilinearInputs::SelfPooled(data), GradTargets::Shared(grad)) => {
            check_exact(grad.shape(), data.shape(), BufferRole::GradData0)?;

            check_view(grad_out, BufferRole::GradOutput)?;
            check_view(data, BufferRole::Data0)?;
            check_view_mut(grad, BufferRole::GradData0)?;
            Ok(dims)
        }
        _ => Err(ShapeError::SelfPoolingMismatch.into()),
    }
}
