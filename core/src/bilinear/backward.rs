//! Backward pass.
//!
//! With `O = D0 · D1ᵗ` per batch element and upstream gradient `dO`
//! (`c0 × c1`):
//!
//! ```text
//! dD0 = dO  · D1    (c0 × h·w)
//! dD1 = dOᵗ · D0    (c1 × h·w)
//! ```
//!
//! Gradient buffers are zeroed once at the start of the call and each batch
//! chunk is then accumulated into exactly once, so the caller always gets a
//! full overwrite.

use crate::element::PoolElement;
use crate::error::{PoolResult, ShapeError};
use crate::math;
use crate::stream::ComputeContext;
use crate::tensor::{TensorView, TensorViewMut};
use crate::validate::validate_backward;

use super::{BilinearInputs, GradTargets};

/// Gradients of both inputs of a bilinear pooling call.
///
/// For [`BilinearInputs::SelfPooled`] only the slot-0 branch `dO · D` is
/// computed and then doubled in place in the shared buffer; the slot-1
/// branch is skipped entirely. This equals the exact gradient of a
/// self-pooled input when `dO` is symmetric.
pub fn backward<T: PoolElement>(
    grad_out: &TensorView<'_, T>,
    inputs: BilinearInputs<'_, T>,
    grads: GradTargets<'_, T>,
    ctx: ComputeContext,
) -> PoolResult<()> {
    let dims = validate_backward(grad_out, &inputs, &grads)?;
    log::trace!(
        "bilinear backward: batch={} c0={} c1={} spatial={} self_pooling={} ctx={}",
        dims.batch,
        dims.c0,
        dims.c1,
        dims.spatial(),
        inputs.is_self_pooling(),
        ctx.name()
    );

    let (c0, c1, spatial) = (dims.c0, dims.c1, dims.spatial());
    let go = *grad_out;

    match (inputs, grads) {
        (
            BilinearInputs::Distinct { data0, data1 },
            GradTargets::Distinct { mut grad0, mut grad1 },
        ) => {
            math::fill(grad0.data_mut(), T::zero());
            math::fill(grad1.data_mut(), T::zero());

            ctx.for_each_batch(grad0.data_mut(), dims.step_data0(), move |b, g0| {
                math::matmul_nn_acc(go.batch(b), data1.batch(b), g0, c0, c1, spatial)
            })?;
            ctx.for_each_batch(grad1.data_mut(), dims.step_data1(), move |b, g1| {
                math::matmul_tn_acc(go.batch(b), data0.batch(b), g1, c1, c0, spatial)
            })
        }
        (BilinearInputs::SelfPooled(data), GradTargets::Shared(mut grad)) => {
            log::debug!("bilinear backward: self-pooling, doubling slot-0 gradient");
            math::fill(grad.data_mut(), T::zero());

            ctx.for_each_batch(grad.data_mut(), dims.step_data0(), move |b, g| {
                math::matmul_nn_acc(go.batch(b), data.batch(b), g, c0, c1, spatial)?;
                math::scale_in_place(g, T::two());
                Ok(())
            })
        }
        _ => Err(ShapeError::SelfPoolingMismatch.into()),
    }
}

/// Backward for two distinct feature maps.
pub fn backward_pair<T: PoolElement>(
    grad_out: &TensorView<'_, T>,
    data0: &TensorView<'_, T>,
    data1: &TensorView<'_, T>,
    grad0: &mut TensorViewMut<'_, T>,
    grad1: &mut TensorViewMut<'_, T>,
    ctx: ComputeContext,
) -> PoolResult<()> {
    backward(
        grad_out,
        BilinearInputs::Distinct { data0: *data0, data1: *data1 },
        GradTargets::Distinct { grad0: grad0.reborrow(), grad1: grad1.reborrow() },
        ctx,
    )
}

/// Backward for a feature map pooled with itself.
pub fn backward_self<T: PoolElement>(
    grad_out: &TensorView<'_, T>,
    data: &TensorView<'_, T>,
    grad: &mut TensorViewMut<'_, T>,
    ctx: ComputeContext,
) -> PoolResult<()> {
    backward(
        grad_out,
        BilinearInputs::SelfPooled(*data),
        GradTargets::Shared(grad.reborrow()),
        ctx,
    )
}
