//! Forward pass: batched `D0 · D1ᵗ`.

use crate::element::PoolElement;
use crate::error::PoolResult;
use crate::math;
use crate::stream::ComputeContext;
use crate::tensor::{TensorView, TensorViewMut};
use crate::validate::validate_forward;

/// Pool `data0` with `data1` into `out`.
///
/// Per batch element `b`, `data0[b]` is read as a `c0 × (h·w)` matrix and
/// `data1[b]` as `c1 × (h·w)`; `out[b]` receives their product
/// `data0[b] · data1[b]ᵗ` in row-major order. Every element of `out` is
/// overwritten; nothing is accumulated from a previous call.
///
/// Fails with a shape error, without writing anything, when the inputs are
/// not 4-D, disagree on batch/height/width, are not contiguous, or `out` is
/// not `(n, c0·c1, 1, 1)`.
pub fn forward<T: PoolElement>(
    data0: &TensorView<'_, T>,
    data1: &TensorView<'_, T>,
    out: &mut TensorViewMut<'_, T>,
    ctx: ComputeContext,
) -> PoolResult<()> {
    let dims = validate_forward(data0, data1, out)?;
    log::trace!(
        "bilinear forward: batch={} c0={} c1={} spatial={} ctx={}",
        dims.batch,
        dims.c0,
        dims.c1,
        dims.spatial(),
        ctx.name()
    );

    let (c0, c1, spatial) = (dims.c0, dims.c1, dims.spatial());
    let (d0, d1) = (*data0, *data1);
    ctx.for_each_batch(out.data_mut(), dims.step_out(), move |b, o| {
        math::matmul_nt(d0.batch(b), d1.batch(b), o, c0, spatial, c1)
    })
}
