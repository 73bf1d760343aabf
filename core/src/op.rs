//! Host-facing operator: runtime dtype dispatch over the generic kernels.
//!
//! A host framework hands over buffers whose element type is only known at
//! run time. This layer checks that every buffer of a call carries the same
//! floating-point type, resolves it once, and calls the generic engines.
//! It is the only place a [`TypeError`] can come from.

use crate::bilinear::{self, BilinearInputs, GradTargets};
use crate::element::{DType, PoolElement};
use crate::error::{PoolResult, ShapeError, TypeError};
use crate::stream::ComputeContext;
use crate::tensor::{Shape, TensorView, TensorViewMut};
use crate::validate;

/// Name the operator is known by in graph frameworks.
pub const OP_NAME: &str = "_contrib_BilinearPool";
pub const ARGUMENTS: [&str; 2] = ["data0", "data1"];
pub const OUTPUTS: [&str; 1] = ["output"];
/// Tensors the backward pass needs kept alive from the forward pass.
pub const BACKWARD_DEPENDENCIES: [&str; 4] = ["grad_output", "data0", "data1", "output"];

/// Type inference over mshadow type flags: both inputs must carry the same
/// known floating-point type, which is also the output type.
pub fn infer_type(flags: [i32; 2]) -> PoolResult<DType> {
    for (slot, &flag) in flags.iter().enumerate() {
        if flag == DType::ABSENT_FLAG {
            return Err(TypeError::Absent { slot }.into());
        }
    }
    let lhs = DType::from_flag(flags[0])?;
    let rhs = DType::from_flag(flags[1])?;
    if lhs != rhs {
        return Err(TypeError::Mismatch { lhs, rhs }.into());
    }
    Ok(lhs)
}

/// Read-only buffer with a runtime element type.
#[derive(Debug, Clone, Copy)]
pub enum DynTensor<'a> {
    F32(TensorView<'a, f32>),
    F64(TensorView<'a, f64>),
}

impl<'a> DynTensor<'a> {
    pub fn dtype(&self) -> DType {
        match self {
            DynTensor::F32(_) => DType::Float32,
            DynTensor::F64(_) => DType::Float64,
        }
    }

    pub fn shape(&self) -> &Shape {
        match self {
            DynTensor::F32(view) => view.shape(),
            DynTensor::F64(view) => view.shape(),
        }
    }
}

impl<'a> From<TensorView<'a, f32>> for DynTensor<'a> {
    fn from(view: TensorView<'a, f32>) -> Self {
        DynTensor::F32(view)
    }
}

impl<'a> From<TensorView<'a, f64>> for DynTensor<'a> {
    fn from(view: TensorView<'a, f64>) -> Self {
        DynTensor::F64(view)
    }
}

/// Writable buffer with a runtime element type.
#[derive(Debug)]
pub enum DynTensorMut<'a> {
    F32(TensorViewMut<'a, f32>),
    F64(TensorViewMut<'a, f64>),
}

impl<'a> DynTensorMut<'a> {
    pub fn dtype(&self) -> DType {
        match self {
            DynTensorMut::F32(_) => DType::Float32,
            DynTensorMut::F64(_) => DType::Float64,
        }
    }

    pub fn shape(&self) -> &Shape {
        match self {
            DynTensorMut::F32(view) => view.shape(),
            DynTensorMut::F64(view) => view.shape(),
        }
    }
}

impl<'a> From<TensorViewMut<'a, f32>> for DynTensorMut<'a> {
    fn from(view: TensorViewMut<'a, f32>) -> Self {
        DynTensorMut::F32(view)
    }
}

impl<'a> From<TensorViewMut<'a, f64>> for DynTensorMut<'a> {
    fn from(view: TensorViewMut<'a, f64>) -> Self {
        DynTensorMut::F64(view)
    }
}

/// Recovers typed views from dyn buffers once the call's dtype is known.
trait Erased: PoolElement {
    fn view(tensor: DynTensor<'_>) -> Option<TensorView<'_, Self>>;
    fn view_mut(tensor: DynTensorMut<'_>) -> Option<TensorViewMut<'_, Self>>;
}

impl Erased for f32 {
    fn view(tensor: DynTensor<'_>) -> Option<TensorView<'_, f32>> {
        match tensor {
            DynTensor::F32(view) => Some(view),
            _ => None,
        }
    }

    fn view_mut(tensor: DynTensorMut<'_>) -> Option<TensorViewMut<'_, f32>> {
        match tensor {
            DynTensorMut::F32(view) => Some(view),
            _ => None,
        }
    }
}

impl Erased for f64 {
    fn view(tensor: DynTensor<'_>) -> Option<TensorView<'_, f64>> {
        match tensor {
            DynTensor::F64(view) => Some(view),
            _ => None,
        }
    }

    fn view_mut(tensor: DynTensorMut<'_>) -> Option<TensorViewMut<'_, f64>> {
        match tensor {
            DynTensorMut::F64(view) => Some(view),
            _ => None,
        }
    }
}

/// The common dtype of all `dtypes`, or a mismatch against the first one.
fn unify(dtypes: &[DType]) -> PoolResult<DType> {
    let Some(&first) = dtypes.first() else {
        return Err(TypeError::Absent { slot: 0 }.into());
    };
    match dtypes.iter().find(|&&d| d != first) {
        Some(&other) => Err(TypeError::Mismatch { lhs: first, rhs: other }.into()),
        None => Ok(first),
    }
}

fn typed<T: Erased>(tensor: DynTensor<'_>) -> PoolResult<TensorView<'_, T>> {
    let found = tensor.dtype();
    T::view(tensor).ok_or_else(|| TypeError::Mismatch { lhs: T::DTYPE, rhs: found }.into())
}

fn typed_mut<T: Erased>(tensor: DynTensorMut<'_>) -> PoolResult<TensorViewMut<'_, T>> {
    let found = tensor.dtype();
    T::view_mut(tensor).ok_or_else(|| TypeError::Mismatch { lhs: T::DTYPE, rhs: found }.into())
}

/// Bilinear pooling operator bound to one compute context.
#[derive(Debug, Clone, Copy, Default)]
pub struct BilinearPool {
    ctx: ComputeContext,
}

impl BilinearPool {
    pub fn new(ctx: ComputeContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> ComputeContext {
        self.ctx
    }

    pub fn infer_shape(&self, shape0: &Shape, shape1: &Shape) -> PoolResult<Shape> {
        validate::infer_output_shape(shape0, shape1)
    }

    pub fn infer_type(&self, flags: [i32; 2]) -> PoolResult<DType> {
        infer_type(flags)
    }

    pub fn forward(
        &self,
        data0: DynTensor<'_>,
        data1: DynTensor<'_>,
        out: DynTensorMut<'_>,
    ) -> PoolResult<()> {
        let dtype = unify(&[data0.dtype(), data1.dtype(), out.dtype()])?;
        match dtype {
            DType::Float32 => self.forward_typed::<f32>(data0, data1, out),
            DType::Float64 => self.forward_typed::<f64>(data0, data1, out),
        }
    }

    /// `data1` and `grad1` both `None` requests self-pooling of `data0`.
    pub fn backward(
        &self,
        grad_out: DynTensor<'_>,
        data0: DynTensor<'_>,
        data1: Option<DynTensor<'_>>,
        grad0: DynTensorMut<'_>,
        grad1: Option<DynTensorMut<'_>>,
    ) -> PoolResult<()> {
        if data1.is_some() != grad1.is_some() {
            return Err(ShapeError::SelfPoolingMismatch.into());
        }

        let mut dtypes = [grad_out.dtype(), data0.dtype(), grad0.dtype(), data0.dtype(), grad0.dtype()];
        if let Some(d1) = &data1 {
            dtypes[3] = d1.dtype();
        }
        if let Some(g1) = &grad1 {
            dtypes[4] = g1.dtype();
        }
        let dtype = unify(&dtypes)?;

        match dtype {
            DType::Float32 => self.backward_typed::<f32>(grad_out, data0, data1, grad0, grad1),
            DType::Float64 => self.backward_typed::<f64>(grad_out, data0, data1, grad0, grad1),
        }
    }

    fn forward_typed<T: Erased>(
        &self,
        data0: DynTensor<'_>,
        data1: DynTensor<'_>,
        out: DynTensorMut<'_>,
    ) -> PoolResult<()> {
        let d0 = typed::<T>(data0)?;
        let d1 = typed::<T>(data1)?;
        let mut o = typed_mut::<T>(out)?;
        bilinear::forward(&d0, &d1, &mut o, self.ctx)
    }

    fn backward_typed<T: Erased>(
        &self,
        grad_out: DynTensor<'_>,
        data0: DynTensor<'_>,
        data1: Option<DynTensor<'_>>,
        grad0: DynTensorMut<'_>,
        grad1: Option<DynTensorMut<'_>>,
    ) -> PoolResult<()> {
        let go = typed::<T>(grad_out)?;
        let d0 = typed::<T>(data0)?;
        let g0 = typed_mut::<T>(grad0)?;

        let (inputs, grads) = match (data1, grad1) {
            (Some(data1), Some(grad1)) => (
                BilinearInputs::Distinct { data0: d0, data1: typed::<T>(data1)? },
                GradTargets::Distinct { grad0: g0, grad1: typed_mut::<T>(grad1)? },
            ),
            (None, None) => (BilinearInputs::SelfPooled(d0), GradTargets::Shared(g0)),
            _ => return Err(ShapeError::SelfPoolingMismatch.into()),
        };
        bilinear::backward(&go, inputs, grads, self.ctx)
    }
}
