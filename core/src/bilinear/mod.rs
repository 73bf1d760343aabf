//! Bilinear (outer-product) pooling.
//!
//! For feature maps `data0` of shape `(n, c0, h, w)` and `data1` of shape
//! `(n, c1, h, w)` the pooled descriptor of batch element `b` is the
//! `c0 × c1` matrix
//!
//! ```text
//! out[b, i, j] = Σ_{y,x} data0[b, i, y, x] · data1[b, j, y, x]
//! ```
//!
//! stored row-major as a `(n, c0·c1, 1, 1)` tensor. `forward` computes it,
//! `backward` computes the gradients of both inputs from the upstream
//! gradient.
//!
//! Self-pooling (one feature map pooled with itself) is requested explicitly
//! through [`BilinearInputs::SelfPooled`] and [`GradTargets::Shared`]; buffer
//! identity is never inspected.
//!
//! Why a variant instead of comparing pointers: a self-pooled input has one
//! gradient buffer, and two `&mut` views of it cannot coexist. Two distinct
//! buffers that happen to hold equal data are still two branches.

pub mod backward;
pub mod forward;

use crate::tensor::{TensorView, TensorViewMut};

pub use backward::{backward, backward_pair, backward_self};
pub use forward::forward;

/// The feature maps of one pooling call.
#[derive(Debug, Clone, Copy)]
pub enum BilinearInputs<'a, T> {
    Distinct {
        data0: TensorView<'a, T>,
        data1: TensorView<'a, T>,
    },
    /// One feature map used for both slots.
    SelfPooled(TensorView<'a, T>),
}

impl<'a, T> BilinearInputs<'a, T> {
    pub fn is_self_pooling(&self) -> bool {
        matches!(self, BilinearInputs::SelfPooled(_))
    }

    pub fn data0(&self) -> &TensorView<'a, T> {
        match self {
            BilinearInputs::Distinct { data0, .. } => data0,
            BilinearInputs::SelfPooled(data) => data,
        }
    }

    pub fn data1(&self) -> &TensorView<'a, T> {
        match self {
            BilinearInputs::Distinct { data1, .. } => data1,
            BilinearInputs::SelfPooled(data) => data,
        }
    }
}

/// Caller-owned gradient buffers for one backward call.
#[derive(Debug)]
pub enum GradTargets<'a, T> {
    Distinct {
        grad0: TensorViewMut<'a, T>,
        grad1: TensorViewMut<'a, T>,
    },
    /// The single gradient buffer of a self-pooled input.
    Shared(TensorViewMut<'a, T>),
}
