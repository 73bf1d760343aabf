//! # bilinear-pool-core: batched bilinear pooling
//!
//! A `no_std` Rust library computing bilinear (outer-product) pooling of two
//! feature maps and its gradients, over caller-owned buffers.
//!
//! ## Architecture
//!
//! - **Views**: `TensorView` / `TensorViewMut` borrow caller buffers for one call
//! - **Validation**: every rank, axis, layout and length check runs before any arithmetic
//! - **Engines**: `bilinear::forward` and `bilinear::backward`, generic over `f32` / `f64`
//! - **Compute context**: batches issued serially or on rayon (`std` feature)
//! - **Dispatch**: `op::BilinearPool` resolves a runtime dtype for host frameworks
//!
//! ## Usage
//!
//! ```
//! use bilinear_pool_core::*;
//!
//! // (n, c0, h, w) = (1, 1, 1, 2) pooled with (1, 1, 1, 2)
//! let data0 = [1.0f32, 2.0];
//! let data1 = [3.0f32, 4.0];
//! let mut out = [0.0f32; 1];
//!
//! let d0 = TensorView::new(&data0, Shape::d4(1, 1, 1, 2));
//! let d1 = TensorView::new(&data1, Shape::d4(1, 1, 1, 2));
//! let mut o = TensorViewMut::new(&mut out, Shape::d4(1, 1, 1, 1));
//! forward(&d0, &d1, &mut o, ComputeContext::Serial)?;
//! assert_eq!(out, [11.0]);
//! # Ok::<(), PoolError>(())
//! ```

// Why #![no_std]: the kernels only borrow caller buffers and never allocate,
// so hosts without an allocator can link them. `std` only adds rayon.
#![no_std]

#[cfg(feature = "std")]
extern crate std;

pub mod bilinear;
pub mod element;
pub mod error;
pub mod math;
pub mod op;
pub mod stream;
pub mod tensor;
pub mod validate;

// Re-export primary types
pub use bilinear::{
    backward, backward_pair, backward_self, forward, BilinearInputs, GradTargets,
};
pub use element::{DType, PoolElement};
pub use error::{BufferRole, PoolError, PoolResult, ShapeError, TypeError};
pub use op::{infer_type, BilinearPool, DynTensor, DynTensorMut};
pub use stream::ComputeContext;
pub use tensor::{Shape, TensorView, TensorViewMut, MAX_RANK};
pub use validate::{
    infer_dims, infer_output_shape, validate_backward, validate_forward, BilinearDims,
};
