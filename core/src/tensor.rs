//! Borrowed tensor views over caller-owned buffers.
//!
//! The kernel never owns memory. A view is a slice plus the logical shape and
//! the element strides the host claims for it. Only canonical row-major
//! strides are accepted by the validator; views exist mostly so that a host
//! with a strided tensor can describe it honestly and be rejected.

use crate::error::{BufferRole, PoolResult, ShapeError};

/// Largest rank a `Shape` can describe.
pub const MAX_RANK: usize = 6;

/// Logical shape with up to `MAX_RANK` axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    pub dims: [usize; MAX_RANK],
    pub ndim: usize,
}

impl Shape {
    pub const fn d1(size: usize) -> Self {
        Self { dims: [size, 0, 0, 0, 0, 0], ndim: 1 }
    }
    pub const fn d2(d0: usize, d1: usize) -> Self {
        Self { dims: [d0, d1, 0, 0, 0, 0], ndim: 2 }
    }
    pub const fn d3(d0: usize, d1: usize, d2: usize) -> Self {
        Self { dims: [d0, d1, d2, 0, 0, 0], ndim: 3 }
    }
    pub const fn d4(n: usize, c: usize, h: usize, w: usize) -> Self {
        Self { dims: [n, c, h, w, 0, 0], ndim: 4 }
    }

    /// Build a shape from a dimension list of any rank up to `MAX_RANK`.
    pub fn from_dims(dims: &[usize]) -> PoolResult<Self> {
        if dims.len() > MAX_RANK {
            return Err(ShapeError::RankOverflow { max: MAX_RANK, actual: dims.len() }.into());
        }
        let mut shape = Self { dims: [0; MAX_RANK], ndim: dims.len() };
        shape.dims[..dims.len()].copy_from_slice(dims);
        Ok(shape)
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[usize] {
        &self.dims[..self.ndim]
    }

    /// Element count, or `None` when it does not fit in `usize`.
    pub fn checked_total(&self) -> Option<usize> {
        self.as_slice().iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    /// Element count, reported against `buffer` when it overflows.
    pub fn total(&self, buffer: BufferRole) -> PoolResult<usize> {
        self.checked_total()
            .ok_or_else(|| ShapeError::SizeOverflow { buffer }.into())
    }

    /// Extent of `axis`, or 0 when the shape has fewer axes.
    #[inline(always)]
    pub fn dim(&self, axis: usize) -> usize {
        if axis < self.ndim { self.dims[axis] } else { 0 }
    }

    /// First four extents, zero-padded. Used when reporting 4-D mismatches.
    pub fn nchw(&self) -> [usize; 4] {
        [self.dim(0), self.dim(1), self.dim(2), self.dim(3)]
    }

    /// Row-major strides in elements.
    ///
    /// Why saturating: views are built before validation, so the shape may
    /// still be one whose element count overflows. Such a shape is rejected
    /// with `SizeOverflow` before strides are compared, and for every shape
    /// that passes, no partial product saturates.
    pub fn contiguous_strides(&self) -> [usize; MAX_RANK] {
        let mut strides = [0usize; MAX_RANK];
        let mut acc = 1usize;
        for axis in (0..self.ndim).rev() {
            strides[axis] = acc;
            acc = acc.saturating_mul(self.dims[axis]);
        }
        strides
    }

    /// Whether `strides` describe a gap-free row-major layout of this shape.
    ///
    /// Why extent-1 axes are skipped: hosts that insert or squeeze a unit axis
    /// often leave an arbitrary stride on it (0, or the stride of a neighbour).
    /// Index 0 is the only valid index on such an axis, so its stride never
    /// moves the offset and the memory is still dense. An empty shape is
    /// trivially contiguous.
    pub fn is_contiguous_with(&self, strides: &[usize; MAX_RANK]) -> bool {
        if self.checked_total() == Some(0) {
            return true;
        }
        let canonical = self.contiguous_strides();
        (0..self.ndim).all(|axis| self.dims[axis] == 1 || strides[axis] == canonical[axis])
    }

    /// Elements spanned by one index step along axis 0.
    pub fn outer_step(&self) -> usize {
        if self.ndim == 0 {
            return 0;
        }
        self.dims[1..self.ndim].iter().fold(1usize, |acc, &d| acc.saturating_mul(d))
    }
}

fn strides_from(shape: &Shape, strides: &[usize]) -> [usize; MAX_RANK] {
    let mut out = shape.contiguous_strides();
    let n = strides.len().min(shape.ndim);
    out[..n].copy_from_slice(&strides[..n]);
    out
}

/// Read-only view of a caller-owned buffer.
#[derive(Debug, Clone, Copy)]
pub struct TensorView<'a, T> {
    data: &'a [T],
    shape: Shape,
    strides: [usize; MAX_RANK],
}

impl<'a, T> TensorView<'a, T> {
    /// View `data` as a contiguous tensor of `shape`.
    pub fn new(data: &'a [T], shape: Shape) -> Self {
        Self { data, shape, strides: shape.contiguous_strides() }
    }

    /// View `data` with host-declared element strides. Missing trailing
    /// strides default to the canonical ones.
    pub fn with_strides(data: &'a [T], shape: Shape, strides: &[usize]) -> Self {
        Self { data, shape, strides: strides_from(&shape, strides) }
    }

    #[inline(always)]
    pub fn data(&self) -> &'a [T] {
        self.data
    }

    #[inline(always)]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    #[inline(always)]
    pub fn strides(&self) -> &[usize] {
        &self.strides[..self.shape.ndim]
    }

    pub fn is_contiguous(&self) -> bool {
        self.shape.is_contiguous_with(&self.strides)
    }

    /// The slice belonging to batch index `b` of a validated contiguous view.
    #[inline(always)]
    pub(crate) fn batch(&self, b: usize) -> &'a [T] {
        let step = self.shape.outer_step();
        &self.data[b * step..(b + 1) * step]
    }
}

/// Mutable view of a caller-owned output buffer.
#[derive(Debug)]
pub struct TensorViewMut<'a, T> {
    data: &'a mut [T],
    shape: Shape,
    strides: [usize; MAX_RANK],
}

impl<'a, T> TensorViewMut<'a, T> {
    pub fn new(data: &'a mut [T], shape: Shape) -> Self {
        let strides = shape.contiguous_strides();
        Self { data, shape, strides }
    }

    pub fn with_strides(data: &'a mut [T], shape: Shape, strides: &[usize]) -> Self {
        let strides = strides_from(&shape, strides);
        Self { data, shape, strides }
    }

    #[inline(always)]
    pub fn data(&self) -> &[T] {
        &*self.data
    }

    #[inline(always)]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut *self.data
    }

    #[inline(always)]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    #[inline(always)]
    pub fn strides(&self) -> &[usize] {
        &self.strides[..self.shape.ndim]
    }

    pub fn is_contiguous(&self) -> bool {
        self.shape.is_contiguous_with(&self.strides)
    }

    /// Shorter-lived mutable view of the same buffer.
    pub fn reborrow(&mut self) -> TensorViewMut<'_, T> {
        TensorViewMut { data: &mut *self.data, shape: self.shape, strides: self.strides }
    }

    /// Reborrow as a read-only view.
    pub fn as_view(&self) -> TensorView<'_, T> {
        TensorView { data: &*self.data, shape: self.shape, strides: self.strides }
    }
}
