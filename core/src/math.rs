//! Dense matrix primitives the pooling engines are built on.
//!
//! All matrices are row-major slices. The three products cover every shape
//! bilinear pooling needs:
//!
//! - forward:        O  = D0 · D1ᵗ      (`matmul_nt`)
//! - backward slot 0: G0 += dO · D1     (`matmul_nn_acc`)
//! - backward slot 1: G1 += dOᵗ · D0    (`matmul_tn_acc`)
//!
//! Accumulation happens in the element type itself. Every function checks
//! operand lengths before touching `output`.

use crate::element::PoolElement;
use crate::error::{PoolResult, ShapeError};

/// A `rows × cols` product that overflows can never match a real slice, so
/// it is reported as a mismatch against the saturated count.
#[inline]
fn check_len(actual: usize, rows: usize, cols: usize) -> PoolResult<()> {
    match rows.checked_mul(cols) {
        Some(expected) if expected == actual => Ok(()),
        _ => Err(ShapeError::DimensionMismatch {
            expected: rows.saturating_mul(cols),
            actual,
        }
        .into()),
    }
}

// =============================================================================
// Matrix Products
// =============================================================================

/// Computes A[m×k] × B[n×k]ᵗ → output[m×n], overwriting `output`.
///
/// Both operands are walked row by row, so the inner loop is a plain dot
/// product over two contiguous rows.
pub fn matmul_nt<T: PoolElement>(
    a: &[T],          // [m × k] row-major
    b: &[T],          // [n × k] row-major
    output: &mut [T], // [m × n] row-major
    m: usize,
    k: usize,
    n: usize,
) -> PoolResult<()> {
    check_len(a.len(), m, k)?;
    check_len(b.len(), n, k)?;
    check_len(output.len(), m, n)?;

    for i in 0..m {
        let a_row = &a[i * k..(i + 1) * k];
        for j in 0..n {
            let b_row = &b[j * k..(j + 1) * k];
            output[i * n + j] = dot(a_row, b_row);
        }
    }
    Ok(())
}

/// Accumulates A[m×k] × B[k×n] into output[m×n].
pub fn matmul_nn_acc<T: PoolElement>(
    a: &[T],          // [m × k] row-major
    b: &[T],          // [k × n] row-major
    output: &mut [T], // [m × n] row-major
    m: usize,
    k: usize,
    n: usize,
) -> PoolResult<()> {
    check_len(a.len(), m, k)?;
    check_len(b.len(), k, n)?;
    check_len(output.len(), m, n)?;

    // i-p-j order: each output row gets scaled rows of B added in sequence.
    for i in 0..m {
        let out_row = &mut output[i * n..(i + 1) * n];
        for p in 0..k {
            add_scaled_row(out_row, &b[p * n..(p + 1) * n], a[i * k + p]);
        }
    }
    Ok(())
}

/// Accumulates A[k×m]ᵗ × B[k×n] into output[m×n].
///
/// `a` is stored as k rows of length m; no transposed copy is made.
pub fn matmul_tn_acc<T: PoolElement>(
    a: &[T],          // [k × m] row-major
    b: &[T],          // [k × n] row-major
    output: &mut [T], // [m × n] row-major
    m: usize,
    k: usize,
    n: usize,
) -> PoolResult<()> {
    check_len(a.len(), k, m)?;
    check_len(b.len(), k, n)?;
    check_len(output.len(), m, n)?;

    for i in 0..m {
        let out_row = &mut output[i * n..(i + 1) * n];
        for p in 0..k {
            add_scaled_row(out_row, &b[p * n..(p + 1) * n], a[p * m + i]);
        }
    }
    Ok(())
}

// =============================================================================
// Vector Helpers
// =============================================================================

#[inline(always)]
pub fn dot<T: PoolElement>(a: &[T], b: &[T]) -> T {
    a.iter().zip(b.iter()).fold(T::zero(), |acc, (&x, &y)| acc + x * y)
}

/// output[i] += scale * row[i]
#[inline(always)]
pub fn add_scaled_row<T: PoolElement>(output: &mut [T], row: &[T], scale: T) {
    for (o, &r) in output.iter_mut().zip(row.iter()) {
        *o += scale * r;
    }
}

pub fn scale_in_place<T: PoolElement>(data: &mut [T], factor: T) {
    for val in data.iter_mut() {
        *val *= factor;
    }
}

pub fn fill<T: PoolElement>(data: &mut [T], value: T) {
    for val in data.iter_mut() {
        *val = value;
    }
}
