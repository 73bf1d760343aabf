//! Compute context: the handle per-batch work is issued on.
//!
//! Every batch element of a pooling call touches a disjoint chunk of the
//! output (or gradient) buffer, so the buffer is split with `chunks_mut` and
//! each chunk is handed to the kernel closure. `Parallel` does the same split
//! with rayon's `par_chunks_mut`. Each chunk is computed with the same
//! arithmetic in the same order either way, so both contexts produce
//! bit-identical results.

use crate::error::PoolResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComputeContext {
    /// Batches run in order on the calling thread.
    #[default]
    Serial,
    /// Batches run on the global rayon pool.
    #[cfg(feature = "std")]
    Parallel,
}

impl ComputeContext {
    /// `Parallel` when requested and available, `Serial` otherwise.
    pub fn with_parallelism(parallel: bool) -> Self {
        match parallel {
            #[cfg(feature = "std")]
            true => ComputeContext::Parallel,
            _ => ComputeContext::Serial,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            ComputeContext::Serial => "serial",
            #[cfg(feature = "std")]
            ComputeContext::Parallel => "parallel",
        }
    }

    /// Calls `kernel(b, chunk)` for every `step`-sized chunk of `buf`, where
    /// `b` is the batch index of the chunk. Stops at the first error.
    ///
    /// Why split with `chunks_mut` instead of indexing `buf` inside the kernel:
    /// the split hands every batch its own `&mut [T]`, so the borrow checker
    /// proves the batches disjoint and rayon can take the same closure with no
    /// locking or unsafe offset arithmetic.
    ///
    /// A zero `step` means every batch element is empty and nothing is issued.
    pub(crate) fn for_each_batch<T, F>(self, buf: &mut [T], step: usize, kernel: F) -> PoolResult<()>
    where
        T: Send,
        F: Fn(usize, &mut [T]) -> PoolResult<()> + Send + Sync,
    {
        if step == 0 || buf.is_empty() {
            return Ok(());
        }
        match self {
            ComputeContext::Serial => buf
                .chunks_mut(step)
                .enumerate()
                .try_for_each(|(b, chunk)| kernel(b, chunk)),
            #[cfg(feature = "std")]
            ComputeContext::Parallel => {
                use rayon::prelude::*;
                buf.par_chunks_mut(step)
                    .enumerate()
                    .try_for_each(|(b, chunk)| kernel(b, chunk))
            }
        }
    }
}
