//! Element types the kernel is generic over, plus the runtime dtype tag the
//! host dispatch layer resolves them from.

use core::fmt::Debug;
use core::ops::{AddAssign, MulAssign};

use num_traits::Float;

use crate::error::TypeError;

/// Runtime tag for a floating-point element type.
///
/// Integer flags follow the mshadow convention used by the host frameworks
/// this kernel was written for: `0` = float32, `1` = float64, `2` = float16,
/// `3` = uint8, `4` = int32, `5` = int8, `6` = int64. `-1` means "not yet
/// inferred".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    Float32,
    Float64,
}

impl DType {
    pub const ABSENT_FLAG: i32 = -1;

    /// Resolve an mshadow type flag. `-1` and out-of-range flags are unknown,
    /// integer and half types are known but unsupported.
    pub fn from_flag(flag: i32) -> Result<Self, TypeError> {
        match flag {
            0 => Ok(DType::Float32),
            1 => Ok(DType::Float64),
            2..=6 => Err(TypeError::Unsupported { flag }),
            _ => Err(TypeError::Unknown { flag }),
        }
    }

    /// Resolve a numpy-style dtype name.
    pub fn from_name(name: &str) -> Result<Self, TypeError> {
        match name {
            "float32" | "f32" => Ok(DType::Float32),
            "float64" | "f64" => Ok(DType::Float64),
            "float16" | "f16" => Err(TypeError::Unsupported { flag: 2 }),
            "uint8" => Err(TypeError::Unsupported { flag: 3 }),
            "int32" => Err(TypeError::Unsupported { flag: 4 }),
            "int8" => Err(TypeError::Unsupported { flag: 5 }),
            "int64" => Err(TypeError::Unsupported { flag: 6 }),
            _ => Err(TypeError::UnknownName),
        }
    }

    pub const fn flag(self) -> i32 {
        match self {
            DType::Float32 => 0,
            DType::Float64 => 1,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            DType::Float32 => "float32",
            DType::Float64 => "float64",
        }
    }

    pub const fn size_of(self) -> usize {
        match self {
            DType::Float32 => 4,
            DType::Float64 => 8,
        }
    }
}

/// A float element the pooling kernels can run on.
pub trait PoolElement: Float + AddAssign + MulAssign + Debug + Send + Sync + 'static {
    /// Runtime tag matching this element type.
    const DTYPE: DType;

    #[inline(always)]
    fn two() -> Self {
        Self::one() + Self::one()
    }
}

impl PoolElement for f32 {
    const DTYPE: DType = DType::Float32;
}

impl PoolElement for f64 {
    const DTYPE: DType = DType::Float64;
}
