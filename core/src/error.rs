//! Error types for the bilinear-pool-core library.
//!
//! Every entry point returns `PoolResult<T>`. All checks run before the first
//! output cell is written, so an `Err` never leaves a half-written buffer
//! behind.

use core::fmt;

use crate::element::DType;

/// Which caller-supplied buffer a shape error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferRole {
    Data0,
    Data1,
    Output,
    GradOutput,
    GradData0,
    GradData1,
}

impl BufferRole {
    pub const fn name(self) -> &'static str {
        match self {
            BufferRole::Data0 => "data0",
            BufferRole::Data1 => "data1",
            BufferRole::Output => "output",
            BufferRole::GradOutput => "grad_output",
            BufferRole::GradData0 => "grad_data0",
            BufferRole::GradData1 => "grad_data1",
        }
    }
}

/// Rank, dimension, layout and length violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeError {
    /// A feature map (or output) does not have the required number of axes.
    RankMismatch {
        buffer: BufferRole,
        expected: usize,
        actual: usize,
    },
    /// More axes than a `Shape` can hold.
    RankOverflow {
        max: usize,
        actual: usize,
    },
    /// Batch, height or width differs between the two inputs.
    AxisMismatch {
        axis: usize,
        lhs: usize,
        rhs: usize,
    },
    /// Output or gradient buffer shape differs from the inferred one.
    OutputShapeMismatch {
        buffer: BufferRole,
        expected: [usize; 4],
        actual: [usize; 4],
    },
    /// Strides are not the canonical row-major strides of the shape.
    NonContiguous {
        buffer: BufferRole,
    },
    /// Backing slice length disagrees with the shape's element count.
    LengthMismatch {
        buffer: BufferRole,
        expected: usize,
        actual: usize,
    },
    /// The element count implied by a shape does not fit in `usize`.
    SizeOverflow {
        buffer: BufferRole,
    },
    /// Self-pooled inputs paired with two gradient buffers, or the reverse.
    SelfPoolingMismatch,
    /// A matrix operand's length disagrees with its declared dimensions.
    DimensionMismatch {
        expected: usize,
        actual: usize,
    },
}

/// Element-type violations, raised by the dtype dispatch layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeError {
    /// The two inputs (or an input and an output) carry different dtypes.
    Mismatch {
        lhs: DType,
        rhs: DType,
    },
    /// A slot has no type assigned yet.
    Absent {
        slot: usize,
    },
    /// A known type flag the kernel has no implementation for.
    Unsupported {
        flag: i32,
    },
    /// A type flag nobody recognises.
    Unknown {
        flag: i32,
    },
    /// A dtype name nobody recognises.
    UnknownName,
}

/// All possible error conditions in the bilinear-pool-core library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    Shape(ShapeError),
    Type(TypeError),
}

pub type PoolResult<T> = Result<T, PoolError>;

impl PoolError {
    pub const fn is_shape(&self) -> bool {
        matches!(self, PoolError::Shape(_))
    }

    pub const fn is_type(&self) -> bool {
        matches!(self, PoolError::Type(_))
    }
}

impl From<ShapeError> for PoolError {
    fn from(err: ShapeError) -> Self {
        PoolError::Shape(err)
    }
}

impl From<TypeError> for PoolError {
    fn from(err: TypeError) -> Self {
        PoolError::Type(err)
    }
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeError::RankMismatch { buffer, expected, actual } => write!(
                f,
                "{} should be a {}D tensor, got {} axes",
                buffer.name(),
                expected,
                actual
            ),
            ShapeError::RankOverflow { max, actual } => {
                write!(f, "shape has {} axes, at most {} are supported", actual, max)
            }
            ShapeError::AxisMismatch { axis, lhs, rhs } => write!(
                f,
                "two bottom blobs not compatible at axis {}: {} vs {}",
                axis, lhs, rhs
            ),
            ShapeError::OutputShapeMismatch { buffer, expected, actual } => write!(
                f,
                "{} has shape {:?}, expected {:?}",
                buffer.name(),
                actual,
                expected
            ),
            ShapeError::NonContiguous { buffer } => {
                write!(f, "{} is not contiguous", buffer.name())
            }
            ShapeError::LengthMismatch { buffer, expected, actual } => write!(
                f,
                "{} holds {} elements, shape requires {}",
                buffer.name(),
                actual,
                expected
            ),
            ShapeError::SizeOverflow { buffer } => {
                write!(f, "{} element count overflows usize", buffer.name())
            }
            ShapeError::SelfPoolingMismatch => f.write_str(
                "self-pooled inputs need exactly one shared gradient buffer",
            ),
            ShapeError::DimensionMismatch { expected, actual } => write!(
                f,
                "matrix operand holds {} elements, expected {}",
                actual, expected
            ),
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::Mismatch { lhs, rhs } => {
                write!(f, "element type mismatch: {} vs {}", lhs.name(), rhs.name())
            }
            TypeError::Absent { slot } => {
                write!(f, "input {} must have a specified type", slot)
            }
            TypeError::Unsupported { flag } => {
                write!(f, "type flag {} is not a supported floating-point type", flag)
            }
            TypeError::Unknown { flag } => write!(f, "unknown type flag {}", flag),
            TypeError::UnknownName => f.write_str("unknown dtype name"),
        }
    }
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::Shape(err) => write!(f, "shape error: {}", err),
            PoolError::Type(err) => write!(f, "type error: {}", err),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ShapeError {}

#[cfg(feature = "std")]
impl std::error::Error for TypeError {}

#[cfg(feature = "std")]
impl std::error::Error for PoolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PoolError::Shape(err) => Some(err),
            PoolError::Type(err) => Some(err),
        }
    }
}
