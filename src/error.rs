//! Error types for view construction, slicing and copying.
//!
//! All variants here are recoverable: the operation that detects them unwinds
//! any partial state it created and leaves every descriptor it touched either
//! fully initialized or fully uninitialized.
//!
//! Acquisition-count invariant violations (a negative or otherwise impossible
//! count observed during acquire/release) are deliberately *not* represented
//! here. They indicate memory corruption or a use-after-release elsewhere in
//! the process and terminate it via [`std::process::abort`]; see the crate's
//! lifetime module.

use std::fmt;

use crate::order::MemoryOrder;
use crate::MAX_DIMS;

/// Which per-dimension axis constraint a buffer failed to satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisConstraintKind {
    /// A contiguous indirect dimension must have pointer-sized strides.
    NotIndirectlyContiguous,
    /// Stride does not satisfy the contiguity/packing the axis spec demands.
    NotContiguous,
    /// A direct dimension carries a non-negative suboffset.
    DirectAccess,
    /// An indirect dimension lacks a non-negative suboffset.
    NotIndirectlyAccessible,
}

impl fmt::Display for AxisConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            AxisConstraintKind::NotIndirectlyContiguous => "buffer is not indirectly contiguous",
            AxisConstraintKind::NotContiguous => {
                "buffer and view are not contiguous in the same dimension"
            }
            AxisConstraintKind::DirectAccess => "buffer is not compatible with direct access",
            AxisConstraintKind::NotIndirectlyAccessible => "buffer is not indirectly accessible",
        };
        f.write_str(msg)
    }
}

/// Errors that can occur while validating, slicing or copying a view.
#[derive(Debug, thiserror::Error)]
pub enum MemviewError {
    /// The output descriptor of a construction was already initialized.
    #[error("slice descriptor is already initialized")]
    AlreadyInitialized,

    /// The operation requires an initialized descriptor.
    #[error("slice descriptor is not initialized")]
    NotInitialized,

    /// Dimension counts do not agree.
    #[error("buffer has wrong number of dimensions (expected {expected}, got {got})")]
    DimensionMismatch { expected: usize, got: usize },

    /// More dimensions than a descriptor can represent.
    #[error("buffer has {ndim} dimensions, but at most {max} are supported", max = MAX_DIMS)]
    TooManyDimensions { ndim: usize },

    /// The buffer's element layout does not match the expected element type.
    #[error("item layout of buffer ({buffer}) does not match expected element type ({expected})")]
    TypeLayoutMismatch { buffer: String, expected: String },

    /// The buffer exposes only a flat size, without per-dimension strides.
    #[error("buffer does not supply the strides necessary for a strided view")]
    MissingStrides,

    /// A per-dimension axis specification was not satisfied.
    #[error("axis constraint violated in dimension {dim}: {kind}")]
    AxisConstraint { dim: usize, kind: AxisConstraintKind },

    /// A requested global contiguity does not hold over the whole buffer.
    #[error("buffer is not {order} contiguous")]
    ContiguityViolation { order: MemoryOrder },

    /// Integer index outside `[-shape, shape)` for its dimension.
    #[error("index out of bounds (axis {dim}, index {index})")]
    IndexOutOfBounds { dim: usize, index: isize },

    /// Malformed range slice: zero step, bounds outside the dimension after
    /// negative-index wraparound, or start/stop inverted for the step sign.
    #[error("invalid slice bounds (axis {dim})")]
    InvalidSliceBounds { dim: usize },

    /// An indirect dimension was indexed while an earlier indirection is
    /// still unresolved.
    #[error("all dimensions preceding dimension {dim} must be indexed and not sliced")]
    UnresolvedIndirection { dim: usize },

    /// A shape extent is negative.
    #[error("negative extent {extent} in dimension {dim}")]
    NegativeExtent { dim: usize, extent: isize },

    /// Integer overflow while computing a stride or buffer extent.
    #[error("offset overflow while computing buffer extent")]
    OffsetOverflow,

    /// The allocator refused a contiguous storage request.
    #[error("failed to allocate contiguous buffer storage")]
    AllocationFailed,
}

/// Result type for strided view operations.
pub type Result<T> = std::result::Result<T, MemviewError>;
